use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use serde::Serialize;
use wz_formats::{
    AssetReader, BitmapDescriptor, DecodeContext, DecodeOutcome, KeyStream, MappedArchive,
    PixelFormat, SubFormat, XorStrategy,
};

#[derive(Parser, Debug)]
#[command(about = "Decode one bitmap blob from a container file", version)]
struct Args {
    /// Container file holding the bitmap
    #[arg(long, value_name = "PATH")]
    file: PathBuf,

    /// Offset of the marker byte that precedes the blob
    #[arg(long)]
    offset: u64,

    /// Declared blob length in bytes
    #[arg(long)]
    length: u32,

    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Pixel format tag (1, 2, 513, 1026)
    #[arg(long, default_value_t = 2)]
    format: u32,

    /// Sub-format tag (0 = full resolution, 4 = 1/256 area)
    #[arg(long, default_value_t = 0)]
    sub_format: u8,

    /// 65536-byte keystream; a zero table is used when omitted
    #[arg(long, value_name = "PATH")]
    key: Option<PathBuf>,

    /// Force the byte-at-a-time XOR path
    #[arg(long)]
    scalar: bool,

    /// Write the decoded raster as PNG
    #[arg(long, value_name = "PATH")]
    png: Option<PathBuf>,

    /// Write a JSON summary of the decode
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DecodeSummary {
    container: PathBuf,
    offset: u64,
    width: u32,
    height: u32,
    declared_len: u32,
    effective_len: usize,
    declared_format: u32,
    declared_sub_format: u8,
    format: PixelFormat,
    sub_format: SubFormat,
    outcome: DecodeOutcome,
    strategy: String,
    opaque_pixels: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let keystream = match args.key.as_ref() {
        Some(path) => KeyStream::load(path)?,
        None => KeyStream::zeroed(),
    };
    let mut context = DecodeContext::new(Arc::new(keystream));
    if args.scalar {
        context = context.with_strategy(XorStrategy::Scalar);
    }
    let strategy = context.strategy();

    let archive: Arc<dyn AssetReader> = Arc::new(MappedArchive::open(&args.file)?);
    let bitmap = BitmapDescriptor::new(
        args.width,
        args.height,
        args.length,
        args.offset,
        args.format,
        args.sub_format,
        archive,
        Arc::new(context),
    )
    .context("building bitmap descriptor")?;

    let raster = bitmap
        .raster()
        .map_err(|err| anyhow!("decoding bitmap at offset {}: {err}", args.offset))?;

    println!(
        "Decoded {}x{} bitmap at offset {} ({:?}, format {} -> {})",
        raster.width,
        raster.height,
        args.offset,
        raster.outcome(),
        args.format,
        bitmap.effective_format()
    );

    if let Some(path) = args.png.as_ref() {
        export_png(path, raster.width, raster.height, &raster.to_rgba())?;
        println!("PNG written to {}", path.display());
    }

    if let Some(path) = args.json.as_ref() {
        let summary = DecodeSummary {
            container: args.file.clone(),
            offset: args.offset,
            width: raster.width,
            height: raster.height,
            declared_len: args.length,
            effective_len: bitmap.effective_len(),
            declared_format: args.format,
            declared_sub_format: args.sub_format,
            format: raster.format(),
            sub_format: raster.sub_format(),
            outcome: raster.outcome(),
            strategy: format!("{strategy:?}"),
            opaque_pixels: raster
                .pixels()
                .chunks_exact(4)
                .filter(|pixel| pixel[3] == 0xFF)
                .count(),
        };
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}

fn export_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let encoder = PngEncoder::new(file);
    encoder
        .write_image(rgba, width, height, ColorType::Rgba8)
        .with_context(|| format!("writing PNG to {}", path.display()))?;
    Ok(())
}
