//! Nearest-neighbour magnification of reduced-resolution bitmaps.

use crate::pixel::SubFormat;

/// Linear reduction applied to [`SubFormat::Reduced`] bitmaps.
pub const BLOCK_FACTOR: usize = 16;

/// Bring a converted raster up to `width` x `height` according to `sub_format`.
pub fn restore_resolution(
    sub_format: SubFormat,
    raster: Vec<u8>,
    width: u32,
    height: u32,
) -> Vec<u8> {
    match sub_format {
        SubFormat::Full => raster,
        SubFormat::Reduced => {
            log::debug!("upscaling {width}x{height} bitmap from 1/{BLOCK_FACTOR} grid");
            upscale_blocks(&raster, width, height, BLOCK_FACTOR)
        }
    }
}

/// Replicate every BGRA pixel of `src` into a `factor` x `factor` block.
///
/// `src` holds `(width / factor) * (height / factor)` pixels. When the
/// dimensions are not multiples of `factor` the uncovered right and bottom
/// edges stay zero.
pub fn upscale_blocks(src: &[u8], width: u32, height: u32, factor: usize) -> Vec<u8> {
    let width = width as usize;
    let height = height as usize;
    let mut out = vec![0u8; width * height * 4];
    if factor == 0 || width < factor || height < factor {
        return out;
    }

    let src_width = width / factor;
    let src_height = height / factor;
    let out_stride = width * 4;
    let mut row = vec![0u8; src_width * factor * 4];

    for (y, src_row) in src
        .chunks_exact(src_width * 4)
        .take(src_height)
        .enumerate()
    {
        for (block, pixel) in row.chunks_exact_mut(factor * 4).zip(src_row.chunks_exact(4)) {
            for dst in block.chunks_exact_mut(4) {
                dst.copy_from_slice(pixel);
            }
        }
        for yy in y * factor..(y + 1) * factor {
            let start = yy * out_stride;
            out[start..start + row.len()].copy_from_slice(&row);
        }
    }
    out
}
