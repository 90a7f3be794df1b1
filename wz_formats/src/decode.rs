//! Orchestration of the inflate / decrypt / convert pipeline for one blob.

use std::sync::Arc;

use serde::Serialize;

use crate::cpu::XorStrategy;
use crate::decrypt::decrypt_blocks;
use crate::error::DecodeError;
use crate::inflate::inflate_into;
use crate::keystream::KeyStream;
use crate::pixel::{PixelFormat, SubFormat, convert_pixels, expected_source_len};
use crate::upscale::restore_resolution;

/// Keystream and XOR strategy shared by every bitmap of a container.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    keystream: Arc<KeyStream>,
    strategy: XorStrategy,
}

impl DecodeContext {
    /// Build a context using the best XOR strategy the host supports.
    pub fn new(keystream: Arc<KeyStream>) -> Self {
        Self {
            keystream,
            strategy: XorStrategy::detect(),
        }
    }

    pub fn with_strategy(mut self, strategy: XorStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn keystream(&self) -> &KeyStream {
        &self.keystream
    }

    pub fn strategy(&self) -> XorStrategy {
        self.strategy
    }
}

/// Declared geometry and encoding tags of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapLayout {
    pub width: u32,
    pub height: u32,
    pub primary_format: u32,
    pub sub_format: u8,
}

impl BitmapLayout {
    /// Size of the canonical BGRA8 raster.
    pub fn raster_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Which path produced the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeOutcome {
    Inflated,
    DecryptedThenInflated,
    BlankFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    format: PixelFormat,
    sub_format: SubFormat,
    payload_len: usize,
    outcome: DecodeOutcome,
    pixels: Vec<u8>,
}

impl DecodedRaster {
    /// BGRA8 pixels, row-major, `width * height * 4` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Format the pixels were interpreted as; `Bgra8888` after a fallback.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn sub_format(&self) -> SubFormat {
        self.sub_format
    }

    /// Blob length once record framing has been stripped.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn outcome(&self) -> DecodeOutcome {
        self.outcome
    }

    /// Copy of the pixels with red and blue swapped, for RGBA consumers.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = self.pixels.clone();
        for pixel in rgba.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
        rgba
    }
}

enum Unwrapped {
    Decoded {
        outcome: DecodeOutcome,
        produced: usize,
        payload_len: usize,
    },
    Blank {
        payload_len: usize,
    },
}

/// Decode one bitmap blob into a canonical raster.
///
/// Compression and encryption failures degrade to a blank raster; only
/// unknown format tags are reported as errors.
pub fn decode_payload(
    blob: &[u8],
    layout: BitmapLayout,
    context: &DecodeContext,
) -> Result<DecodedRaster, DecodeError> {
    let raster_len = layout.raster_len();
    let mut buffer = vec![0u8; raster_len.max(blob.len())];

    let (outcome, layout, produced, payload_len) = match unwrap_payload(blob, &mut buffer, context) {
        Unwrapped::Decoded {
            outcome,
            produced,
            payload_len,
        } => (outcome, layout, produced, payload_len),
        Unwrapped::Blank { payload_len } => {
            log::info!(
                "bitmap {}x{} (format {}, sub-format {}) could not be unpacked; using blank raster",
                layout.width,
                layout.height,
                layout.primary_format,
                layout.sub_format
            );
            buffer[..raster_len].fill(0);
            let blank = BitmapLayout {
                primary_format: PixelFormat::Bgra8888.tag(),
                sub_format: SubFormat::Full.tag(),
                ..layout
            };
            (DecodeOutcome::BlankFallback, blank, raster_len, payload_len)
        }
    };

    let format = PixelFormat::from_tag(layout.primary_format)?;
    let sub_format = SubFormat::from_tag(layout.sub_format)?;
    let stored_pixels = sub_format.stored_pixels(layout.width, layout.height);

    let expected = expected_source_len(format, produced);
    if expected != stored_pixels * 4 {
        log::warn!(
            "size mismatch: {}x{} decompressed {} bytes for format {} sub-format {}",
            layout.width,
            layout.height,
            produced,
            layout.primary_format,
            layout.sub_format
        );
    }

    let converted = convert_pixels(format, &buffer[..produced], stored_pixels)?;
    let pixels = restore_resolution(sub_format, converted, layout.width, layout.height);

    Ok(DecodedRaster {
        width: layout.width,
        height: layout.height,
        format,
        sub_format,
        payload_len,
        outcome,
        pixels,
    })
}

fn unwrap_payload(blob: &[u8], buffer: &mut [u8], context: &DecodeContext) -> Unwrapped {
    match inflate_into(blob, buffer) {
        Ok(produced) => {
            return Unwrapped::Decoded {
                outcome: DecodeOutcome::Inflated,
                produced,
                payload_len: blob.len(),
            };
        }
        Err(err) => log::debug!("direct inflate of {} bytes failed: {err}", blob.len()),
    }

    let decrypted = match decrypt_blocks(blob, context.keystream(), context.strategy()) {
        Ok(decrypted) => decrypted,
        Err(err) => {
            log::debug!("decrypting {} bytes failed: {err}", blob.len());
            return Unwrapped::Blank {
                payload_len: blob.len(),
            };
        }
    };

    match inflate_into(&decrypted, buffer) {
        Ok(produced) => Unwrapped::Decoded {
            outcome: DecodeOutcome::DecryptedThenInflated,
            produced,
            payload_len: decrypted.len(),
        },
        Err(err) => {
            log::debug!("inflate after decrypt failed: {err}");
            Unwrapped::Blank {
                payload_len: decrypted.len(),
            }
        }
    }
}
