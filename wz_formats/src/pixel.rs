//! Expansion of packed pixel encodings into BGRA8.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::DecodeError;

pub const TABLE4: [u8; 0x10] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
];

pub const TABLE5: [u8; 0x20] = [
    0x00, 0x08, 0x10, 0x19, 0x21, 0x29, 0x31, 0x3A, 0x42, 0x4A, 0x52, 0x5A, 0x63, 0x6B, 0x73, 0x7B,
    0x84, 0x8C, 0x94, 0x9C, 0xA5, 0xAD, 0xB5, 0xBD, 0xC5, 0xCE, 0xD6, 0xDE, 0xE6, 0xEF, 0xF7, 0xFF,
];

pub const TABLE6: [u8; 0x40] = [
    0x00, 0x04, 0x08, 0x0C, 0x10, 0x14, 0x18, 0x1C, 0x20, 0x24, 0x28, 0x2D, 0x31, 0x35, 0x39, 0x3D,
    0x41, 0x45, 0x49, 0x4D, 0x51, 0x55, 0x59, 0x5D, 0x61, 0x65, 0x69, 0x6D, 0x71, 0x75, 0x79, 0x7D,
    0x82, 0x86, 0x8A, 0x8E, 0x92, 0x96, 0x9A, 0x9E, 0xA2, 0xA6, 0xAA, 0xAE, 0xB2, 0xB6, 0xBA, 0xBE,
    0xC2, 0xC6, 0xCA, 0xCE, 0xD2, 0xD7, 0xDB, 0xDF, 0xE3, 0xE7, 0xEB, 0xEF, 0xF3, 0xF7, 0xFB, 0xFF,
];

/// Pixel encodings a bitmap blob may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 16-bit little-endian word, nibbles B, G, R, A from the low end.
    Bgra4444,
    /// Four bytes per pixel, already in output order.
    Bgra8888,
    /// 16-bit little-endian word, B in bits 0-4, G in 5-10, R in 11-15.
    Bgr565,
    /// DXT-style block texels. Recognised but not decoded.
    BlockCompressed,
}

impl PixelFormat {
    pub fn from_tag(tag: u32) -> Result<Self, DecodeError> {
        match tag {
            1 => Ok(PixelFormat::Bgra4444),
            2 => Ok(PixelFormat::Bgra8888),
            513 => Ok(PixelFormat::Bgr565),
            1026 => Ok(PixelFormat::BlockCompressed),
            other => Err(DecodeError::UnsupportedPixelFormat(other)),
        }
    }

    pub const fn tag(self) -> u32 {
        match self {
            PixelFormat::Bgra4444 => 1,
            PixelFormat::Bgra8888 => 2,
            PixelFormat::Bgr565 => 513,
            PixelFormat::BlockCompressed => 1026,
        }
    }

    /// Ratio between an expanded BGRA8 buffer and the stored bytes.
    pub const fn expansion_factor(self) -> usize {
        match self {
            PixelFormat::Bgra4444 | PixelFormat::Bgr565 => 2,
            PixelFormat::Bgra8888 => 1,
            PixelFormat::BlockCompressed => 4,
        }
    }
}

/// Whether the stored grid is full size or reduced by [`crate::upscale::BLOCK_FACTOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubFormat {
    Full,
    Reduced,
}

impl SubFormat {
    pub fn from_tag(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            0 => Ok(SubFormat::Full),
            4 => Ok(SubFormat::Reduced),
            other => Err(DecodeError::UnsupportedSubFormat(other)),
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            SubFormat::Full => 0,
            SubFormat::Reduced => 4,
        }
    }

    /// Number of stored pixels for a bitmap of `width` x `height`.
    pub fn stored_pixels(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            SubFormat::Full => pixels,
            SubFormat::Reduced => pixels / 256,
        }
    }
}

/// Expanded size implied by `decompressed` stored bytes.
pub fn expected_source_len(format: PixelFormat, decompressed: usize) -> usize {
    decompressed * format.expansion_factor()
}

/// Expand `pixel_count` pixels of `src` into BGRA8. Pixels the source is too
/// short to cover are left zeroed.
pub fn convert_pixels(
    format: PixelFormat,
    src: &[u8],
    pixel_count: usize,
) -> Result<Vec<u8>, DecodeError> {
    let expand: fn(u16) -> [u8; 4] = match format {
        PixelFormat::Bgra4444 => expand_4444,
        PixelFormat::Bgr565 => expand_565,
        PixelFormat::Bgra8888 => {
            let mut out = vec![0u8; pixel_count * 4];
            let len = src.len().min(out.len());
            out[..len].copy_from_slice(&src[..len]);
            return Ok(out);
        }
        PixelFormat::BlockCompressed => {
            return Err(DecodeError::UnsupportedPixelFormat(format.tag()));
        }
    };

    let mut out = vec![0u8; pixel_count * 4];
    for (dst, word) in out.chunks_exact_mut(4).zip(src.chunks_exact(2)) {
        dst.copy_from_slice(&expand(LittleEndian::read_u16(word)));
    }
    Ok(out)
}

#[inline]
fn expand_4444(word: u16) -> [u8; 4] {
    let b = word & 0xF;
    let g = (word >> 4) & 0xF;
    let r = (word >> 8) & 0xF;
    let a = (word >> 12) & 0xF;
    [
        TABLE4[b as usize],
        TABLE4[g as usize],
        TABLE4[r as usize],
        TABLE4[a as usize],
    ]
}

#[inline]
fn expand_565(word: u16) -> [u8; 4] {
    let b = word & 0x1F;
    let g = (word >> 5) & 0x3F;
    let r = (word >> 11) & 0x1F;
    [TABLE5[b as usize], TABLE6[g as usize], TABLE5[r as usize], 0xFF]
}
