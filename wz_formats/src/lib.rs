pub mod bitmap;
pub mod cpu;
pub mod decode;
pub mod decrypt;
pub mod error;
pub mod inflate;
pub mod keystream;
pub mod pixel;
pub mod reader;
pub mod upscale;

pub use bitmap::BitmapDescriptor;
pub use cpu::{XorStrategy, simd_available};
pub use decode::{BitmapLayout, DecodeContext, DecodeOutcome, DecodedRaster, decode_payload};
pub use decrypt::decrypt_blocks;
pub use error::{DecodeError, SourceError};
pub use inflate::{InflateError, inflate_into};
pub use keystream::{KEYSTREAM_LEN, KeyStream, KeyStreamError};
pub use pixel::{PixelFormat, SubFormat, convert_pixels};
pub use reader::{AssetReader, ByteReader, MappedArchive, MemoryReader};
pub use upscale::{BLOCK_FACTOR, upscale_blocks};
