use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;

use crate::decode::{BitmapLayout, DecodeContext, DecodedRaster, decode_payload};
use crate::error::{DecodeError, SourceError};
use crate::pixel::{PixelFormat, SubFormat};
use crate::reader::AssetReader;

/// Index metadata for one bitmap plus its lazily decoded raster.
pub struct BitmapDescriptor {
    width: u32,
    height: u32,
    encoded_len: u32,
    source_offset: u64,
    primary_format: u32,
    sub_format: u8,
    reader: Arc<dyn AssetReader>,
    context: Arc<DecodeContext>,
    raster: OnceCell<DecodedRaster>,
    decode_passes: AtomicUsize,
}

impl BitmapDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        encoded_len: u32,
        source_offset: u64,
        primary_format: u32,
        sub_format: u8,
        reader: Arc<dyn AssetReader>,
        context: Arc<DecodeContext>,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            encoded_len,
            source_offset,
            primary_format,
            sub_format,
            reader,
            context,
            raster: OnceCell::new(),
            decode_passes: AtomicUsize::new(0),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source_offset(&self) -> u64 {
        self.source_offset
    }

    pub fn primary_format(&self) -> u32 {
        self.primary_format
    }

    pub fn sub_format(&self) -> u8 {
        self.sub_format
    }

    /// Declared blob length, or the decrypted length once decoded.
    pub fn effective_len(&self) -> usize {
        self.raster
            .get()
            .map_or(self.encoded_len as usize, DecodedRaster::payload_len)
    }

    /// Format tag after decoding; a blank fallback reports RAW8888.
    pub fn effective_format(&self) -> u32 {
        self.raster
            .get()
            .map_or(self.primary_format, |raster| raster.format().tag())
    }

    pub fn effective_sub_format(&self) -> u8 {
        self.raster
            .get()
            .map_or(self.sub_format, |raster| raster.sub_format().tag())
    }

    /// Parsed tags, when they name a known encoding.
    pub fn formats(&self) -> Result<(PixelFormat, SubFormat), DecodeError> {
        Ok((
            PixelFormat::from_tag(self.effective_format())?,
            SubFormat::from_tag(self.effective_sub_format())?,
        ))
    }

    /// Raw undecoded blob, skipping the one-byte marker before it.
    pub fn content(&self) -> Result<Vec<u8>, SourceError> {
        self.reader.set_position(self.source_offset + 1);
        self.reader.read_bytes(self.encoded_len as usize)
    }

    /// Decoded BGRA8 raster. The pipeline runs at most once per successful
    /// decode, even under concurrent callers.
    pub fn raster(&self) -> Result<&DecodedRaster, DecodeError> {
        self.raster.get_or_try_init(|| self.decode())
    }

    pub fn is_decoded(&self) -> bool {
        self.raster.get().is_some()
    }

    /// How many times the decode pipeline has actually run.
    pub fn decode_passes(&self) -> usize {
        self.decode_passes.load(Ordering::Acquire)
    }

    fn decode(&self) -> Result<DecodedRaster, DecodeError> {
        self.decode_passes.fetch_add(1, Ordering::AcqRel);

        let view = self.reader.view_from(self.source_offset + 1)?;
        let len = self.encoded_len as usize;
        let blob = view.get(..len).ok_or(SourceError::ReadOutOfRange {
            offset: self.source_offset + 1,
            requested: len,
            available: view.len(),
        })?;

        let layout = BitmapLayout {
            width: self.width,
            height: self.height,
            primary_format: self.primary_format,
            sub_format: self.sub_format,
        };
        decode_payload(blob, layout, &self.context)
    }
}

impl std::fmt::Debug for BitmapDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapDescriptor")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_len", &self.encoded_len)
            .field("source_offset", &self.source_offset)
            .field("primary_format", &self.primary_format)
            .field("sub_format", &self.sub_format)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
