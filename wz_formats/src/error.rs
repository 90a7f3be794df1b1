use thiserror::Error;

/// Failures raised while locating a blob in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("offset {offset} is beyond the end of the store ({len} bytes)")]
    OffsetOutOfRange { offset: u64, len: u64 },
    #[error("read of {requested} bytes at {offset} overruns the store ({available} bytes left)")]
    ReadOutOfRange {
        offset: u64,
        requested: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A record header announces more payload than the blob holds.
    #[error(
        "block at offset {offset} declares {block_len} bytes but the blob is {declared_len} bytes long"
    )]
    MalformedBlockLength {
        offset: usize,
        block_len: u32,
        declared_len: usize,
    },
    #[error("pixel format {0} is not supported")]
    UnsupportedPixelFormat(u32),
    #[error("sub-format {0} is not supported")]
    UnsupportedSubFormat(u8),
    #[error("bitmap dimensions {width}x{height} must both be positive")]
    InvalidDimensions { width: u32, height: u32 },
    #[error(transparent)]
    Source(#[from] SourceError),
}
