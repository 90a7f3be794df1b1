//! zlib inflation into a caller-sized buffer.
//!
//! Bitmap blobs are not always terminated streams: the container records the
//! exact blob size, and some payloads simply stop once the pixels have been
//! written. The decoder therefore accepts a stream that runs out of input
//! (or fills the output) without hitting a data error.

use flate2::{Decompress, DecompressError, FlushDecompress, Status};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InflateError {
    #[error("no input to inflate")]
    Empty,
    #[error("corrupt zlib stream: {0}")]
    Corrupt(#[from] DecompressError),
    #[error("zlib stream stalled after consuming {consumed} of {available} input bytes")]
    Stalled { consumed: usize, available: usize },
}

/// Inflate `input` into `output`, returning the number of bytes produced.
/// Bytes of `output` past the returned count are left untouched.
pub fn inflate_into(input: &[u8], output: &mut [u8]) -> Result<usize, InflateError> {
    if input.is_empty() {
        return Err(InflateError::Empty);
    }

    let mut stream = Decompress::new(true);
    let status = stream.decompress(input, output, FlushDecompress::Finish)?;

    let consumed = stream.total_in() as usize;
    let produced = stream.total_out() as usize;
    match status {
        Status::StreamEnd => Ok(produced),
        Status::Ok | Status::BufError
            if consumed == input.len() || produced == output.len() =>
        {
            Ok(produced)
        }
        Status::Ok | Status::BufError => Err(InflateError::Stalled {
            consumed,
            available: input.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_terminated_stream() {
        let pixels: Vec<u8> = (0..64u8).collect();
        let compressed = compress(&pixels);
        let mut output = vec![0u8; 128];

        let produced = inflate_into(&compressed, &mut output).unwrap();
        assert_eq!(produced, 64);
        assert_eq!(&output[..64], &pixels[..]);
    }

    #[test]
    fn accepts_stream_cut_before_its_trailer() {
        let pixels = vec![0x5Au8; 4096];
        let compressed = compress(&pixels);
        // Drop the adler32 trailer; the deflate data itself is complete.
        let truncated = &compressed[..compressed.len() - 4];
        let mut output = vec![0u8; 4096];

        let produced = inflate_into(truncated, &mut output).unwrap();
        assert_eq!(produced, 4096);
        assert!(output.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn accepts_output_filled_exactly() {
        let pixels: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let compressed = compress(&pixels);
        let mut output = vec![0u8; 400];

        let produced = inflate_into(&compressed, &mut output).unwrap();
        assert_eq!(produced, 400);
        assert_eq!(&output[..], &pixels[..400]);
    }

    #[test]
    fn rejects_garbage_header() {
        let garbage = [0x08, 0x00, 0x00, 0x00, 0x11, 0x22, 0x33, 0x44];
        let mut output = vec![0u8; 16];
        assert!(matches!(
            inflate_into(&garbage, &mut output),
            Err(InflateError::Corrupt(_))
        ));
    }

    #[test]
    fn empty_input_is_not_a_stream() {
        let mut output = vec![0u8; 16];
        assert!(matches!(
            inflate_into(&[], &mut output),
            Err(InflateError::Empty)
        ));
    }
}
