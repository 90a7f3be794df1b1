use std::io::Write;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::NamedTempFile;
use wz_formats::{
    AssetReader, BitmapDescriptor, DecodeContext, DecodeError, DecodeOutcome, KEYSTREAM_LEN,
    KeyStream, MappedArchive, MemoryReader, XorStrategy,
};

const MARKER: u8 = 0x01;

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn keystream() -> Arc<KeyStream> {
    let bytes: Vec<u8> = (0..KEYSTREAM_LEN)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(0x5C))
        .collect();
    Arc::new(KeyStream::from_bytes(&bytes).unwrap())
}

fn encrypt_records(plain: &[u8], lengths: &[usize], keystream: &KeyStream) -> Vec<u8> {
    let key = keystream.as_bytes();
    let mut blob = Vec::new();
    let mut pos = 0;
    for &len in lengths {
        blob.extend_from_slice(&(len as u32).to_le_bytes());
        blob.extend(
            plain[pos..pos + len]
                .iter()
                .zip(key.iter())
                .map(|(byte, k)| byte ^ k),
        );
        pos += len;
    }
    blob
}

fn store_with_blob(blob: &[u8]) -> Arc<dyn AssetReader> {
    let mut store = vec![MARKER];
    store.extend_from_slice(blob);
    Arc::new(MemoryReader::new(store))
}

fn bitmap(
    blob: &[u8],
    width: u32,
    height: u32,
    primary_format: u32,
    sub_format: u8,
    context: DecodeContext,
) -> BitmapDescriptor {
    BitmapDescriptor::new(
        width,
        height,
        blob.len() as u32,
        0,
        primary_format,
        sub_format,
        store_with_blob(blob),
        Arc::new(context),
    )
    .unwrap()
}

#[test]
fn encrypted_two_record_blob_recovers_bgra_pixels() {
    let pixels: Vec<u8> = vec![
        10, 20, 30, 255, 40, 50, 60, 255, //
        10, 20, 30, 255, 40, 50, 60, 255,
    ];
    let mut stream = compress(&pixels);
    assert!(stream.len() <= 20, "fixture stream is {} bytes", stream.len());
    stream.resize(20, 0);

    let keystream = keystream();
    let blob = encrypt_records(&stream, &[8, 12], &keystream);
    assert_eq!(blob.len(), 28);

    for strategy in [XorStrategy::Scalar, XorStrategy::Vector] {
        let context = DecodeContext::new(keystream.clone()).with_strategy(strategy);
        let bitmap = bitmap(&blob, 2, 2, 2, 0, context);

        let raster = bitmap.raster().unwrap();
        assert_eq!(raster.outcome(), DecodeOutcome::DecryptedThenInflated);
        assert_eq!(raster.pixels(), &pixels[..]);
        assert_eq!(bitmap.effective_len(), 20);
        assert_eq!(bitmap.effective_format(), 2);
    }
}

#[test]
fn unreadable_blob_becomes_blank_raw8888() {
    let blob = [0x13u8, 0x37, 0x00, 0x00, 0xAA, 0xBB];
    let context = DecodeContext::new(keystream());
    let bitmap = bitmap(&blob, 16, 32, 513, 4, context);

    let raster = bitmap.raster().unwrap();
    assert_eq!(raster.outcome(), DecodeOutcome::BlankFallback);
    assert_eq!(raster.pixels().len(), 16 * 32 * 4);
    assert!(raster.pixels().iter().all(|&b| b == 0));
    assert_eq!(bitmap.effective_format(), 2);
    assert_eq!(bitmap.effective_sub_format(), 0);
}

#[test]
fn repeated_access_reuses_cached_raster() {
    let pixels: Vec<u8> = (0..64u8).collect();
    let blob = compress(&pixels);
    let bitmap = bitmap(&blob, 4, 4, 2, 0, DecodeContext::new(keystream()));

    let first = bitmap.raster().unwrap();
    let second = bitmap.raster().unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.pixels(), second.pixels());
    assert_eq!(bitmap.decode_passes(), 1);
}

#[test]
fn concurrent_access_decodes_once() {
    let pixels = vec![0x42u8; 8 * 8 * 4];
    let blob = compress(&pixels);
    let bitmap = bitmap(&blob, 8, 8, 2, 0, DecodeContext::new(keystream()));

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let raster = bitmap.raster().unwrap();
                assert_eq!(raster.pixels(), &pixels[..]);
            });
        }
    });
    assert_eq!(bitmap.decode_passes(), 1);
}

#[test]
fn subsampled_pixel_fills_sixteen_by_sixteen_block() {
    let blob = compress(&[10, 20, 30, 255]);
    let bitmap = bitmap(&blob, 16, 16, 2, 4, DecodeContext::new(keystream()));

    let raster = bitmap.raster().unwrap();
    assert_eq!(raster.pixels().len(), 16 * 16 * 4);
    assert!(raster.pixels().chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
}

#[test]
fn subsampled_565_expands_then_upscales() {
    // two stored pixels: blue, red
    let words: Vec<u8> = [0x001Fu16, 0xF800]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let blob = compress(&words);
    let bitmap = bitmap(&blob, 32, 16, 513, 4, DecodeContext::new(keystream()));

    let raster = bitmap.raster().unwrap();
    for (index, pixel) in raster.pixels().chunks_exact(4).enumerate() {
        let x = index % 32;
        let expected: [u8; 4] = if x < 16 { [255, 0, 0, 255] } else { [0, 0, 255, 255] };
        assert_eq!(pixel, expected, "pixel {index}");
    }
}

#[test]
fn bgra4444_expands_through_nibble_table() {
    let words: Vec<u8> = [0xF000u16, 0x0FFF, 0x1234, 0xFFFF]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let blob = compress(&words);
    let bitmap = bitmap(&blob, 2, 2, 1, 0, DecodeContext::new(keystream()));

    assert_eq!(
        bitmap.raster().unwrap().pixels(),
        &[
            0x00, 0x00, 0x00, 0xFF, //
            0xFF, 0xFF, 0xFF, 0x00, //
            0x44, 0x33, 0x22, 0x11, //
            0xFF, 0xFF, 0xFF, 0xFF,
        ]
    );
}

#[test]
fn unknown_format_propagates_without_caching() {
    let blob = compress(&[0u8; 16]);
    let bitmap = bitmap(&blob, 2, 2, 999, 0, DecodeContext::new(keystream()));

    assert_eq!(
        bitmap.raster().unwrap_err(),
        DecodeError::UnsupportedPixelFormat(999)
    );
    assert!(!bitmap.is_decoded());
}

#[test]
fn mapped_archive_backs_descriptors() {
    let pixels = vec![7u8; 4 * 4 * 4];
    let blob = compress(&pixels);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0xAB; 16]).unwrap();
    file.write_all(&[MARKER]).unwrap();
    file.write_all(&blob).unwrap();

    let archive: Arc<dyn AssetReader> = Arc::new(MappedArchive::open(file.path()).unwrap());
    let bitmap = BitmapDescriptor::new(
        4,
        4,
        blob.len() as u32,
        16,
        2,
        0,
        archive,
        Arc::new(DecodeContext::new(keystream())),
    )
    .unwrap();

    assert_eq!(bitmap.content().unwrap(), blob);
    assert_eq!(bitmap.raster().unwrap().pixels(), &pixels[..]);
}
