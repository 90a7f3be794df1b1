//! Block-framed XOR decryption.
//!
//! An encrypted blob is a run of records, each a little-endian `u32` length
//! followed by that many payload bytes. Every payload is XORed against the
//! keystream starting at key index 0, and the length headers are dropped.

use byteorder::{ByteOrder, LittleEndian};

use crate::cpu::XorStrategy;
use crate::error::DecodeError;
use crate::keystream::{KEYSTREAM_LEN, KeyStream};

const HEADER_LEN: usize = 4;
const LANE: usize = 16;

/// Strip the record framing from `blob` and return the decrypted payloads,
/// concatenated. The length of the returned buffer is the blob's new
/// effective length.
pub fn decrypt_blocks(
    blob: &[u8],
    keystream: &KeyStream,
    strategy: XorStrategy,
) -> Result<Vec<u8>, DecodeError> {
    let mut output = Vec::with_capacity(blob.len());
    let mut pos = 0usize;

    while blob.len() - pos >= HEADER_LEN {
        let block_len = LittleEndian::read_u32(&blob[pos..pos + HEADER_LEN]);
        let start = pos + HEADER_LEN;
        let end = start
            .checked_add(block_len as usize)
            .filter(|&end| end <= blob.len() && block_len as usize <= KEYSTREAM_LEN)
            .ok_or(DecodeError::MalformedBlockLength {
                offset: pos,
                block_len,
                declared_len: blob.len(),
            })?;

        let written = output.len();
        output.resize(written + block_len as usize, 0);
        xor_record(
            &blob[start..end],
            keystream.as_bytes(),
            &mut output[written..],
            strategy,
        );
        pos = end;
    }

    Ok(output)
}

/// XOR one record payload into `dst`. `key` and `dst` must be at least as
/// long as `src`.
pub fn xor_record(src: &[u8], key: &[u8], dst: &mut [u8], strategy: XorStrategy) {
    let key = &key[..src.len()];
    let dst = &mut dst[..src.len()];

    let done = match strategy {
        XorStrategy::Scalar => 0,
        XorStrategy::Vector => xor_lanes(src, key, dst),
    };

    for ((out, &byte), &k) in dst[done..].iter_mut().zip(&src[done..]).zip(&key[done..]) {
        *out = byte ^ k;
    }
}

/// XOR every whole 16-byte lane and return how many bytes were covered.
#[cfg(target_arch = "x86_64")]
fn xor_lanes(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    if !crate::cpu::simd_available() {
        return xor_lanes_portable(src, key, dst);
    }
    // SAFETY: sse2 presence was checked above and the slices share a length.
    unsafe { xor_lanes_sse2(src, key, dst) }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn xor_lanes_sse2(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    use std::arch::x86_64::{__m128i, _mm_loadu_si128, _mm_storeu_si128, _mm_xor_si128};

    let lanes = src.len() / LANE;
    for lane in 0..lanes {
        let at = lane * LANE;
        // SAFETY: `at + LANE <= len` for all three slices; unaligned ops.
        unsafe {
            let data = _mm_loadu_si128(src.as_ptr().add(at) as *const __m128i);
            let mask = _mm_loadu_si128(key.as_ptr().add(at) as *const __m128i);
            _mm_storeu_si128(
                dst.as_mut_ptr().add(at) as *mut __m128i,
                _mm_xor_si128(data, mask),
            );
        }
    }
    lanes * LANE
}

#[cfg(target_arch = "aarch64")]
fn xor_lanes(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    if !crate::cpu::simd_available() {
        return xor_lanes_portable(src, key, dst);
    }
    // SAFETY: neon presence was checked above and the slices share a length.
    unsafe { xor_lanes_neon(src, key, dst) }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn xor_lanes_neon(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    use std::arch::aarch64::{veorq_u8, vld1q_u8, vst1q_u8};

    let lanes = src.len() / LANE;
    for lane in 0..lanes {
        let at = lane * LANE;
        // SAFETY: `at + LANE <= len` for all three slices.
        unsafe {
            let data = vld1q_u8(src.as_ptr().add(at));
            let mask = vld1q_u8(key.as_ptr().add(at));
            vst1q_u8(dst.as_mut_ptr().add(at), veorq_u8(data, mask));
        }
    }
    lanes * LANE
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn xor_lanes(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    xor_lanes_portable(src, key, dst)
}

/// Lane-at-a-time XOR through `u128` for hosts without vector registers.
fn xor_lanes_portable(src: &[u8], key: &[u8], dst: &mut [u8]) -> usize {
    let mut done = 0;
    for ((out, data), mask) in dst
        .chunks_exact_mut(LANE)
        .zip(src.chunks_exact(LANE))
        .zip(key.chunks_exact(LANE))
    {
        let mut lane = [0u8; LANE];
        lane.copy_from_slice(data);
        let mut key_lane = [0u8; LANE];
        key_lane.copy_from_slice(mask);
        let value = u128::from_ne_bytes(lane) ^ u128::from_ne_bytes(key_lane);
        out.copy_from_slice(&value.to_ne_bytes());
        done += LANE;
    }
    done
}
