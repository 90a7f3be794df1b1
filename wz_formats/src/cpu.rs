//! Runtime detection of 128-bit vector support.

use std::sync::OnceLock;

static HAS_VECTOR_XOR: OnceLock<bool> = OnceLock::new();

/// Whether the host can XOR 16-byte lanes natively (cached after first call).
#[cfg(target_arch = "x86_64")]
pub fn simd_available() -> bool {
    *HAS_VECTOR_XOR.get_or_init(|| is_x86_feature_detected!("sse2"))
}

#[cfg(target_arch = "aarch64")]
pub fn simd_available() -> bool {
    *HAS_VECTOR_XOR.get_or_init(|| std::arch::is_aarch64_feature_detected!("neon"))
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn simd_available() -> bool {
    *HAS_VECTOR_XOR.get_or_init(|| false)
}

/// How record payloads are XORed against the keystream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XorStrategy {
    Scalar,
    Vector,
}

impl XorStrategy {
    pub fn detect() -> Self {
        if simd_available() {
            XorStrategy::Vector
        } else {
            XorStrategy::Scalar
        }
    }
}
