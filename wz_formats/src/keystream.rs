//! The XOR table shared by every encrypted blob in a container.
//!
//! Key derivation happens elsewhere; this type only owns the finished table
//! and hands out read-only views of it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

pub const KEYSTREAM_LEN: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStreamError {
    #[error("keystream must be exactly {KEYSTREAM_LEN} bytes (got {0})")]
    WrongLength(usize),
}

#[derive(Clone, PartialEq, Eq)]
pub struct KeyStream {
    table: Box<[u8; KEYSTREAM_LEN]>,
}

impl KeyStream {
    /// Identity keystream; XOR against it leaves payloads untouched.
    pub fn zeroed() -> Self {
        Self {
            table: Box::new([0u8; KEYSTREAM_LEN]),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyStreamError> {
        let table: Box<[u8; KEYSTREAM_LEN]> = bytes
            .to_vec()
            .into_boxed_slice()
            .try_into()
            .map_err(|_| KeyStreamError::WrongLength(bytes.len()))?;
        Ok(Self { table })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("reading keystream {}", path.display()))?;
        let keystream = Self::from_bytes(&bytes)
            .with_context(|| format!("parsing keystream {}", path.display()))?;
        Ok(keystream)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEYSTREAM_LEN] {
        &self.table
    }

    #[inline]
    pub fn len(&self) -> usize {
        KEYSTREAM_LEN
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStream")
            .field("len", &KEYSTREAM_LEN)
            .field("head", &&self.table[..8])
            .finish()
    }
}
