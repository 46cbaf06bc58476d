//! Keccak-256 chunk hashing
//!
//! The ledger contract stores `keccak256(data)` for each committed chunk. The
//! local digest must use the same function, or the dedup comparison can never
//! match.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use w3d_core::{W3dError, W3dResult};

/// A 256-bit chunk digest, displayed as `0x` + 64 hex chars
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHash([u8; 32]);

impl ChunkHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex with `0x` prefix (66 chars)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> W3dResult<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| W3dError::InvalidInput(format!("invalid chunk hash '{s}': {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            W3dError::InvalidInput(format!("chunk hash must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChunkHash({})", self.to_hex())
    }
}

impl Serialize for ChunkHash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChunkHash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        ChunkHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash one chunk payload.
pub fn hash_chunk(data: &[u8]) -> ChunkHash {
    ChunkHash(Keccak256::digest(data).into())
}
