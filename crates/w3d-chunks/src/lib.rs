//! w3d-chunks: deterministic chunking and content hashing for ledger commits
//!
//! # Overview
//! - `hash`: Keccak-256 chunk digests, matching what the file contract reports
//!   from `getChunkHash`
//! - `split`: chunk-count formula, ceil-division split, ordered join

pub mod hash;
pub mod split;

pub use hash::{hash_chunk, ChunkHash};
pub use split::{chunk_count, join, join_indexed, split};
