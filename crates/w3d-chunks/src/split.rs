//! Fixed-count chunking of a ciphertext buffer
//!
//! A file is encrypted as one buffer, then cut into `n` slices of
//! `ceil(len / n)` bytes (the last one may be shorter). Each slice is one
//! ledger transaction, so `n` is chosen to keep slices under the per-write
//! limit:
//!
//! ```text
//! n = 1                      if len <= max
//! n = ceil(len / max)        otherwise
//! ```

use w3d_core::{W3dError, W3dResult};

/// Number of chunks needed so that no chunk exceeds `max_chunk_len`.
pub fn chunk_count(total_len: usize, max_chunk_len: usize) -> W3dResult<usize> {
    if max_chunk_len == 0 {
        return Err(W3dError::InvalidInput("max chunk length must be at least 1".into()));
    }
    Ok(total_len.div_ceil(max_chunk_len).max(1))
}

/// Split `data` into at most `target_count` slices of `ceil(len / target_count)` bytes.
///
/// The produced count can be smaller than the target when the ceiling leaves
/// nothing for the tail (9 bytes into 4 → 3+3+3). Callers record the produced
/// count, not the target. An empty buffer yields a single empty slice.
pub fn split(data: &[u8], target_count: usize) -> W3dResult<Vec<&[u8]>> {
    if target_count == 0 {
        return Err(W3dError::InvalidInput("chunk count must be at least 1".into()));
    }
    if data.is_empty() {
        return Ok(vec![data]);
    }

    let piece_len = data.len().div_ceil(target_count);
    Ok(data.chunks(piece_len).collect())
}

/// Concatenate slices in the order given.
pub fn join<T: AsRef<[u8]>>(pieces: &[T]) -> Vec<u8> {
    let total = pieces.iter().map(|p| p.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for piece in pieces {
        out.extend_from_slice(piece.as_ref());
    }
    out
}

/// Reassemble `(index, payload)` pairs that may arrive out of order.
///
/// Indices must cover `0..n` exactly once; a gap or duplicate means the
/// stored file is corrupted.
pub fn join_indexed(mut pieces: Vec<(u64, Vec<u8>)>) -> W3dResult<Vec<u8>> {
    pieces.sort_by_key(|(index, _)| *index);
    for (expected, (index, _)) in pieces.iter().enumerate() {
        if *index != expected as u64 {
            return Err(W3dError::FileCorrupted(format!(
                "chunk indices not contiguous: expected {expected}, found {index}"
            )));
        }
    }
    let payloads: Vec<Vec<u8>> = pieces.into_iter().map(|(_, p)| p).collect();
    Ok(join(&payloads))
}
