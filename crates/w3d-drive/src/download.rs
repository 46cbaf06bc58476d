//! Download engine: fetch chunks → reassemble → decrypt

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use w3d_chunks::join_indexed;
use w3d_core::{FileRecord, W3dError, W3dResult};
use w3d_crypto::{decrypt, derive_file_key, DriveKey};
use w3d_ledger::Ledger;

use crate::progress::{emit, ProgressEvent, ProgressSender};

/// A decrypted file and its ledger record
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub record: FileRecord,
    pub bytes: Vec<u8>,
}

/// Result of downloading a file to disk
#[derive(Debug)]
pub struct DownloadResult {
    pub record: FileRecord,
    pub local_path: PathBuf,
    pub bytes: u64,
}

pub struct DownloadEngine<L: ?Sized> {
    ledger: Arc<L>,
    concurrency: usize,
}

impl<L: Ledger + ?Sized> DownloadEngine<L> {
    pub fn new(ledger: Arc<L>, concurrency: usize) -> Self {
        Self {
            ledger,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch(
        &self,
        file_id: &Uuid,
        drive_key: &DriveKey,
        progress: Option<&ProgressSender>,
    ) -> W3dResult<DownloadedFile> {
        let record = self
            .ledger
            .get_file_record(file_id)
            .await?
            .ok_or_else(|| W3dError::FileCorrupted(format!("no record for file {file_id}")))?;

        let total = record.chunk_count;
        let stored = self.ledger.count_chunks(file_id).await?;
        if total == 0 || stored != total {
            return Err(W3dError::FileCorrupted(format!(
                "file {file_id} records {total} chunks but the ledger holds {stored}"
            )));
        }

        emit(
            progress,
            ProgressEvent::Started {
                file_id: *file_id,
                chunk_count: total,
                bytes: 0,
            },
        );

        let ledger = &self.ledger;
        let mut fetches = stream::iter(0..total)
            .map(|index| async move {
                ledger
                    .get_chunk(file_id, index)
                    .await
                    .map(|payload| (index, payload))
            })
            .buffered(self.concurrency);

        let mut pieces = Vec::with_capacity(total as usize);
        while let Some(fetched) = fetches.next().await {
            let (index, payload) = fetched?;
            debug!(%file_id, index, bytes = payload.len(), "chunk fetched");
            pieces.push((index, payload));
            emit(
                progress,
                ProgressEvent::ChunkFetched {
                    index,
                    completed: pieces.len() as u64,
                    total,
                },
            );
        }

        check_piece_lengths(file_id, &pieces)?;
        let ciphertext = join_indexed(pieces)?;

        let file_key = derive_file_key(drive_key, &file_id.to_string())?;
        let bytes = decrypt(&file_key, &record.iv, &ciphertext)?;

        info!(%file_id, name = %record.name, chunks = total, bytes = bytes.len(), "downloaded");
        Ok(DownloadedFile { record, bytes })
    }

    /// Fetch and write atomically to `local_path` (tmp file + rename).
    pub async fn fetch_to_path(
        &self,
        file_id: &Uuid,
        drive_key: &DriveKey,
        local_path: &Path,
        progress: Option<&ProgressSender>,
    ) -> W3dResult<DownloadResult> {
        let file = self.fetch(file_id, drive_key, progress).await?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = local_path.with_extension("w3d_tmp");
        let written = match tokio::fs::write(&tmp, &file.bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, local_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                debug!(path = %tmp.display(), "tmp file not removed: {cleanup}");
            }
            return Err(e.into());
        }

        Ok(DownloadResult {
            bytes: file.bytes.len() as u64,
            record: file.record,
            local_path: local_path.to_path_buf(),
        })
    }
}

/// Every piece but the last has the split length; the last is not longer.
fn check_piece_lengths(file_id: &Uuid, pieces: &[(u64, Vec<u8>)]) -> W3dResult<()> {
    let Some(((_, first), rest)) = pieces.split_first() else {
        return Ok(());
    };
    let expected = first.len();
    let last = rest.len();
    for (pos, (index, payload)) in rest.iter().enumerate() {
        let ok = if pos + 1 == last {
            payload.len() <= expected
        } else {
            payload.len() == expected
        };
        if !ok {
            return Err(W3dError::FileCorrupted(format!(
                "chunk {index} of {file_id} is {} bytes, expected {expected}",
                payload.len()
            )));
        }
    }
    Ok(())
}
