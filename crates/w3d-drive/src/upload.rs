//! Upload engine: encrypt → chunk → commit, one transaction per chunk
//!
//! The whole file is sealed once under its FileKey, then the ciphertext is cut
//! into `n` slices. Slices are submitted strictly in index order; slice `i` is
//! only attempted after slice `i - 1` was confirmed or skipped. The first
//! failure ends the upload. Slices already on the ledger stay there, and a
//! later retry can skip the ones whose hash still matches.
//!
//! Per slice:
//!   1. balance check: balance < cost → `NotEnoughBalance`
//!   2. dedup check:   ledger hash == local hash → skip
//!   3. `write_chunk` with the estimated payment, await the receipt
//!
//! A shrinking re-upload first removes the old version, but only when the
//! balance covers the whole new version.
//!
//! Balance and hash lookups are advisory. If the query itself errors, the
//! engine logs and submits anyway; the ledger is the final judge.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};
use uuid::Uuid;

use w3d_chunks::{chunk_count, hash_chunk, split};
use w3d_core::config::W3dConfig;
use w3d_core::{ChunkWrite, W3dError, W3dResult};
use w3d_crypto::{derive_file_key, encrypt, encrypt_with_iv, DriveKey, NONCE_SIZE};
use w3d_ledger::{CostSchedule, Ledger};

use crate::progress::{emit, ProgressEvent, ProgressSender};

/// One file to store.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    pub data: &'a [u8],
    /// Overwrite this file instead of creating a new one
    pub file_id: Option<Uuid>,
    /// Seal under this IV instead of a fresh one. Only for reproducible re-uploads.
    pub pinned_iv: Option<[u8; NONCE_SIZE]>,
}

impl<'a> UploadRequest<'a> {
    pub fn new(name: &'a str, mime_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            mime_type,
            data,
            file_id: None,
            pinned_iv: None,
        }
    }

    pub fn with_file_id(mut self, file_id: Uuid) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn with_pinned_iv(mut self, iv: [u8; NONCE_SIZE]) -> Self {
        self.pinned_iv = Some(iv);
        self
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub max_chunk_bytes: usize,
    pub check_balance: bool,
    pub dedup: bool,
    /// Base of the share location returned for each upload
    pub gateway_url: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&W3dConfig::default())
    }
}

impl From<&W3dConfig> for UploadOptions {
    fn from(cfg: &W3dConfig) -> Self {
        Self {
            max_chunk_bytes: cfg.upload.max_chunk_bytes,
            check_balance: cfg.upload.check_balance,
            dedup: cfg.upload.dedup,
            gateway_url: cfg.ledger.gateway_url.clone(),
        }
    }
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_id: Uuid,
    pub chunk_count: u64,
    /// Chunks submitted in this run
    pub written: u64,
    /// Chunks already present with a matching hash
    pub skipped: u64,
    /// Plaintext size
    pub bytes: u64,
    /// `{gateway}/{account}/{file_id}`
    pub location: String,
    /// `data:` URL of the plaintext for image types
    pub preview: Option<String>,
}

pub struct UploadEngine<L: ?Sized> {
    ledger: Arc<L>,
    costs: CostSchedule,
    options: UploadOptions,
}

impl<L: Ledger + ?Sized> UploadEngine<L> {
    pub fn new(ledger: Arc<L>, costs: CostSchedule, options: UploadOptions) -> Self {
        Self {
            ledger,
            costs,
            options,
        }
    }

    pub async fn upload(
        &self,
        drive_key: &DriveKey,
        request: UploadRequest<'_>,
        progress: Option<&ProgressSender>,
    ) -> W3dResult<UploadOutcome> {
        let file_id = request.file_id.unwrap_or_else(Uuid::new_v4);
        let file_key = derive_file_key(drive_key, &file_id.to_string())?;

        let (ciphertext, iv) = match request.pinned_iv {
            Some(iv) => (encrypt_with_iv(&file_key, &iv, request.data)?, iv),
            None => {
                let sealed = encrypt(&file_key, request.data)?;
                (sealed.ciphertext, sealed.iv)
            }
        };

        let target = chunk_count(ciphertext.len(), self.options.max_chunk_bytes)?;
        let pieces = split(&ciphertext, target)?;
        let total = pieces.len() as u64;

        emit(
            progress,
            ProgressEvent::Started {
                file_id,
                chunk_count: total,
                bytes: request.data.len() as u64,
            },
        );

        let full_cost = pieces
            .iter()
            .map(|piece| self.costs.chunk_cost(piece.len()))
            .sum();
        self.clear_stale_tail(&file_id, total, full_cost).await?;

        let mut written = 0u64;
        let mut skipped = 0u64;
        for (i, piece) in pieces.iter().enumerate() {
            let index = i as u64;
            let cost = self.costs.chunk_cost(piece.len());

            if self.options.check_balance {
                match self.ledger.balance().await {
                    Ok(available) if available < cost => {
                        return Err(W3dError::NotEnoughBalance {
                            index,
                            required: cost,
                            available,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => warn!(%file_id, index, "balance query failed, submitting anyway: {e}"),
                }
            }

            if self.options.dedup {
                match self.ledger.get_chunk_hash(&file_id, index).await {
                    Ok(Some(remote)) if remote == hash_chunk(piece) => {
                        skipped += 1;
                        debug!(%file_id, index, "chunk unchanged, skipping");
                        emit(
                            progress,
                            ProgressEvent::ChunkSkipped {
                                index,
                                completed: index + 1,
                                total,
                            },
                        );
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(%file_id, index, "hash query failed, submitting anyway: {e}"),
                }
            }

            let write = ChunkWrite {
                file_id,
                name: request.name,
                iv: &iv,
                mime_type: request.mime_type,
                chunk_count: total,
                index,
                payload: piece,
            };
            let receipt = match self.ledger.write_chunk(write, cost).await {
                Ok(receipt) => receipt.confirmed("writeChunk"),
                Err(e) => Err(e),
            };
            let receipt = receipt.map_err(|e| W3dError::upload_failed(index, index, e))?;

            written += 1;
            debug!(%file_id, index, bytes = piece.len(), cost, tx = %receipt.tx_hash, "chunk committed");
            emit(
                progress,
                ProgressEvent::ChunkCommitted {
                    index,
                    completed: index + 1,
                    total,
                    tx_hash: receipt.tx_hash,
                },
            );
        }

        let location = format!(
            "{}/{}/{}",
            self.options.gateway_url.trim_end_matches('/'),
            self.ledger.account(),
            file_id
        );
        let preview = request
            .mime_type
            .starts_with("image/")
            .then(|| format!("data:{};base64,{}", request.mime_type, STANDARD.encode(request.data)));

        info!(
            %file_id,
            name = request.name,
            chunks = total,
            written,
            skipped,
            bytes = request.data.len(),
            "uploaded"
        );

        Ok(UploadOutcome {
            file_id,
            chunk_count: total,
            written,
            skipped,
            bytes: request.data.len() as u64,
            location,
            preview,
        })
    }

    /// Remove the file first if the ledger holds more chunks than this upload
    /// will write, so no trailing chunk of an older version survives.
    ///
    /// The removal is only submitted once the balance covers every chunk of
    /// the new version; otherwise the old version stays intact and the upload
    /// fails with `NotEnoughBalance` at index 0.
    async fn clear_stale_tail(&self, file_id: &Uuid, total: u64, full_cost: u128) -> W3dResult<()> {
        match self.ledger.count_chunks(file_id).await {
            Ok(existing) if existing > total => {
                if self.options.check_balance {
                    match self.ledger.balance().await {
                        Ok(available) if available < full_cost => {
                            return Err(W3dError::NotEnoughBalance {
                                index: 0,
                                required: full_cost,
                                available,
                            });
                        }
                        Ok(_) => {}
                        Err(e) => warn!(%file_id, "balance query failed, clearing anyway: {e}"),
                    }
                }
                let receipt = self
                    .ledger
                    .remove(file_id)
                    .await?
                    .confirmed("remove stale chunks")?;
                info!(%file_id, existing, total, tx = %receipt.tx_hash, "cleared stale chunks");
            }
            Ok(_) => {}
            Err(e) => warn!(%file_id, "chunk count query failed, not clearing: {e}"),
        }
        Ok(())
    }
}
