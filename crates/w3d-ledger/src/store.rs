//! Local ledger on an OpenDAL operator
//!
//! Emulates the file contract for one account so the engines can run without
//! a chain. Layout under the operator root:
//!
//! ```text
//! accounts/{account}/state.json             balance + next nonce
//! accounts/{account}/drive.json             drive record
//! accounts/{account}/files.json             file ids in creation order
//! accounts/{account}/files/{id}/meta.json   file record
//! accounts/{account}/files/{id}/chunks/{i}  chunk payload
//! ```
//!
//! Contract rules enforced here:
//! - a payment above the balance is rejected before a nonce is assigned
//! - a write paying less than the chunk cost reverts
//! - a write at an index past `countChunks` or at/after `chunkCount` reverts
//! - reverted transactions consume their nonce, successful ones debit the payment

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use w3d_chunks::{hash_chunk, ChunkHash};
use w3d_core::{
    ChunkWrite, DriveRecord, FileListing, FileRecord, Receipt, W3dError, W3dResult,
};

use crate::cost::CostSchedule;
use crate::ledger::Ledger;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct AccountState {
    balance_wei: u128,
    nonce: u64,
}

pub struct OperatorLedger {
    op: Operator,
    account: String,
    costs: CostSchedule,
    /// Serializes state-changing calls so nonces are assigned in order
    tx_lock: Mutex<()>,
}

impl OperatorLedger {
    pub fn new(op: Operator, account: impl Into<String>, costs: CostSchedule) -> Self {
        Self {
            op,
            account: account.into(),
            costs,
            tx_lock: Mutex::new(()),
        }
    }

    /// In-memory ledger, for tests and dry runs.
    pub fn memory(account: impl Into<String>, costs: CostSchedule) -> W3dResult<Self> {
        let op = Operator::new(opendal::services::Memory::default())
            .map_err(|e| storage_err("creating memory operator", e))?
            .finish();
        Ok(Self::new(op, account, costs))
    }

    /// A second handle on the same storage acting as another account.
    pub fn for_account(&self, account: impl Into<String>) -> Self {
        Self::new(self.op.clone(), account, self.costs.clone())
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub fn costs(&self) -> &CostSchedule {
        &self.costs
    }

    /// Credit `amount` wei to this account.
    pub async fn deposit(&self, amount: u128) -> W3dResult<u128> {
        let _guard = self.tx_lock.lock().await;
        let mut state = self.load_state().await?;
        state.balance_wei = state.balance_wei.saturating_add(amount);
        self.save_state(&state).await?;
        debug!(account = %self.account, amount, balance = state.balance_wei, "deposit");
        Ok(state.balance_wei)
    }

    fn account_root(&self, account: &str) -> String {
        format!("accounts/{account}")
    }

    fn state_path(&self) -> String {
        format!("{}/state.json", self.account_root(&self.account))
    }

    fn drive_path(&self) -> String {
        format!("{}/drive.json", self.account_root(&self.account))
    }

    fn index_path(&self, account: &str) -> String {
        format!("{}/files.json", self.account_root(account))
    }

    fn meta_path(&self, account: &str, file_id: &Uuid) -> String {
        format!("{}/files/{file_id}/meta.json", self.account_root(account))
    }

    fn chunk_path(&self, file_id: &Uuid, index: u64) -> String {
        format!(
            "{}/files/{file_id}/chunks/{index}",
            self.account_root(&self.account)
        )
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &str) -> W3dResult<Option<T>> {
        match self.op.read(path).await {
            Ok(buf) => {
                let value = serde_json::from_slice(&buf.to_vec()).map_err(|e| {
                    W3dError::FileCorrupted(format!("unreadable ledger object {path}: {e}"))
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(path, e)),
        }
    }

    async fn write_json<T: Serialize>(&self, path: &str, value: &T) -> W3dResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| W3dError::Ledger(format!("encoding {path}: {e}")))?;
        self.op
            .write(path, bytes)
            .await
            .map(|_| ())
            .map_err(|e| storage_err(path, e))
    }

    async fn delete(&self, path: &str) -> W3dResult<()> {
        self.op.delete(path).await.map_err(|e| storage_err(path, e))
    }

    async fn load_state(&self) -> W3dResult<AccountState> {
        Ok(self
            .read_json(&self.state_path())
            .await?
            .unwrap_or_default())
    }

    async fn save_state(&self, state: &AccountState) -> W3dResult<()> {
        self.write_json(&self.state_path(), state).await
    }

    async fn load_index(&self, account: &str) -> W3dResult<Vec<Uuid>> {
        Ok(self
            .read_json(&self.index_path(account))
            .await?
            .unwrap_or_default())
    }

    /// Assign the next nonce and persist it.
    async fn next_receipt(
        &self,
        state: &mut AccountState,
        kind: &str,
        status: bool,
    ) -> W3dResult<Receipt> {
        let nonce = state.nonce;
        state.nonce += 1;
        self.save_state(state).await?;
        Ok(Receipt {
            tx_hash: tx_hash(&self.account, nonce, kind),
            status,
            nonce,
        })
    }

    async fn revert(&self, state: &mut AccountState, kind: &str, reason: &str) -> W3dResult<Receipt> {
        let receipt = self.next_receipt(state, kind, false).await?;
        warn!(
            account = %self.account,
            tx = %receipt.tx_hash,
            reason,
            "transaction reverted"
        );
        Ok(receipt)
    }

    async fn contiguous_chunks(&self, file_id: &Uuid) -> W3dResult<u64> {
        let mut count = 0u64;
        loop {
            let path = self.chunk_path(file_id, count);
            let exists = self
                .op
                .exists(&path)
                .await
                .map_err(|e| storage_err(&path, e))?;
            if !exists {
                return Ok(count);
            }
            count += 1;
        }
    }

    /// Delete every chunk, the record, and the index entry. Unknown ids are a no-op.
    async fn remove_file(&self, file_id: &Uuid, index: &mut Vec<Uuid>) -> W3dResult<()> {
        let count = self.contiguous_chunks(file_id).await?;
        for i in 0..count {
            self.delete(&self.chunk_path(file_id, i)).await?;
        }
        self.delete(&self.meta_path(&self.account, file_id)).await?;
        index.retain(|id| id != file_id);
        Ok(())
    }
}

#[async_trait]
impl Ledger for OperatorLedger {
    fn account(&self) -> &str {
        &self.account
    }

    async fn write_chunk(&self, write: ChunkWrite<'_>, payment: u128) -> W3dResult<Receipt> {
        let _guard = self.tx_lock.lock().await;
        let mut state = self.load_state().await?;

        if payment > state.balance_wei {
            return Err(W3dError::TransactionFailed(format!(
                "insufficient funds: payment {payment} exceeds balance {}",
                state.balance_wei
            )));
        }

        let required = self.costs.chunk_cost(write.payload.len());
        if payment < required {
            return self
                .revert(&mut state, "writeChunk", "payment below chunk cost")
                .await;
        }
        if write.index >= write.chunk_count {
            return self
                .revert(&mut state, "writeChunk", "chunk index out of range")
                .await;
        }
        let stored = self.contiguous_chunks(&write.file_id).await?;
        if write.index > stored {
            return self
                .revert(&mut state, "writeChunk", "chunk index leaves a gap")
                .await;
        }

        self.op
            .write(&self.chunk_path(&write.file_id, write.index), write.payload.to_vec())
            .await
            .map_err(|e| storage_err("writing chunk", e))?;

        let meta_path = self.meta_path(&self.account, &write.file_id);
        let existing: Option<FileRecord> = self.read_json(&meta_path).await?;
        let created_at = match &existing {
            Some(record) => record.created_at,
            None => unix_now(),
        };
        let record = FileRecord {
            file_id: write.file_id,
            name: write.name.to_string(),
            mime_type: write.mime_type.to_string(),
            created_at,
            iv: write.iv.to_vec(),
            chunk_count: write.chunk_count,
        };
        self.write_json(&meta_path, &record).await?;
        if existing.is_none() {
            let index_path = self.index_path(&self.account);
            let mut index = self.load_index(&self.account).await?;
            if !index.contains(&write.file_id) {
                index.push(write.file_id);
                self.write_json(&index_path, &index).await?;
            }
        }

        state.balance_wei -= payment;
        let receipt = self.next_receipt(&mut state, "writeChunk", true).await?;
        debug!(
            file_id = %write.file_id,
            index = write.index,
            bytes = write.payload.len(),
            payment,
            tx = %receipt.tx_hash,
            "chunk committed"
        );
        Ok(receipt)
    }

    async fn count_chunks(&self, file_id: &Uuid) -> W3dResult<u64> {
        self.contiguous_chunks(file_id).await
    }

    async fn get_chunk_hash(&self, file_id: &Uuid, index: u64) -> W3dResult<Option<ChunkHash>> {
        let path = self.chunk_path(file_id, index);
        match self.op.read(&path).await {
            Ok(buf) => Ok(Some(hash_chunk(&buf.to_vec()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(&path, e)),
        }
    }

    async fn remove(&self, file_id: &Uuid) -> W3dResult<Receipt> {
        self.remove_many(std::slice::from_ref(file_id)).await
    }

    async fn remove_many(&self, file_ids: &[Uuid]) -> W3dResult<Receipt> {
        let _guard = self.tx_lock.lock().await;
        let mut state = self.load_state().await?;
        let mut index = self.load_index(&self.account).await?;
        for file_id in file_ids {
            self.remove_file(file_id, &mut index).await?;
        }
        self.write_json(&self.index_path(&self.account), &index)
            .await?;
        let kind = if file_ids.len() == 1 { "remove" } else { "removes" };
        self.next_receipt(&mut state, kind, true).await
    }

    async fn create_drive_record(&self, record: &DriveRecord) -> W3dResult<Receipt> {
        let _guard = self.tx_lock.lock().await;
        let mut state = self.load_state().await?;
        self.write_json(&self.drive_path(), record).await?;
        self.next_receipt(&mut state, "createDrive", true).await
    }

    async fn get_drive_record(&self) -> W3dResult<Option<DriveRecord>> {
        self.read_json(&self.drive_path()).await
    }

    async fn list_files(&self, account: &str) -> W3dResult<FileListing> {
        let mut listing = FileListing::default();
        for file_id in self.load_index(account).await? {
            match self.read_json::<FileRecord>(&self.meta_path(account, &file_id)).await? {
                Some(record) => listing.push(record),
                None => warn!(%file_id, "indexed file has no record"),
            }
        }
        Ok(listing)
    }

    async fn get_file_record(&self, file_id: &Uuid) -> W3dResult<Option<FileRecord>> {
        self.read_json(&self.meta_path(&self.account, file_id)).await
    }

    async fn get_chunk(&self, file_id: &Uuid, index: u64) -> W3dResult<Vec<u8>> {
        let path = self.chunk_path(file_id, index);
        match self.op.read(&path).await {
            Ok(buf) => Ok(buf.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(W3dError::FileCorrupted(format!(
                "chunk {index} of {file_id} is missing"
            ))),
            Err(e) => Err(storage_err(&path, e)),
        }
    }

    async fn balance(&self) -> W3dResult<u128> {
        Ok(self.load_state().await?.balance_wei)
    }
}

fn storage_err(what: &str, e: opendal::Error) -> W3dError {
    W3dError::Ledger(format!("{what}: {e}"))
}

fn tx_hash(account: &str, nonce: u64, kind: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(account.as_bytes());
    hasher.update(nonce.to_be_bytes());
    hasher.update(kind.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
