//! Shared fixtures: a memory ledger wrapped to record writes and inject faults.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use w3d_chunks::ChunkHash;
use w3d_core::{ChunkWrite, DriveRecord, FileListing, FileRecord, Receipt, W3dError, W3dResult};
use w3d_crypto::{DriveKey, KdfParams};
use w3d_ledger::{CostSchedule, Ledger, OperatorLedger};

pub const ACCOUNT: &str = "0x00000000000000000000000000000000000a11ce";
pub const ETH: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
pub struct Faults {
    /// Transport error on the write of this index
    pub fail_write_at: Option<u64>,
    /// Mined-but-reverted receipt on the write of this index
    pub revert_write_at: Option<u64>,
    /// Mined-but-reverted receipt on `create_drive_record`
    pub revert_create_drive: bool,
    pub fail_hash_queries: bool,
    pub fail_balance_queries: bool,
}

pub struct TestLedger {
    pub inner: OperatorLedger,
    pub faults: Mutex<Faults>,
    writes: Mutex<Vec<u64>>,
}

impl TestLedger {
    pub fn new(costs: CostSchedule) -> Arc<Self> {
        Arc::new(Self {
            inner: OperatorLedger::memory(ACCOUNT, costs).expect("memory ledger"),
            faults: Mutex::new(Faults::default()),
            writes: Mutex::new(Vec::new()),
        })
    }

    pub fn free() -> Arc<Self> {
        Self::new(CostSchedule::free())
    }

    /// Indices passed to `write_chunk`, in call order
    pub fn writes(&self) -> Vec<u64> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }
}

#[async_trait]
impl Ledger for TestLedger {
    fn account(&self) -> &str {
        self.inner.account()
    }

    async fn write_chunk(&self, write: ChunkWrite<'_>, payment: u128) -> W3dResult<Receipt> {
        self.writes.lock().unwrap().push(write.index);
        let (fail, revert) = {
            let f = self.faults.lock().unwrap();
            (f.fail_write_at, f.revert_write_at)
        };
        if fail == Some(write.index) {
            return Err(W3dError::Ledger("injected: connection reset".into()));
        }
        if revert == Some(write.index) {
            return Ok(Receipt {
                tx_hash: format!("0xrevert{}", write.index),
                status: false,
                nonce: 0,
            });
        }
        self.inner.write_chunk(write, payment).await
    }

    async fn count_chunks(&self, file_id: &Uuid) -> W3dResult<u64> {
        self.inner.count_chunks(file_id).await
    }

    async fn get_chunk_hash(&self, file_id: &Uuid, index: u64) -> W3dResult<Option<ChunkHash>> {
        if self.faults.lock().unwrap().fail_hash_queries {
            return Err(W3dError::Ledger("injected: hash query timeout".into()));
        }
        self.inner.get_chunk_hash(file_id, index).await
    }

    async fn remove(&self, file_id: &Uuid) -> W3dResult<Receipt> {
        self.inner.remove(file_id).await
    }

    async fn remove_many(&self, file_ids: &[Uuid]) -> W3dResult<Receipt> {
        self.inner.remove_many(file_ids).await
    }

    async fn create_drive_record(&self, record: &DriveRecord) -> W3dResult<Receipt> {
        if self.faults.lock().unwrap().revert_create_drive {
            return Ok(Receipt {
                tx_hash: "0xrevertdrive".into(),
                status: false,
                nonce: 0,
            });
        }
        self.inner.create_drive_record(record).await
    }

    async fn get_drive_record(&self) -> W3dResult<Option<DriveRecord>> {
        self.inner.get_drive_record().await
    }

    async fn list_files(&self, account: &str) -> W3dResult<FileListing> {
        self.inner.list_files(account).await
    }

    async fn get_file_record(&self, file_id: &Uuid) -> W3dResult<Option<FileRecord>> {
        self.inner.get_file_record(file_id).await
    }

    async fn get_chunk(&self, file_id: &Uuid, index: u64) -> W3dResult<Vec<u8>> {
        self.inner.get_chunk(file_id, index).await
    }

    async fn balance(&self) -> W3dResult<u128> {
        if self.faults.lock().unwrap().fail_balance_queries {
            return Err(W3dError::Ledger("injected: balance query timeout".into()));
        }
        self.inner.balance().await
    }
}

pub fn drive_key() -> DriveKey {
    DriveKey::from_bytes([42u8; 32])
}

pub fn fast_kdf() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

/// Deterministic non-repeating test content
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
