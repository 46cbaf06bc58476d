//! The operations the engines invoke against the ledger.
//!
//! Mirrors the file contract's ABI:
//!
//! ```text
//! writeChunk(uuid, name, iv, type, chunkCount, chunkId, data) payable
//! countChunks(uuid) view          getChunkHash(uuid, chunkId) view
//! remove(uuid)                    removes(uuid[])
//! createDrive(uuid, iv, enc)      getDrive() view
//! getFileInfos() view             getFile(uuid, chunkId) view
//! ```
//!
//! A handle is bound to one account. Implementations must serialize
//! state-changing submissions for that account: the ledger orders
//! transactions by nonce, so two writes in flight at once can race.

use async_trait::async_trait;
use uuid::Uuid;

use w3d_chunks::ChunkHash;
use w3d_core::{ChunkWrite, DriveRecord, FileListing, FileRecord, Receipt, W3dResult};

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Account this handle submits as.
    fn account(&self) -> &str;

    /// Commit one chunk, attaching `payment` wei. Resolves once the receipt is available.
    async fn write_chunk(&self, write: ChunkWrite<'_>, payment: u128) -> W3dResult<Receipt>;

    /// Number of contiguous chunks stored for `file_id`, starting at index 0.
    async fn count_chunks(&self, file_id: &Uuid) -> W3dResult<u64>;

    /// Digest of the chunk currently stored at `index`, if any.
    async fn get_chunk_hash(&self, file_id: &Uuid, index: u64) -> W3dResult<Option<ChunkHash>>;

    async fn remove(&self, file_id: &Uuid) -> W3dResult<Receipt>;

    async fn remove_many(&self, file_ids: &[Uuid]) -> W3dResult<Receipt>;

    /// Create or overwrite this account's drive record.
    async fn create_drive_record(&self, record: &DriveRecord) -> W3dResult<Receipt>;

    async fn get_drive_record(&self) -> W3dResult<Option<DriveRecord>>;

    /// Columnar listing of every file stored by `account`.
    async fn list_files(&self, account: &str) -> W3dResult<FileListing>;

    async fn get_file_record(&self, file_id: &Uuid) -> W3dResult<Option<FileRecord>>;

    /// Ciphertext payload of one chunk.
    async fn get_chunk(&self, file_id: &Uuid, index: u64) -> W3dResult<Vec<u8>>;

    /// Spendable balance of this account in wei.
    async fn balance(&self) -> W3dResult<u128>;
}
