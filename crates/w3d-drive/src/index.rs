//! Per-account file catalog

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use w3d_core::{FileRecord, Receipt, W3dResult};
use w3d_ledger::Ledger;

pub struct FileIndex<L: ?Sized> {
    ledger: Arc<L>,
}

impl<L: Ledger + ?Sized> FileIndex<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Files stored by `account`, oldest first. Ties keep ledger order.
    pub async fn list(&self, account: &str) -> W3dResult<Vec<FileRecord>> {
        let mut records = self.ledger.list_files(account).await?.into_records()?;
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Files stored by the ledger handle's own account.
    pub async fn list_own(&self) -> W3dResult<Vec<FileRecord>> {
        self.list(self.ledger.account()).await
    }

    pub async fn delete(&self, file_id: &Uuid) -> W3dResult<Receipt> {
        let receipt = self.ledger.remove(file_id).await?.confirmed("remove")?;
        info!(%file_id, tx = %receipt.tx_hash, "deleted");
        Ok(receipt)
    }

    /// Delete in one transaction. An empty batch submits nothing.
    pub async fn delete_many(&self, file_ids: &[Uuid]) -> W3dResult<Option<Receipt>> {
        if file_ids.is_empty() {
            return Ok(None);
        }
        let receipt = self
            .ledger
            .remove_many(file_ids)
            .await?
            .confirmed("removes")?;
        info!(count = file_ids.len(), tx = %receipt.tx_hash, "deleted");
        Ok(Some(receipt))
    }
}
