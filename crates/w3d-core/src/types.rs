use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{W3dError, W3dResult};

/// Per-account drive record as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveRecord {
    pub drive_id: String,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    /// The drive id encrypted under the drive key
    #[serde(with = "b64")]
    pub encrypted_marker: Vec<u8>,
}

/// Metadata for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: Uuid,
    pub name: String,
    pub mime_type: String,
    /// Unix timestamp (seconds) of the first committed chunk
    pub created_at: u64,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    pub chunk_count: u64,
}

/// Columnar file listing, as returned by the ledger's `listFiles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub times: Vec<u64>,
    pub file_ids: Vec<Uuid>,
    pub names: Vec<String>,
    pub mime_types: Vec<String>,
    pub ivs: Vec<Vec<u8>>,
    pub chunk_counts: Vec<u64>,
}

impl FileListing {
    pub fn len(&self) -> usize {
        self.file_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_ids.is_empty()
    }

    /// Append one row.
    pub fn push(&mut self, record: FileRecord) {
        self.times.push(record.created_at);
        self.file_ids.push(record.file_id);
        self.names.push(record.name);
        self.mime_types.push(record.mime_type);
        self.ivs.push(record.iv);
        self.chunk_counts.push(record.chunk_count);
    }

    /// Zip the columns into rows. Columns of unequal length are a corrupted listing.
    pub fn into_records(self) -> W3dResult<Vec<FileRecord>> {
        let n = self.file_ids.len();
        let lens = [
            self.times.len(),
            self.names.len(),
            self.mime_types.len(),
            self.ivs.len(),
            self.chunk_counts.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(W3dError::FileCorrupted(format!(
                "ragged file listing: {n} ids but column lengths {lens:?}"
            )));
        }

        let rows = self
            .file_ids
            .into_iter()
            .zip(self.times)
            .zip(self.names)
            .zip(self.mime_types)
            .zip(self.ivs)
            .zip(self.chunk_counts)
            .map(
                |(((((file_id, created_at), name), mime_type), iv), chunk_count)| FileRecord {
                    file_id,
                    name,
                    mime_type,
                    created_at,
                    iv,
                    chunk_count,
                },
            )
            .collect();
        Ok(rows)
    }
}

/// Arguments of a single `writeChunk` transaction.
#[derive(Debug, Clone, Copy)]
pub struct ChunkWrite<'a> {
    pub file_id: Uuid,
    pub name: &'a str,
    pub iv: &'a [u8],
    pub mime_type: &'a str,
    pub chunk_count: u64,
    pub index: u64,
    pub payload: &'a [u8],
}

/// Confirmation of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    /// `false` means the transaction was mined but reverted
    pub status: bool,
    pub nonce: u64,
}

impl Receipt {
    /// Turn a reverted receipt into `TransactionFailed`.
    pub fn confirmed(self, what: &str) -> W3dResult<Self> {
        if self.status {
            Ok(self)
        } else {
            Err(W3dError::TransactionFailed(format!(
                "{what}: transaction {} reverted",
                self.tx_hash
            )))
        }
    }
}

/// Serde helper: bytes as standard base64 strings.
pub mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, created_at: u64) -> FileRecord {
        FileRecord {
            file_id: Uuid::new_v4(),
            name: name.into(),
            mime_type: "text/plain".into(),
            created_at,
            iv: vec![7u8; 24],
            chunk_count: 1,
        }
    }

    #[test]
    fn test_listing_zip_preserves_rows() {
        let a = record("a.txt", 10);
        let b = record("b.txt", 5);
        let mut listing = FileListing::default();
        listing.push(a.clone());
        listing.push(b.clone());

        let rows = listing.into_records().unwrap();
        assert_eq!(rows, vec![a, b]);
    }

    #[test]
    fn test_ragged_listing_is_corrupted() {
        let mut listing = FileListing::default();
        listing.push(record("a.txt", 1));
        listing.names.push("orphan".into());

        let err = listing.into_records().unwrap_err();
        assert!(matches!(err, W3dError::FileCorrupted(_)));
    }

    #[test]
    fn test_reverted_receipt_is_transaction_failed() {
        let receipt = Receipt {
            tx_hash: "0xdead".into(),
            status: false,
            nonce: 3,
        };
        let err = receipt.confirmed("writeChunk").unwrap_err();
        assert!(matches!(err, W3dError::TransactionFailed(_)));
    }

    #[test]
    fn test_drive_record_json_uses_base64() {
        let rec = DriveRecord {
            drive_id: "d1".into(),
            iv: vec![1, 2, 3],
            encrypted_marker: vec![0xff],
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"AQID\""));
        let back: DriveRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
