use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Channel the engines report transfer progress on.
pub type ProgressSender = UnboundedSender<ProgressEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        file_id: Uuid,
        chunk_count: u64,
        bytes: u64,
    },
    /// Chunk written and its receipt confirmed
    ChunkCommitted {
        index: u64,
        completed: u64,
        total: u64,
        tx_hash: String,
    },
    /// Ledger already held an identical chunk
    ChunkSkipped {
        index: u64,
        completed: u64,
        total: u64,
    },
    ChunkFetched {
        index: u64,
        completed: u64,
        total: u64,
    },
}

impl ProgressEvent {
    /// Completed share of the transfer, 0..=100. `None` for `Started`.
    pub fn percent(&self) -> Option<u8> {
        let (completed, total) = match self {
            Self::Started { .. } => return None,
            Self::ChunkCommitted {
                completed, total, ..
            }
            | Self::ChunkSkipped {
                completed, total, ..
            }
            | Self::ChunkFetched {
                completed, total, ..
            } => (*completed, *total),
        };
        if total == 0 {
            return Some(100);
        }
        Some((completed.min(total) * 100 / total) as u8)
    }
}

/// Send if someone is listening. A dropped receiver is not an error.
pub(crate) fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down() {
        let ev = ProgressEvent::ChunkSkipped {
            index: 0,
            completed: 1,
            total: 3,
        };
        assert_eq!(ev.percent(), Some(33));

        let done = ProgressEvent::ChunkCommitted {
            index: 2,
            completed: 3,
            total: 3,
            tx_hash: "0x00".into(),
        };
        assert_eq!(done.percent(), Some(100));
    }

    #[test]
    fn started_has_no_percent() {
        let ev = ProgressEvent::Started {
            file_id: Uuid::nil(),
            chunk_count: 1,
            bytes: 10,
        };
        assert_eq!(ev.percent(), None);
    }

    #[test]
    fn emit_without_receiver_is_silent() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        emit(
            Some(&tx),
            ProgressEvent::ChunkFetched {
                index: 0,
                completed: 1,
                total: 1,
            },
        );
        emit(None, ProgressEvent::ChunkFetched { index: 0, completed: 1, total: 1 });
    }
}
