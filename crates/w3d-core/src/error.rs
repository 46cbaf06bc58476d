use thiserror::Error;

pub type W3dResult<T> = Result<T, W3dError>;

#[derive(Debug, Error)]
pub enum W3dError {
    /// Unlock failed: the derived key did not open the drive record.
    /// Does not say whether the signature or the password was wrong.
    #[error("wrong credentials: drive could not be unlocked")]
    WrongCredentials,

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error(
        "not enough balance for chunk {index}: required {required} wei, available {available} wei"
    )]
    NotEnoughBalance {
        index: u64,
        required: u128,
        available: u128,
    },

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// A chunk submission failed; `committed` chunks of this run stay on the ledger.
    #[error("upload failed at chunk {index} ({committed} chunks committed): {source}")]
    UploadFailed {
        index: u64,
        committed: u64,
        #[source]
        source: Box<W3dError>,
    },

    #[error("file corrupted: {0}")]
    FileCorrupted(String),

    #[error("decryption failed: wrong key, wrong IV, or corrupted ciphertext")]
    DecryptionFailed,

    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("no drive exists for this account")]
    NoDrive,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl W3dError {
    /// Whether restarting the whole operation with the same inputs can succeed.
    ///
    /// Transport and confirmation failures are retryable. Credential, balance,
    /// key-material and corruption failures need the caller to change something
    /// first.
    pub fn is_retryable(&self) -> bool {
        match self {
            W3dError::UploadFailed { source, .. } => source.is_retryable(),
            W3dError::TransactionFailed(_) | W3dError::Ledger(_) | W3dError::Io(_) => true,
            _ => false,
        }
    }

    /// Wrap a per-chunk failure as a terminal upload failure.
    pub fn upload_failed(index: u64, committed: u64, source: W3dError) -> Self {
        W3dError::UploadFailed {
            index,
            committed,
            source: Box::new(source),
        }
    }
}
