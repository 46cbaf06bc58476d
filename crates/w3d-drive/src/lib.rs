//! w3d-drive: the engines behind `w3d`
//!
//! All engines take an injected `Arc<L: Ledger>`; none of them hold wallet or
//! provider state of their own.
//!
//! - `drive`: create and unlock the per-account drive record
//! - `upload`: encrypt, chunk, and commit a file chunk by chunk
//! - `download`: fetch, reassemble, and decrypt a stored file
//! - `index`: list and delete stored files
//! - `progress`: events streamed to the caller during transfers

pub mod download;
pub mod drive;
pub mod index;
pub mod progress;
pub mod upload;

pub use download::{DownloadEngine, DownloadResult, DownloadedFile};
pub use drive::{DriveManager, DriveState};
pub use index::FileIndex;
pub use progress::{ProgressEvent, ProgressSender};
pub use upload::{UploadEngine, UploadOptions, UploadOutcome, UploadRequest};
