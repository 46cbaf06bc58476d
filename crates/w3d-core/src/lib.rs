pub mod config;
pub mod error;
pub mod types;

pub use error::{W3dError, W3dResult};
pub use types::{ChunkWrite, DriveRecord, FileListing, FileRecord, Receipt};
