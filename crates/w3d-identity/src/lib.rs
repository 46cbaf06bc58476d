//! w3d-identity: who signs, and what they sign
//!
//! - `signer`: the `WalletSigner` seam and the drive login message
//! - `keyfile`: an ed25519 wallet persisted as a JSON keyfile
//! - `discovery`: env → config → default lookup chain for the keyfile

pub mod discovery;
pub mod keyfile;
pub mod signer;

pub use discovery::{default_keyfile_path, find_wallet, DiscoveredWallet};
pub use keyfile::KeyfileWallet;
pub use signer::{login_message, WalletSigner};
