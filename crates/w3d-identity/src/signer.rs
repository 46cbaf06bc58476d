use async_trait::async_trait;

use w3d_core::W3dResult;

/// An account able to sign arbitrary messages.
///
/// Signatures must be deterministic for a given key and message: the drive key
/// is derived from the signature of the login message, so a signer that
/// randomizes its output can never unlock the same drive twice.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Ledger account address (`0x` + 40 hex chars)
    fn address(&self) -> String;

    async fn sign_message(&self, message: &[u8]) -> W3dResult<Vec<u8>>;
}

/// Message signed to open a drive.
pub fn login_message(drive_id: &str) -> String {
    format!("\n\nDriveId: {drive_id}\n\nMessage: Login to w3drive and sign.")
}
