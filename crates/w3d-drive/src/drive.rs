//! Drive lifecycle
//!
//! A drive is one record per account: `{drive_id, iv, encrypted_marker}`,
//! where the marker is the drive id sealed under the drive key. Unlocking
//! re-derives the key and checks that the marker opens back to the same id.
//!
//! ```text
//! NoDrive ──create──▶ Unlocked
//! Locked  ──unlock──▶ Unlocked      (wrong password: stays Locked)
//! Locked  ──create──▶ Unlocked      (overwrites the old record)
//! ```

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use w3d_core::{DriveRecord, W3dError, W3dResult};
use w3d_crypto::{decrypt, derive_drive_key, encrypt, DriveKey, KdfParams};
use w3d_identity::{login_message, WalletSigner};
use w3d_ledger::Ledger;

#[derive(Debug)]
pub enum DriveState {
    NoDrive,
    Locked(DriveRecord),
    Unlocked {
        record: DriveRecord,
        key: Arc<DriveKey>,
    },
}

pub struct DriveManager<L: ?Sized> {
    ledger: Arc<L>,
    params: KdfParams,
    state: DriveState,
}

impl<L: Ledger + ?Sized> DriveManager<L> {
    pub fn new(ledger: Arc<L>, params: KdfParams) -> Self {
        Self {
            ledger,
            params,
            state: DriveState::NoDrive,
        }
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    /// Drive key of an unlocked drive.
    pub fn key(&self) -> Option<Arc<DriveKey>> {
        match &self.state {
            DriveState::Unlocked { key, .. } => Some(Arc::clone(key)),
            _ => None,
        }
    }

    /// Read the account's drive record from the ledger.
    pub async fn load(&mut self) -> W3dResult<&DriveState> {
        self.state = match self.ledger.get_drive_record().await? {
            Some(record) => DriveState::Locked(record),
            None => DriveState::NoDrive,
        };
        Ok(&self.state)
    }

    /// Derive a key, seal `drive_id` under it, and store the new record.
    ///
    /// On a rejected transaction the state is left as it was.
    pub async fn create(
        &mut self,
        drive_id: &str,
        signature: &[u8],
        password: &SecretString,
    ) -> W3dResult<Arc<DriveKey>> {
        let key = derive_drive_key(signature, password, &self.params)?;
        self.commit(drive_id, key).await
    }

    /// Try the candidate key against the stored marker.
    ///
    /// Any failure (wrong password, wrong signature, damaged record) is
    /// `WrongCredentials` and leaves the drive Locked.
    pub fn unlock(
        &mut self,
        signature: &[u8],
        password: &SecretString,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> W3dResult<Arc<DriveKey>> {
        let candidate = derive_drive_key(signature, password, &self.params)?;
        self.try_key(candidate, iv, ciphertext)
    }

    /// Create a drive with a fresh id, signing its login message with `signer`.
    pub async fn create_with_wallet<S: WalletSigner + ?Sized>(
        &mut self,
        signer: &S,
        password: &SecretString,
    ) -> W3dResult<Arc<DriveKey>> {
        let drive_id = Uuid::new_v4().to_string();
        let signature = signer
            .sign_message(login_message(&drive_id).as_bytes())
            .await?;
        let key = derive_blocking(signature, password, &self.params).await?;
        self.commit(&drive_id, key).await
    }

    /// Load the record if needed, sign its login message, and unlock.
    pub async fn unlock_with_wallet<S: WalletSigner + ?Sized>(
        &mut self,
        signer: &S,
        password: &SecretString,
    ) -> W3dResult<Arc<DriveKey>> {
        if !matches!(self.state, DriveState::Locked(_)) {
            self.load().await?;
        }
        let record = match &self.state {
            DriveState::Locked(record) | DriveState::Unlocked { record, .. } => record.clone(),
            DriveState::NoDrive => return Err(W3dError::NoDrive),
        };

        let signature = signer
            .sign_message(login_message(&record.drive_id).as_bytes())
            .await?;
        let candidate = derive_blocking(signature, password, &self.params).await?;
        self.try_key(candidate, &record.iv, &record.encrypted_marker)
    }

    async fn commit(&mut self, drive_id: &str, key: DriveKey) -> W3dResult<Arc<DriveKey>> {
        let sealed = encrypt(&key, drive_id.as_bytes())?;
        let record = DriveRecord {
            drive_id: drive_id.to_string(),
            iv: sealed.iv.to_vec(),
            encrypted_marker: sealed.ciphertext,
        };

        let receipt = self
            .ledger
            .create_drive_record(&record)
            .await?
            .confirmed("createDrive")?;
        info!(drive_id, tx = %receipt.tx_hash, "drive created");

        let key = Arc::new(key);
        self.state = DriveState::Unlocked {
            record,
            key: Arc::clone(&key),
        };
        Ok(key)
    }

    fn try_key(
        &mut self,
        candidate: DriveKey,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> W3dResult<Arc<DriveKey>> {
        let record = match &self.state {
            DriveState::Locked(record) => record,
            DriveState::NoDrive => return Err(W3dError::NoDrive),
            DriveState::Unlocked { record, .. } => record,
        };

        let opened = match decrypt(&candidate, iv, ciphertext) {
            Ok(plaintext) => plaintext,
            Err(W3dError::DecryptionFailed) => {
                warn!(drive_id = %record.drive_id, "drive unlock failed");
                return Err(W3dError::WrongCredentials);
            }
            Err(e) => return Err(e),
        };
        if opened != record.drive_id.as_bytes() {
            warn!(drive_id = %record.drive_id, "drive marker mismatch");
            return Err(W3dError::WrongCredentials);
        }

        let record = record.clone();
        let key = Arc::new(candidate);
        info!(drive_id = %record.drive_id, "drive unlocked");
        self.state = DriveState::Unlocked {
            record,
            key: Arc::clone(&key),
        };
        Ok(key)
    }
}

/// Argon2id off the async runtime.
async fn derive_blocking(
    signature: Vec<u8>,
    password: &SecretString,
    params: &KdfParams,
) -> W3dResult<DriveKey> {
    let password = SecretString::from(password.expose_secret().to_owned());
    let params = params.clone();
    tokio::task::spawn_blocking(move || derive_drive_key(&signature, &password, &params))
        .await
        .map_err(|e| W3dError::Other(anyhow::Error::new(e)))?
}
