//! ed25519 keyfile wallet
//!
//! Keyfile format (JSON):
//!
//! ```json
//! { "version": 1, "address": "0x…", "seed": "<64 hex chars>" }
//! ```
//!
//! The address is `0x` + the last 20 bytes of Keccak-256 over the verifying key.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use w3d_core::{W3dError, W3dResult};

use crate::signer::WalletSigner;

const KEYFILE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct Keyfile {
    version: u32,
    address: String,
    seed: String,
}

pub struct KeyfileWallet {
    key: SigningKey,
    address: String,
}

impl std::fmt::Debug for KeyfileWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyfileWallet")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl KeyfileWallet {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Parse a 32-byte seed from hex (optional `0x` prefix).
    pub fn from_seed_hex(seed_hex: &str) -> W3dResult<Self> {
        let digits = seed_hex.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let bytes = Zeroizing::new(
            hex::decode(digits)
                .map_err(|e| W3dError::InvalidKeyMaterial(format!("wallet seed is not hex: {e}")))?,
        );
        let mut seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            W3dError::InvalidKeyMaterial(format!(
                "wallet seed must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        let wallet = Self::from_seed(&seed);
        seed.zeroize();
        Ok(wallet)
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = address_of(&key.verifying_key());
        Self { key, address }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Check a signature produced by this wallet.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        self.key.verifying_key().verify(message, &sig).is_ok()
    }

    pub fn load(path: &Path) -> W3dResult<Self> {
        let content = Zeroizing::new(std::fs::read_to_string(path)?);
        let file: Keyfile = serde_json::from_str(&content).map_err(|e| {
            W3dError::WalletUnavailable(format!("parsing keyfile {}: {e}", path.display()))
        })?;
        if file.version != KEYFILE_VERSION {
            return Err(W3dError::WalletUnavailable(format!(
                "unsupported keyfile version {} in {}",
                file.version,
                path.display()
            )));
        }
        let wallet = Self::from_seed_hex(&file.seed)?;
        if !wallet.address.eq_ignore_ascii_case(&file.address) {
            return Err(W3dError::InvalidKeyMaterial(format!(
                "keyfile {} address {} does not match its seed",
                path.display(),
                file.address
            )));
        }
        Ok(wallet)
    }

    /// Write the keyfile, creating parent directories. Owner-only on unix.
    pub fn save(&self, path: &Path) -> W3dResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Keyfile {
            version: KEYFILE_VERSION,
            address: self.address.clone(),
            seed: hex::encode(self.key.to_bytes()),
        };
        let json = Zeroizing::new(
            serde_json::to_string_pretty(&file)
                .map_err(|e| W3dError::Config(format!("encoding keyfile: {e}")))?,
        );
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut out = options.open(path)?;
        // mode only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            out.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        out.write_all(json.as_bytes())?;
        out.sync_all()?;
        Ok(())
    }
}

#[async_trait]
impl WalletSigner for KeyfileWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_message(&self, message: &[u8]) -> W3dResult<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// `0x` + last 20 bytes of Keccak-256 over the verifying key.
pub fn address_of(key: &VerifyingKey) -> String {
    let digest = Keccak256::digest(key.as_bytes());
    format!("0x{}", hex::encode(&digest[12..]))
}
