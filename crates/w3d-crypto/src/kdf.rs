//! Key derivation: wallet signature + password → drive key (Argon2id)

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use w3d_core::config::CryptoConfig;
use w3d_core::{W3dError, W3dResult};

use crate::KEY_SIZE;

const DRIVE_SALT_DOMAIN: &[u8] = b"w3drive-drive-key-v1";

/// A 256-bit drive master key.
///
/// Lives only for the session; zeroized on drop.
#[derive(Clone)]
pub struct DriveKey {
    bytes: [u8; KEY_SIZE],
}

impl DriveKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a key from untrusted bytes, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> W3dResult<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            W3dError::InvalidKeyMaterial(format!(
                "drive key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DriveKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DriveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(cfg: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: cfg.argon2_mem_cost_kib,
            time_cost: cfg.argon2_time_cost,
            parallelism: cfg.argon2_parallelism,
        }
    }
}

/// Derive the drive key from a wallet signature and the user's password.
///
/// The salt is SHA-256 over a fixed domain tag and the signature, so the same
/// account signing the same drive's login message always lands on the same
/// key. Argon2id pre-hashes the password, which keeps the cost independent of
/// its length.
pub fn derive_drive_key(
    signature: &[u8],
    password: &SecretString,
    params: &KdfParams,
) -> W3dResult<DriveKey> {
    if signature.is_empty() {
        return Err(W3dError::EmptyInput("signature"));
    }

    let mut hasher = Sha256::new();
    hasher.update(DRIVE_SALT_DOMAIN);
    hasher.update(signature);
    let salt = hasher.finalize();

    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| W3dError::Config(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), &salt, &mut key)
        .map_err(|e| W3dError::InvalidKeyMaterial(format!("Argon2id KDF failed: {e}")))?;

    Ok(DriveKey::from_bytes(key))
}
