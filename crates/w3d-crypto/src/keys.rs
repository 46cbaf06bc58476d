//! Key hierarchy: drive key → per-file keys

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use w3d_core::{W3dError, W3dResult};

use crate::kdf::DriveKey;
use crate::KEY_SIZE;

const FILE_KEY_DOMAIN: &[u8] = b"w3drive-file-key-v1/";

/// A per-file 256-bit encryption key. Zeroized on drop.
#[derive(Clone)]
pub struct FileKey {
    bytes: [u8; KEY_SIZE],
}

impl FileKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the key for one file from the drive key via HKDF-SHA256.
///
/// The file identifier is the HKDF info context, so every identifier gets
/// its own key and the same identifier always gets the same key.
pub fn derive_file_key(drive_key: &DriveKey, file_id: &str) -> W3dResult<FileKey> {
    if drive_key.as_bytes().iter().all(|&b| b == 0) {
        return Err(W3dError::InvalidKeyMaterial(
            "drive key is all zeroes".into(),
        ));
    }
    if file_id.is_empty() {
        return Err(W3dError::EmptyInput("file identifier"));
    }

    let mut info = Vec::with_capacity(FILE_KEY_DOMAIN.len() + file_id.len());
    info.extend_from_slice(FILE_KEY_DOMAIN);
    info.extend_from_slice(file_id.as_bytes());

    let okm = hkdf_derive(drive_key.as_bytes(), &info)?;
    Ok(FileKey::from_bytes(okm))
}

/// HKDF-SHA256 key derivation with a domain-specific info string.
fn hkdf_derive(ikm: &[u8; KEY_SIZE], info: &[u8]) -> W3dResult<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, ikm);
    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| W3dError::InvalidKeyMaterial(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_drive_key() -> DriveKey {
        DriveKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_file_key_deterministic() {
        let dk = test_drive_key();
        let k1 = derive_file_key(&dk, "5d1c8a3e-0000-4000-8000-000000000001").unwrap();
        let k2 = derive_file_key(&dk, "5d1c8a3e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_file_keys_isolated_per_identifier() {
        let dk = test_drive_key();
        let a = derive_file_key(&dk, "file-a").unwrap();
        let b = derive_file_key(&dk, "file-b").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes(), "identifiers must not share keys");
    }

    #[test]
    fn test_file_keys_isolated_per_drive() {
        let a = derive_file_key(&DriveKey::from_bytes([1u8; KEY_SIZE]), "same").unwrap();
        let b = derive_file_key(&DriveKey::from_bytes([2u8; KEY_SIZE]), "same").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_file_key_differs_from_drive_key() {
        let dk = test_drive_key();
        let fk = derive_file_key(&dk, "x").unwrap();
        assert_ne!(fk.as_bytes(), dk.as_bytes());
    }

    #[test]
    fn test_zero_drive_key_rejected() {
        let result = derive_file_key(&DriveKey::from_bytes([0u8; KEY_SIZE]), "x");
        assert!(matches!(result, Err(W3dError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_empty_file_id_rejected() {
        let result = derive_file_key(&test_drive_key(), "");
        assert!(matches!(result, Err(W3dError::EmptyInput(_))));
    }

    proptest! {
        #[test]
        fn file_key_is_pure(
            key in proptest::array::uniform32(1u8..),
            id in "[a-f0-9-]{1,36}",
        ) {
            let dk = DriveKey::from_bytes(key);
            let k1 = derive_file_key(&dk, &id).unwrap();
            let k2 = derive_file_key(&dk, &id).unwrap();
            prop_assert_eq!(k1.as_bytes(), k2.as_bytes());
        }
    }
}
