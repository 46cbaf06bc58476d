//! Whole-buffer XChaCha20-Poly1305 encryption/decryption
//!
//! Sealed output:
//! ```text
//! iv         = 24 random bytes (stored separately, in the drive/file record)
//! ciphertext = [N bytes: encrypted data][16 bytes: Poly1305 tag]
//! ```
//!
//! The IV is never stored inline: the ledger records carry it in their own
//! field, and ciphertext chunks are plain slices of `ciphertext`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use w3d_core::{W3dError, W3dResult};

use crate::kdf::DriveKey;
use crate::keys::FileKey;
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Anything that can key the AEAD.
pub trait SymmetricKey {
    fn key_bytes(&self) -> &[u8; KEY_SIZE];
}

impl SymmetricKey for DriveKey {
    fn key_bytes(&self) -> &[u8; KEY_SIZE] {
        self.as_bytes()
    }
}

impl SymmetricKey for FileKey {
    fn key_bytes(&self) -> &[u8; KEY_SIZE] {
        self.as_bytes()
    }
}

/// Ciphertext plus the IV it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_SIZE],
}

/// Encrypt `plaintext` under a fresh random IV.
pub fn encrypt<K: SymmetricKey + ?Sized>(key: &K, plaintext: &[u8]) -> W3dResult<Sealed> {
    let mut iv = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    let ciphertext = encrypt_with_iv(key, &iv, plaintext)?;
    Ok(Sealed { ciphertext, iv })
}

/// Encrypt under a caller-chosen IV.
///
/// Reusing an IV with the same key breaks confidentiality. Production paths
/// go through [`encrypt`]; this exists for reproducible re-uploads in tests.
pub fn encrypt_with_iv<K: SymmetricKey + ?Sized>(
    key: &K,
    iv: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> W3dResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.key_bytes().into());
    cipher
        .encrypt(XNonce::from_slice(iv), plaintext)
        .map_err(|e| W3dError::Other(anyhow::anyhow!("encryption failed: {e}")))
}

/// Decrypt and verify. Any mismatch (key, IV, tag, length) is `DecryptionFailed`.
pub fn decrypt<K: SymmetricKey + ?Sized>(
    key: &K,
    iv: &[u8],
    ciphertext: &[u8],
) -> W3dResult<Vec<u8>> {
    if iv.len() != NONCE_SIZE || ciphertext.len() < TAG_SIZE {
        return Err(W3dError::DecryptionFailed);
    }

    let cipher = XChaCha20Poly1305::new(key.key_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(iv), ciphertext)
        .map_err(|_| W3dError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(b: u8) -> FileKey {
        FileKey::from_bytes([b; KEY_SIZE])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let k = key(7);
        let plaintext = b"hello, encrypted world!";

        let sealed = encrypt(&k, plaintext).unwrap();
        let decrypted = decrypt(&k, &sealed.iv, &sealed.ciphertext).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let k = key(7);
        let sealed = encrypt(&k, b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
        assert_eq!(decrypt(&k, &sealed.iv, &sealed.ciphertext).unwrap(), b"");
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let k = key(7);
        let a = encrypt(&k, b"same").unwrap();
        let b = encrypt(&k, b"same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_pinned_iv_is_reproducible() {
        let k = key(7);
        let iv = [3u8; NONCE_SIZE];
        let a = encrypt_with_iv(&k, &iv, b"same").unwrap();
        let b = encrypt_with_iv(&k, &iv, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let sealed = encrypt(&key(1), b"secret data").unwrap();
        let result = decrypt(&key(2), &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(W3dError::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_wrong_iv() {
        let k = key(1);
        let sealed = encrypt(&k, b"secret data").unwrap();
        let mut iv = sealed.iv;
        iv[0] ^= 1;
        let result = decrypt(&k, &iv, &sealed.ciphertext);
        assert!(matches!(result, Err(W3dError::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_short_iv() {
        let k = key(1);
        let sealed = encrypt(&k, b"secret data").unwrap();
        let result = decrypt(&k, &sealed.iv[..12], &sealed.ciphertext);
        assert!(matches!(result, Err(W3dError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let k = key(1);
        let mut sealed = encrypt(&k, b"secret data").unwrap();
        sealed.ciphertext[2] ^= 0xFF;
        let result = decrypt(&k, &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(W3dError::DecryptionFailed)));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let k = key(1);
        let sealed = encrypt(&k, b"secret data").unwrap();
        let result = decrypt(&k, &sealed.iv, &sealed.ciphertext[..TAG_SIZE - 1]);
        assert!(matches!(result, Err(W3dError::DecryptionFailed)));
    }

    #[test]
    fn test_ciphertext_size() {
        let sealed = encrypt(&key(1), &vec![0u8; 1000]).unwrap();
        // plaintext (1000) + tag (16)
        assert_eq!(sealed.ciphertext.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_drive_key_seals_too() {
        let dk = DriveKey::from_bytes([9u8; KEY_SIZE]);
        let sealed = encrypt(&dk, b"drive-id").unwrap();
        assert_eq!(decrypt(&dk, &sealed.iv, &sealed.ciphertext).unwrap(), b"drive-id");
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(
            k in proptest::array::uniform32(any::<u8>()),
            data in proptest::collection::vec(any::<u8>(), 0..=4096),
        ) {
            let k = FileKey::from_bytes(k);
            let sealed = encrypt(&k, &data).unwrap();
            prop_assert_eq!(decrypt(&k, &sealed.iv, &sealed.ciphertext).unwrap(), data);
        }
    }
}
