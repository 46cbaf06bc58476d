//! w3d-crypto: client-side encryption for w3drive
//!
//! Architecture: Encrypt-then-Chunk with XChaCha20-Poly1305
//!
//! Pipeline: plaintext → encrypt whole file (file key, random IV) → split ciphertext → commit chunks
//!
//! Key hierarchy:
//! ```text
//! Wallet signature over the login message (deterministic per drive + account)
//!   └── Drive Key (256-bit, Argon2id(password, salt = SHA-256(domain || signature)))
//!       ├── Drive marker: XChaCha20-Poly1305(drive_key, drive_id) stored in the drive record
//!       └── File Key (per file, HKDF-SHA256(drive_key, info = domain || file_id))
//!           └── File AEAD: XChaCha20-Poly1305 (key=file_key, nonce=random_192bit)
//! ```

pub mod cipher;
pub mod kdf;
pub mod keys;

pub use cipher::{decrypt, encrypt, encrypt_with_iv, Sealed, SymmetricKey};
pub use kdf::{derive_drive_key, DriveKey, KdfParams};
pub use keys::{derive_file_key, FileKey};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
