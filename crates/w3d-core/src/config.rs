use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level client configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct W3dConfig {
    pub log: LogConfig,
    pub ledger: LedgerConfig,
    pub upload: UploadConfig,
    pub cost: CostConfig,
    pub download: DownloadConfig,
    pub crypto: CryptoConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Ledger backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Memory,
    Fs,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// S3 endpoint (s3 backend only)
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Account to act as (defaults to the wallet address)
    pub account: Option<String>,
    /// Reject plaintext HTTP endpoints
    pub enforce_tls: bool,
    /// Base URL used to build share locations for uploaded files
    pub gateway_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest ciphertext slice committed in one transaction (default: 475 KiB)
    pub max_chunk_bytes: usize,
    /// Abort before a chunk whose estimated cost exceeds the balance
    pub check_balance: bool,
    /// Skip chunks whose ledger hash already matches
    pub dedup: bool,
}

/// Per-chunk payment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Chunks up to this many bytes are free
    pub free_bytes: usize,
    /// Fixed per-write storage overhead in bytes
    pub overhead_bytes: usize,
    /// Bytes covered by one price unit
    pub bytes_per_unit: usize,
    /// Price of one unit in wei
    pub unit_price_wei: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Chunk reads in flight per download
    pub concurrency: usize,
}

/// Argon2id parameters for the drive key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Wallet key file (default: ~/.config/w3drive/wallet.json)
    pub key_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Fs,
            root: PathBuf::from("~/.local/share/w3drive/ledger"),
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "w3drive".into(),
            account: None,
            enforce_tls: false,
            gateway_url: "https://galileo.web3q.io/file.w3q".into(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 475 * 1024,
            check_balance: true,
            dedup: true,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            free_bytes: 24 * 1024 - 326,
            overhead_bytes: 326,
            bytes_per_unit: 24 * 1024,
            unit_price_wei: 1_000_000_000_000_000_000,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

/// Default config directory: `$XDG_CONFIG_HOME/w3drive` or `~/.config/w3drive`
pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| expand_tilde(Path::new("~/.config")))
        .join("w3drive")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/.config/w3drive/wallet.json"));
        assert!(!expanded.to_string_lossy().starts_with("~/"));
        assert!(expanded.ends_with(".config/w3drive/wallet.json"));

        let absolute = expand_tilde(Path::new("/etc/w3drive"));
        assert_eq!(absolute, PathBuf::from("/etc/w3drive"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[log]
level = "debug"
format = "json"

[ledger]
backend = "s3"
endpoint = "https://s3.example.com"
bucket = "drives"
account = "0xabc"
enforce_tls = true

[upload]
max_chunk_bytes = 1024
check_balance = false
dedup = false

[cost]
unit_price_wei = 5

[download]
concurrency = 8

[crypto]
argon2_mem_cost_kib = 131072
argon2_time_cost = 4
argon2_parallelism = 8

[wallet]
key_file = "/etc/w3drive/wallet.json"
"#;
        let config: W3dConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.ledger.backend, LedgerBackend::S3);
        assert_eq!(config.ledger.account.as_deref(), Some("0xabc"));
        assert!(config.ledger.enforce_tls);
        assert_eq!(config.upload.max_chunk_bytes, 1024);
        assert!(!config.upload.dedup);
        assert_eq!(config.cost.unit_price_wei, 5);
        assert_eq!(config.cost.bytes_per_unit, 24 * 1024);
        assert_eq!(config.download.concurrency, 8);
        assert_eq!(config.crypto.argon2_mem_cost_kib, 131072);
        assert_eq!(
            config.wallet.key_file,
            Some(PathBuf::from("/etc/w3drive/wallet.json"))
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config: W3dConfig = toml::from_str("").unwrap();

        assert_eq!(config.log.level, "info");
        assert_eq!(config.ledger.backend, LedgerBackend::Fs);
        assert_eq!(config.upload.max_chunk_bytes, 486400);
        assert!(config.upload.check_balance);
        assert!(config.upload.dedup);
        assert_eq!(config.cost.free_bytes, 24250);
        assert_eq!(config.download.concurrency, 4);
        assert_eq!(config.crypto.argon2_time_cost, 3);
        assert!(config.wallet.key_file.is_none());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = W3dConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: W3dConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.ledger.root, parsed.ledger.root);
        assert_eq!(config.upload.max_chunk_bytes, parsed.upload.max_chunk_bytes);
        assert_eq!(config.cost.unit_price_wei, parsed.cost.unit_price_wei);
    }
}
