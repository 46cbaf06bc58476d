//! Wallet discovery chain

use std::path::{Path, PathBuf};

use tracing::debug;

use w3d_core::config::{config_dir, expand_tilde, WalletConfig};
use w3d_core::{W3dError, W3dResult};

use crate::keyfile::KeyfileWallet;

/// A loaded wallet and where it came from
#[derive(Debug)]
pub struct DiscoveredWallet {
    pub wallet: KeyfileWallet,
    pub source: String,
}

/// Discover the wallet using the priority chain:
///   1. $W3D_WALLET_KEY       (hex seed in the environment)
///   2. $W3D_WALLET_KEY_FILE  (explicit keyfile path)
///   3. config wallet.key_file
///   4. ~/.config/w3drive/wallet.json
pub fn find_wallet(config: &WalletConfig) -> W3dResult<DiscoveredWallet> {
    find_wallet_from(
        std::env::var("W3D_WALLET_KEY").ok(),
        std::env::var("W3D_WALLET_KEY_FILE").ok().map(PathBuf::from),
        config,
        &default_keyfile_path(),
    )
}

pub fn default_keyfile_path() -> PathBuf {
    config_dir().join("wallet.json")
}

fn find_wallet_from(
    env_key: Option<String>,
    env_file: Option<PathBuf>,
    config: &WalletConfig,
    default_path: &Path,
) -> W3dResult<DiscoveredWallet> {
    if let Some(seed) = env_key.filter(|s| !s.trim().is_empty()) {
        let wallet = KeyfileWallet::from_seed_hex(&seed)?;
        return Ok(found(wallet, "W3D_WALLET_KEY (env)".into()));
    }

    if let Some(path) = env_file {
        if path.exists() {
            let wallet = KeyfileWallet::load(&path)?;
            return Ok(found(wallet, format!("W3D_WALLET_KEY_FILE:{}", path.display())));
        }
    }

    if let Some(path) = &config.key_file {
        let expanded = expand_tilde(path);
        if expanded.exists() {
            let wallet = KeyfileWallet::load(&expanded)?;
            return Ok(found(wallet, format!("config:{}", expanded.display())));
        }
    }

    if default_path.exists() {
        let wallet = KeyfileWallet::load(default_path)?;
        return Ok(found(wallet, format!("default:{}", default_path.display())));
    }

    Err(W3dError::WalletUnavailable(format!(
        "no wallet found. Tried: $W3D_WALLET_KEY, $W3D_WALLET_KEY_FILE, config path, and {}. \
         Run: w3d wallet init",
        default_path.display()
    )))
}

fn found(wallet: KeyfileWallet, source: String) -> DiscoveredWallet {
    debug!(%source, "wallet loaded");
    DiscoveredWallet { wallet, source }
}
