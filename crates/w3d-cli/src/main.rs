//! w3d: w3drive command-line client
//!
//! Commands:
//!   wallet init | address        - create or show the signing wallet
//!   ledger balance | fund <eth>  - inspect or fund the local ledger account
//!   drive create | status        - create or inspect this account's drive
//!   push <file>                  - encrypt, chunk, and commit a file
//!   pull <id> [<dest>]           - fetch and decrypt a file
//!   ls                           - list stored files
//!   rm <id>...                   - delete stored files
//!   config show                  - display current configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use w3d_core::config::{config_dir, expand_tilde, W3dConfig};
use w3d_core::W3dError;
use w3d_crypto::{DriveKey, KdfParams};
use w3d_drive::{
    DownloadEngine, DriveManager, DriveState, FileIndex, ProgressEvent, ProgressSender,
    UploadEngine, UploadOptions, UploadRequest,
};
use w3d_identity::{default_keyfile_path, find_wallet, KeyfileWallet, WalletSigner};
use w3d_ledger::{build_operator, check_health, CostSchedule, Ledger, OperatorLedger};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "w3d",
    version,
    about = "w3drive client",
    long_about = "w3d: store files encrypted and chunked on a pay-per-write ledger"
)]
struct Cli {
    /// Path to config.toml (default: ~/.config/w3drive/config.toml)
    #[arg(long, short = 'c', env = "W3D_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "W3D_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides config
    #[arg(long, env = "W3D_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Signing wallet management
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Ledger account
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Drive management
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Encrypt and upload a local file
    ///
    /// The drive password is read from W3D_PASSWORD or prompted for.
    Push {
        /// Local file
        file: PathBuf,
        /// Overwrite an existing file id instead of creating a new file
        #[arg(long)]
        id: Option<Uuid>,
        /// MIME type (default: inferred from the extension)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Download and decrypt a stored file
    Pull {
        /// File id (see `w3d ls`)
        id: Uuid,
        /// Local destination (default: stored name in the current directory)
        dest: Option<PathBuf>,
    },

    /// List stored files, oldest first
    Ls {
        /// List another account's files
        #[arg(long)]
        account: Option<String>,
    },

    /// Delete stored files
    Rm {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum WalletAction {
    /// Generate a new wallet keyfile
    Init {
        /// Keyfile path (default: wallet.key_file or ~/.config/w3drive/wallet.json)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing keyfile
        #[arg(long)]
        force: bool,
    },
    /// Print the wallet address and where it was loaded from
    Address,
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// Show the account balance
    Balance,
    /// Credit whole ether to the local ledger account
    Fund { ether: u64 },
}

#[derive(Subcommand, Debug)]
enum DriveAction {
    /// Create a drive (replaces an existing one with --force)
    Create {
        #[arg(long)]
        force: bool,
    },
    /// Show whether a drive exists and whether the password opens it
    Status {
        /// Also try to unlock
        #[arg(long)]
        unlock: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_dir().join("config.toml"));
    let config = load_config(&config_path).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    debug!(config = %config_path.display(), "w3d starting");

    match cli.command {
        Commands::Wallet {
            action: WalletAction::Init { path, force },
        } => cmd_wallet_init(&config, path.as_deref(), force),
        Commands::Wallet {
            action: WalletAction::Address,
        } => cmd_wallet_address(&config),
        Commands::Ledger {
            action: LedgerAction::Balance,
        } => cmd_ledger_balance(&config).await,
        Commands::Ledger {
            action: LedgerAction::Fund { ether },
        } => cmd_ledger_fund(&config, ether).await,
        Commands::Drive {
            action: DriveAction::Create { force },
        } => cmd_drive_create(&config, force).await,
        Commands::Drive {
            action: DriveAction::Status { unlock },
        } => cmd_drive_status(&config, unlock).await,
        Commands::Push { file, id, mime } => cmd_push(&config, &file, id, mime.as_deref()).await,
        Commands::Pull { id, dest } => cmd_pull(&config, id, dest.as_deref()).await,
        Commands::Ls { account } => cmd_ls(&config, account.as_deref()).await,
        Commands::Rm { ids } => cmd_rm(&config, &ids).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<W3dConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(W3dConfig::default())
    }
}

// ── Session plumbing ──────────────────────────────────────────────────────────

struct Session {
    wallet: KeyfileWallet,
    ledger: Arc<OperatorLedger>,
}

/// Load the wallet and open the ledger as its account (or `ledger.account`).
async fn open_session(config: &W3dConfig) -> Result<Session> {
    let found = find_wallet(&config.wallet).context("loading wallet")?;
    debug!(source = %found.source, "wallet");

    let account = config
        .ledger
        .account
        .clone()
        .unwrap_or_else(|| found.wallet.address());

    let op = build_operator(&config.ledger).context("building ledger operator")?;
    check_health(&op).await.context("ledger backend unreachable")?;

    let ledger = OperatorLedger::new(op, account, CostSchedule::from(&config.cost));
    Ok(Session {
        wallet: found.wallet,
        ledger: Arc::new(ledger),
    })
}

fn read_password(prompt: &str) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("W3D_PASSWORD") {
        return Ok(SecretString::from(pw));
    }
    let pw = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(pw))
}

async fn unlock_drive(config: &W3dConfig, session: &Session) -> Result<Arc<DriveKey>> {
    let password = read_password("Drive password: ")?;
    let mut drive = DriveManager::new(
        Arc::clone(&session.ledger),
        KdfParams::from(&config.crypto),
    );
    match drive.unlock_with_wallet(&session.wallet, &password).await {
        Ok(key) => Ok(key),
        Err(W3dError::NoDrive) => anyhow::bail!("no drive for this account; run: w3d drive create"),
        Err(e) => Err(e).context("unlocking drive"),
    }
}

// ── Progress display ──────────────────────────────────────────────────────────

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Drive a progress bar from engine events until the sender is dropped.
fn track_progress(pb: ProgressBar) -> (ProgressSender, JoinHandle<()>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Started { chunk_count, .. } => pb.set_length(chunk_count),
                ProgressEvent::ChunkCommitted {
                    index, completed, ..
                } => {
                    pb.set_position(completed);
                    pb.set_message(format!("chunk {index} committed"));
                }
                ProgressEvent::ChunkSkipped {
                    index, completed, ..
                } => {
                    pb.set_position(completed);
                    pb.set_message(format!("chunk {index} unchanged"));
                }
                ProgressEvent::ChunkFetched { completed, .. } => pb.set_position(completed),
            }
        }
        pb.finish_and_clear();
    });
    (tx, handle)
}

// ── `w3d wallet` ──────────────────────────────────────────────────────────────

fn cmd_wallet_init(config: &W3dConfig, path: Option<&Path>, force: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| config.wallet.key_file.as_deref().map(expand_tilde))
        .unwrap_or_else(default_keyfile_path);

    if path.exists() && !force {
        anyhow::bail!(
            "keyfile already exists: {} (use --force to replace it)",
            path.display()
        );
    }

    let wallet = KeyfileWallet::generate();
    wallet
        .save(&path)
        .with_context(|| format!("writing keyfile: {}", path.display()))?;
    info!(path = %path.display(), address = %wallet.address(), "wallet created");

    println!("address: {}", wallet.address());
    println!("keyfile: {}", path.display());
    Ok(())
}

fn cmd_wallet_address(config: &W3dConfig) -> Result<()> {
    let found = find_wallet(&config.wallet).context("loading wallet")?;
    println!("address: {}", found.wallet.address());
    println!("source:  {}", found.source);
    Ok(())
}

// ── `w3d ledger` ──────────────────────────────────────────────────────────────

async fn cmd_ledger_balance(config: &W3dConfig) -> Result<()> {
    let session = open_session(config).await?;
    let balance = session.ledger.balance().await.context("querying balance")?;
    println!("account: {}", session.ledger.account());
    println!("balance: {} ({balance} wei)", fmt_eth(balance));
    Ok(())
}

async fn cmd_ledger_fund(config: &W3dConfig, ether: u64) -> Result<()> {
    let session = open_session(config).await?;
    let amount = u128::from(ether) * WEI_PER_ETH;
    let balance = session
        .ledger
        .deposit(amount)
        .await
        .context("funding account")?;
    println!("funded {} → balance {}", fmt_eth(amount), fmt_eth(balance));
    Ok(())
}

// ── `w3d drive` ───────────────────────────────────────────────────────────────

async fn cmd_drive_create(config: &W3dConfig, force: bool) -> Result<()> {
    let session = open_session(config).await?;
    let mut drive = DriveManager::new(
        Arc::clone(&session.ledger),
        KdfParams::from(&config.crypto),
    );

    if let DriveState::Locked(record) = drive.load().await.context("reading drive record")? {
        if !force {
            anyhow::bail!(
                "drive {} already exists; --force replaces it and makes existing files unreadable",
                record.drive_id
            );
        }
    }

    let password = read_password("New drive password: ")?;
    if std::env::var("W3D_PASSWORD").is_err() {
        let again = read_password("Repeat password: ")?;
        if password.expose_secret() != again.expose_secret() {
            anyhow::bail!("passwords do not match");
        }
    }

    drive
        .create_with_wallet(&session.wallet, &password)
        .await
        .context("creating drive")?;
    if let DriveState::Unlocked { record, .. } = drive.state() {
        println!("drive:   {}", record.drive_id);
    }
    println!("account: {}", session.ledger.account());
    Ok(())
}

async fn cmd_drive_status(config: &W3dConfig, unlock: bool) -> Result<()> {
    let session = open_session(config).await?;
    let mut drive = DriveManager::new(
        Arc::clone(&session.ledger),
        KdfParams::from(&config.crypto),
    );

    println!("account: {}", session.ledger.account());
    match drive.load().await.context("reading drive record")? {
        DriveState::NoDrive => {
            println!("drive:   none (run: w3d drive create)");
            return Ok(());
        }
        DriveState::Locked(record) | DriveState::Unlocked { record, .. } => {
            println!("drive:   {}", record.drive_id);
        }
    }

    if unlock {
        unlock_drive(config, &session).await?;
        println!("status:  unlocked");
    } else {
        println!("status:  locked");
    }
    Ok(())
}

// ── `w3d push` ────────────────────────────────────────────────────────────────

async fn cmd_push(
    config: &W3dConfig,
    file: &Path,
    id: Option<Uuid>,
    mime: Option<&str>,
) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let mime_type = mime.map(str::to_string).unwrap_or_else(|| infer_mime(file).to_string());

    let session = open_session(config).await?;
    let key = unlock_drive(config, &session).await?;

    let engine = UploadEngine::new(
        Arc::clone(&session.ledger),
        CostSchedule::from(&config.cost),
        UploadOptions::from(config),
    );
    let file_id = id.unwrap_or_else(Uuid::new_v4);
    let request = UploadRequest::new(&name, &mime_type, &data).with_file_id(file_id);

    println!("Pushing {} ({}, {})", file.display(), mime_type, fmt_bytes(data.len() as u64));
    let pb = make_progress_bar("push");
    let (tx, handle) = track_progress(pb);
    let result = engine.upload(&key, request, Some(&tx)).await;
    drop(tx);
    let _ = handle.await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let hint = push_failure_hint(&e, &file_id, file);
            return Err(e).context(hint);
        }
    };

    println!("  id:       {}", outcome.file_id);
    println!("  chunks:   {} ({} written, {} unchanged)", outcome.chunk_count, outcome.written, outcome.skipped);
    println!("  bytes:    {}", fmt_bytes(outcome.bytes));
    println!("  location: {}", outcome.location);
    Ok(())
}

/// Context line for a failed push. A retry seals under a fresh IV, so it
/// rewrites every chunk of the file.
fn push_failure_hint(err: &W3dError, file_id: &Uuid, file: &Path) -> String {
    match err {
        W3dError::NotEnoughBalance { .. } => {
            "upload stopped; fund the account with: w3d ledger fund <ether>".to_string()
        }
        e if e.is_retryable() => format!(
            "upload interrupted; re-run with --id {file_id} to retry (all chunks are rewritten)"
        ),
        _ => format!("uploading {}", file.display()),
    }
}

// ── `w3d pull` ────────────────────────────────────────────────────────────────

async fn cmd_pull(config: &W3dConfig, id: Uuid, dest: Option<&Path>) -> Result<()> {
    let session = open_session(config).await?;

    let dest = match dest {
        Some(d) => d.to_path_buf(),
        None => {
            let record = session
                .ledger
                .get_file_record(&id)
                .await
                .context("reading file record")?
                .with_context(|| format!("no such file: {id}"))?;
            local_name(&record.name)?
        }
    };

    let key = unlock_drive(config, &session).await?;
    let engine = DownloadEngine::new(Arc::clone(&session.ledger), config.download.concurrency);

    let pb = make_progress_bar("pull");
    let (tx, handle) = track_progress(pb);
    let result = engine.fetch_to_path(&id, &key, &dest, Some(&tx)).await;
    drop(tx);
    let _ = handle.await;
    let result = result.with_context(|| format!("downloading {id}"))?;

    println!("  name:  {}", result.record.name);
    println!("  type:  {}", result.record.mime_type);
    println!("  bytes: {}", fmt_bytes(result.bytes));
    println!("  saved: {}", result.local_path.display());
    Ok(())
}

/// Final component of a ledger-supplied name, so a pull never writes outside
/// the working directory.
fn local_name(name: &str) -> Result<PathBuf> {
    match Path::new(name).file_name() {
        Some(base) if !base.is_empty() => Ok(PathBuf::from(base)),
        _ => anyhow::bail!("file name {name:?} is not usable as a local path; pass a destination"),
    }
}

// ── `w3d ls` / `w3d rm` ───────────────────────────────────────────────────────

async fn cmd_ls(config: &W3dConfig, account: Option<&str>) -> Result<()> {
    let session = open_session(config).await?;
    let index = FileIndex::new(Arc::clone(&session.ledger));
    let account = account.unwrap_or(session.ledger.account());
    let files = index.list(account).await.context("listing files")?;

    if files.is_empty() {
        println!("no files for {account}");
        return Ok(());
    }
    println!("{:<12} {:<36} {:>6}  {:<24} NAME", "CREATED", "ID", "CHUNKS", "TYPE");
    for f in files {
        println!(
            "{:<12} {:<36} {:>6}  {:<24} {}",
            f.created_at, f.file_id, f.chunk_count, f.mime_type, f.name
        );
    }
    Ok(())
}

async fn cmd_rm(config: &W3dConfig, ids: &[Uuid]) -> Result<()> {
    let session = open_session(config).await?;
    let index = FileIndex::new(Arc::clone(&session.ledger));

    let receipt = match ids {
        [one] => Some(index.delete(one).await.with_context(|| format!("deleting {one}"))?),
        many => index.delete_many(many).await.context("deleting files")?,
    };
    if let Some(receipt) = receipt {
        println!("deleted {} file(s) (tx {})", ids.len(), receipt.tx_hash);
    }
    Ok(())
}

// ── `w3d config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &W3dConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn infer_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn fmt_eth(wei: u128) -> String {
    let whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    if frac == 0 {
        return format!("{whole} ETH");
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{} ETH", frac.trim_end_matches('0'))
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_mime() {
        assert_eq!(infer_mime(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(infer_mime(Path::new("notes.txt")), "text/plain");
        assert_eq!(infer_mime(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_fmt_eth() {
        assert_eq!(fmt_eth(0), "0 ETH");
        assert_eq!(fmt_eth(19 * WEI_PER_ETH), "19 ETH");
        assert_eq!(fmt_eth(WEI_PER_ETH / 2), "0.5 ETH");
        assert_eq!(fmt_eth(1), "0.000000000000000001 ETH");
    }

    #[test]
    fn test_local_name_strips_directories() {
        assert_eq!(local_name("photo.png").unwrap(), PathBuf::from("photo.png"));
        assert_eq!(local_name("../../.bashrc").unwrap(), PathBuf::from(".bashrc"));
        assert_eq!(local_name("/etc/x").unwrap(), PathBuf::from("x"));
        assert_eq!(local_name("a/b/c.txt").unwrap(), PathBuf::from("c.txt"));
        assert!(local_name("").is_err());
        assert!(local_name("..").is_err());
        assert!(local_name("/").is_err());
    }

    #[test]
    fn test_push_failure_hint() {
        let id = Uuid::nil();
        let file = Path::new("a.bin");

        let interrupted = W3dError::upload_failed(1, 1, W3dError::Ledger("reset".into()));
        let hint = push_failure_hint(&interrupted, &id, file);
        assert!(hint.contains(&format!("--id {id} to retry")));
        assert!(!hint.contains("resume"));

        let broke = W3dError::NotEnoughBalance {
            index: 0,
            required: 2,
            available: 1,
        };
        assert!(push_failure_hint(&broke, &id, file).contains("w3d ledger fund"));
        assert_eq!(
            push_failure_hint(&W3dError::NoDrive, &id, file),
            "uploading a.bin"
        );
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(475 * 1024), "475.0 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["w3d", "push", "a.png", "--mime", "image/png"]).unwrap();
        assert!(matches!(cli.command, Commands::Push { mime: Some(_), .. }));

        let cli = Cli::try_parse_from(["w3d", "ledger", "fund", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ledger {
                action: LedgerAction::Fund { ether: 5 }
            }
        ));

        assert!(Cli::try_parse_from(["w3d", "rm"]).is_err());
    }
}
