//! OpenDAL Operator factory for ledger backends

use opendal::{layers::LoggingLayer, Operator};

use w3d_core::config::{expand_tilde, LedgerBackend, LedgerConfig};
use w3d_core::{W3dError, W3dResult};

/// Build the operator backing a local ledger.
///
/// `s3` reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the
/// environment and uses path-style addressing (SeaweedFS, MinIO). If
/// `enforce_tls` is set, a plaintext HTTP endpoint is an error; otherwise it is
/// logged as a warning.
pub fn build_operator(cfg: &LedgerConfig) -> W3dResult<Operator> {
    let op = match cfg.backend {
        LedgerBackend::Memory => Operator::new(opendal::services::Memory::default())
            .map_err(op_err)?
            .finish(),
        LedgerBackend::Fs => {
            let root = expand_tilde(&cfg.root);
            let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
            Operator::new(builder).map_err(op_err)?.finish()
        }
        LedgerBackend::S3 => {
            check_endpoint(cfg)?;
            let mut builder = opendal::services::S3::default()
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket);
            if let (Ok(key), Ok(secret)) = (
                std::env::var("AWS_ACCESS_KEY_ID"),
                std::env::var("AWS_SECRET_ACCESS_KEY"),
            ) {
                builder = builder.access_key_id(&key).secret_access_key(&secret);
            }
            Operator::new(builder).map_err(op_err)?.finish()
        }
    };

    Ok(op.layer(LoggingLayer::default()))
}

fn check_endpoint(cfg: &LedgerConfig) -> W3dResult<()> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            return Err(W3dError::Config(format!(
                "ledger endpoint uses plaintext HTTP ({}), but enforce_tls is enabled",
                cfg.endpoint
            )));
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "ledger endpoint uses plaintext HTTP; set ledger.enforce_tls = true and use HTTPS in production"
        );
    }
    Ok(())
}

fn op_err(e: opendal::Error) -> W3dError {
    W3dError::Config(format!("creating OpenDAL operator: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_memory_operator() {
        let cfg = LedgerConfig {
            backend: LedgerBackend::Memory,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_build_fs_operator() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LedgerConfig {
            backend: LedgerBackend::Fs,
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_s3_http_allowed_without_enforce_tls() {
        let cfg = LedgerConfig {
            backend: LedgerBackend::S3,
            endpoint: "http://localhost:8333".into(),
            enforce_tls: false,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }

    #[test]
    fn test_s3_http_rejected_with_enforce_tls() {
        let cfg = LedgerConfig {
            backend: LedgerBackend::S3,
            endpoint: "http://insecure:8333".into(),
            enforce_tls: true,
            ..Default::default()
        };
        let err = build_operator(&cfg).unwrap_err();
        assert!(err.to_string().contains("enforce_tls"));
    }

    #[test]
    fn test_s3_https_with_enforce_tls() {
        let cfg = LedgerConfig {
            backend: LedgerBackend::S3,
            endpoint: "https://s3.example.com".into(),
            enforce_tls: true,
            ..Default::default()
        };
        assert!(build_operator(&cfg).is_ok());
    }
}
