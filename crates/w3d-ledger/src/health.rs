//! Ledger backend health check

use opendal::Operator;

use w3d_core::{W3dError, W3dResult};

/// Verify the backend is reachable by listing the root
pub async fn check_health(op: &Operator) -> W3dResult<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| W3dError::Ledger(format!("ledger health check failed: {e}")))
}

/// Returns true if the backend is reachable, false otherwise
pub async fn is_healthy(op: &Operator) -> bool {
    check_health(op).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_is_healthy() {
        let op = Operator::new(opendal::services::Memory::default())
            .unwrap()
            .finish();
        assert!(is_healthy(&op).await);
    }
}
