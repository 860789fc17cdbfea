//! Cheap liveness probes run before every adapter operation.

use crate::transport::Transport;
use async_trait::async_trait;

#[async_trait]
pub trait ConnectivityChecker: Send + Sync {
    /// Never fails: a probe that errors means "not connected".
    async fn is_connected(&self, transport: &mut dyn Transport) -> bool;
}

/// `NOOP` must come back with 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConnectivityChecker;

#[async_trait]
impl ConnectivityChecker for NoopConnectivityChecker {
    async fn is_connected(&self, transport: &mut dyn Transport) -> bool {
        match transport.raw("NOOP").await {
            Ok(resp) => resp.code == 200,
            Err(e) => {
                log::debug!("NOOP probe failed: {}", e);
                false
            }
        }
    }
}

/// For servers that answer `NOOP` oddly: listing the current directory
/// must succeed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawListConnectivityChecker;

#[async_trait]
impl ConnectivityChecker for RawListConnectivityChecker {
    async fn is_connected(&self, transport: &mut dyn Transport) -> bool {
        match transport.raw_list("./").await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("LIST probe failed: {}", e);
                false
            }
        }
    }
}
