//! TLS helpers for explicit FTPS (RFC 4217).
//!
//! - Builds a `tokio_rustls::TlsConnector` trusting the platform roots.
//! - Provides `upgrade_to_tls` for securing an existing plain control channel.
//!
//! The same connector (and therefore the same session cache) must be used
//! for the control and data channels: many servers refuse data connections
//! that do not resume the control channel's TLS session.

use crate::error::{FtpError, FtpResult};
use crate::protocol::ControlChannel;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Build a `TlsConnector` backed by the native certificate store.
pub fn build_tls_connector() -> FtpResult<TlsConnector> {
    let mut root_store = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        log::warn!("Skipping unreadable native certificate: {}", err);
    }
    let (added, ignored) = root_store.add_parsable_certificates(native.certs);
    log::debug!("Loaded {} native root certificates ({} ignored)", added, ignored);
    if root_store.is_empty() {
        return Err(FtpError::tls_failed("No usable root certificates found"));
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

fn server_name(host: &str) -> FtpResult<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| FtpError::tls_failed(format!("Invalid server name '{}': {}", host, e)))
}

/// Secure a plain control channel after the server accepted `AUTH TLS`.
pub async fn upgrade_to_tls(
    channel: ControlChannel,
    connector: &TlsConnector,
    host: &str,
) -> FtpResult<ControlChannel> {
    let local_addr = channel.local_addr();
    let tcp = channel.into_plain()?;
    let tls = connector
        .connect(server_name(host)?, tcp)
        .await
        .map_err(|e| FtpError::tls_failed(format!("Explicit TLS handshake: {}", e)))?;
    Ok(ControlChannel::secure(tls, local_addr))
}

/// Wrap a freshly opened data connection for `PROT P`.
pub async fn wrap_data_stream(
    tcp: TcpStream,
    connector: &TlsConnector,
    host: &str,
) -> FtpResult<TlsStream<TcpStream>> {
    connector
        .connect(server_name(host)?, tcp)
        .await
        .map_err(|e| FtpError::tls_failed(format!("Data channel TLS: {}", e)))
}
