//! TCP transport: establishes the FTP control connection.
//!
//! Handles plain-TCP connect, the banner check and the connect timeout.
//! Explicit FTPS upgrades happen afterwards in `client.rs`.

use crate::error::{FtpError, FtpResult};
use crate::protocol::ControlChannel;
use crate::types::FtpResponse;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Open the control connection and read the welcome banner.
pub async fn connect(host: &str, port: u16, dur: Duration) -> FtpResult<(ControlChannel, FtpResponse)> {
    if host.is_empty() {
        return Err(FtpError::invalid_config("Host must not be empty"));
    }
    let addr = format!("{}:{}", host, port);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::timeout(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut channel = ControlChannel::plain(tcp)?;
    let banner = timeout(dur, channel.reply())
        .await
        .map_err(|_| FtpError::timeout(format!("No banner from {} in time", addr)))??;

    // 120 ("ready in nnn minutes") counts as a refusal too.
    if banner.code != 220 {
        return Err(FtpError::connection_failed(format!(
            "Unexpected banner from {}: {}",
            addr,
            banner.text()
        ))
        .with_code(banner.code));
    }
    log::debug!("Connected to {}", addr);
    Ok((channel, banner))
}
