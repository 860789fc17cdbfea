//! Stateful FTP client: owns the control connection and issues commands.
//!
//! Lifecycle: `TcpConnector::open()` (TCP connect, banner, optional
//! `AUTH TLS` upgrade) → `Transport::login` → mode negotiation by the
//! provider → commands.

use crate::connection;
use crate::error::{FtpError, FtpResult};
use crate::protocol::ControlChannel;
use crate::tls;
use crate::transfer::{self, DataChannelSettings, DataStream};
use crate::transport::{Connector, Transport};
use crate::types::{DataChannelMode, FtpResponse, TransferMode};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::time::Duration;
use tokio_rustls::TlsConnector;

/// A connected FTP client session.
pub struct FtpClient {
    control: ControlChannel,
    host: String,
    timeout: Duration,
    /// Present when the control channel runs over TLS (`PROT P`).
    tls: Option<TlsConnector>,
    data_mode: DataChannelMode,
    use_passive_address: bool,
    current_type: Option<TransferMode>,
}

impl FtpClient {
    fn new(control: ControlChannel, host: &str, timeout: Duration, tls: Option<TlsConnector>) -> Self {
        Self {
            control,
            host: host.to_string(),
            timeout,
            tls,
            data_mode: DataChannelMode::Passive,
            use_passive_address: true,
            current_type: None,
        }
    }

    pub fn is_tls(&self) -> bool {
        self.control.is_secure()
    }

    // ─── TYPE command ────────────────────────────────────────────

    /// Switch transfer type, skipping the round trip when unchanged.
    async fn ensure_type(&mut self, mode: TransferMode) -> FtpResult<()> {
        if self.current_type == Some(mode) {
            return Ok(());
        }
        self.control.command_ok(mode.type_command()).await?;
        self.current_type = Some(mode);
        Ok(())
    }

    // ─── Data channel helpers ────────────────────────────────────

    /// Open the data channel and issue `cmd`.
    ///
    /// Returns `None` when the server answered with a completion reply
    /// straight away (nothing to transfer).
    async fn open_data_command(&mut self, cmd: &str) -> FtpResult<Option<DataStream>> {
        let settings = DataChannelSettings {
            mode: self.data_mode,
            use_passive_address: self.use_passive_address,
            host: &self.host,
            timeout: self.timeout,
            tls: self.tls.as_ref(),
        };
        let pending = transfer::prepare(&mut self.control, &settings).await?;
        let resp = self.control.command(cmd).await?;
        if resp.is_completion() {
            return Ok(None);
        }
        if !resp.is_preliminary() {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }
        pending.finish(&settings).await.map(Some)
    }

    /// Read the final reply that closes a transfer.
    async fn finish_transfer(&mut self) -> FtpResult<()> {
        let done = self.control.reply().await?;
        if !done.is_completion() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    async fn retrieve(&mut self, cmd: &str) -> FtpResult<Vec<u8>> {
        match self.open_data_command(cmd).await? {
            Some(ds) => {
                let data = ds.read_all().await?;
                self.finish_transfer().await?;
                Ok(data)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for FtpClient {
    async fn login(&mut self, username: &str, password: &str) -> FtpResult<()> {
        let user_resp = self.control.command(&format!("USER {}", username)).await?;
        if user_resp.code == 331 {
            let pass_resp = self.control.command(&format!("PASS {}", password)).await?;
            if !pass_resp.is_completion() {
                return Err(FtpError::auth_failed(format!(
                    "Login failed: {}",
                    pass_resp.text()
                ))
                .with_code(pass_resp.code));
            }
        } else if !user_resp.is_completion() {
            return Err(FtpError::auth_failed(format!(
                "USER rejected: {}",
                user_resp.text()
            ))
            .with_code(user_resp.code));
        }
        log::info!("Logged in to {} as {}", self.host, username);
        Ok(())
    }

    async fn raw(&mut self, command: &str) -> FtpResult<FtpResponse> {
        self.control.command(command).await
    }

    async fn chdir(&mut self, path: &str) -> FtpResult<()> {
        self.control.command_ok(&format!("CWD {}", path)).await?;
        Ok(())
    }

    async fn pwd(&mut self) -> FtpResult<String> {
        let resp = self.control.command_ok("PWD").await?;
        parse_quoted_path(&resp.text())
            .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PWD: {}", resp.text())))
    }

    async fn set_passive(&mut self, passive: bool) -> FtpResult<()> {
        self.data_mode = if passive {
            DataChannelMode::Passive
        } else {
            DataChannelMode::Active
        };
        Ok(())
    }

    async fn set_use_passive_address(&mut self, enabled: bool) -> FtpResult<()> {
        self.use_passive_address = enabled;
        Ok(())
    }

    async fn raw_list(&mut self, argument: &str) -> FtpResult<Vec<String>> {
        self.ensure_type(TransferMode::Ascii).await?;
        let cmd = if argument.is_empty() {
            "LIST".to_string()
        } else {
            format!("LIST {}", argument)
        };
        let data = self.retrieve(&cmd).await?;
        Ok(String::from_utf8_lossy(&data)
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect())
    }

    async fn get(&mut self, path: &str, mode: TransferMode) -> FtpResult<Vec<u8>> {
        self.ensure_type(mode).await?;
        self.retrieve(&format!("RETR {}", path)).await
    }

    async fn put(&mut self, path: &str, contents: &[u8], mode: TransferMode) -> FtpResult<()> {
        self.ensure_type(mode).await?;
        if let Some(ds) = self.open_data_command(&format!("STOR {}", path)).await? {
            ds.write_all_and_close(contents).await?;
            self.finish_transfer().await?;
        }
        Ok(())
    }

    async fn size(&mut self, path: &str) -> FtpResult<u64> {
        let resp = self.control.command_ok(&format!("SIZE {}", path)).await?;
        let text = resp.text();
        // "213 12345"
        text.split_whitespace()
            .nth(1)
            .and_then(|n| n.trim().parse::<u64>().ok())
            .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse SIZE: {}", text)))
    }

    async fn mdtm(&mut self, path: &str) -> FtpResult<i64> {
        let resp = self.control.command_ok(&format!("MDTM {}", path)).await?;
        let text = resp.text();
        text.split_whitespace()
            .nth(1)
            .and_then(parse_mdtm)
            .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse MDTM: {}", text)))
    }

    async fn delete(&mut self, path: &str) -> FtpResult<()> {
        self.control.command_ok(&format!("DELE {}", path)).await?;
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let rnfr = self.control.command(&format!("RNFR {}", from)).await?;
        if !rnfr.is_intermediate() && !rnfr.is_completion() {
            return Err(FtpError::from_reply(rnfr.code, &rnfr.text()));
        }
        self.control.command_ok(&format!("RNTO {}", to)).await?;
        Ok(())
    }

    async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        let resp = self.control.command_ok(&format!("MKD {}", path)).await?;
        // "257 \"/new/dir\" created"
        Ok(parse_quoted_path(&resp.text()).unwrap_or_else(|| path.to_string()))
    }

    async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        self.control.command_ok(&format!("RMD {}", path)).await?;
        Ok(())
    }

    async fn chmod(&mut self, mode: u32, path: &str) -> FtpResult<()> {
        self.control
            .command_ok(&format!("SITE CHMOD {:o} {}", mode, path))
            .await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.control.command("QUIT").await;
        self.control.shutdown().await;
        log::debug!("Closed control connection to {}", self.host);
    }
}

/// Opens `FtpClient`s over TCP, with explicit FTPS when `ssl` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Transport = FtpClient;

    async fn open(
        &self,
        host: &str,
        port: u16,
        ssl: bool,
        timeout: Duration,
    ) -> FtpResult<FtpClient> {
        let (mut control, _banner) = connection::connect(host, port, timeout).await?;
        if !ssl {
            return Ok(FtpClient::new(control, host, timeout, None));
        }

        // ── Explicit FTPS: AUTH TLS ──────────────────────────────
        let resp = control.command("AUTH TLS").await?;
        if !resp.is_completion() {
            return Err(FtpError::tls_failed(format!("AUTH TLS rejected: {}", resp.text()))
                .with_code(resp.code));
        }
        let connector = tls::build_tls_connector()?;
        control = tls::upgrade_to_tls(control, &connector, host).await?;

        // Protection level
        control.command_ok("PBSZ 0").await?;
        control.command_ok("PROT P").await?;
        Ok(FtpClient::new(control, host, timeout, Some(connector)))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Extract `/some/path` from `257 "/some/path" ...`.
fn parse_quoted_path(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let end = text[start + 1..].find('"')?;
    Some(text[start + 1..start + 1 + end].to_string())
}

/// `YYYYMMDDHHMMSS[.sss]` in UTC → Unix timestamp.
fn parse_mdtm(value: &str) -> Option<i64> {
    let digits = value.trim().get(..14)?;
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}
