//! Immutable connection settings for one `FtpAdapter`.

use crate::error::{FtpError, FtpResult};
use crate::types::{SystemType, TransferMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Everything needed to open, authenticate and configure a session.
///
/// Built once, handed to the adapter, never mutated afterwards.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    pub host: String,
    /// Directory the adapter anchors every path to.
    pub root: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Explicit FTPS (`AUTH TLS`).
    #[serde(default)]
    pub ssl: bool,
    /// Connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Send `OPTS UTF8 ON` after login.
    #[serde(default)]
    pub utf8: bool,
    #[serde(default = "default_true")]
    pub passive: bool,
    #[serde(default)]
    pub transfer_mode: TransferMode,
    /// Skip listing-dialect detection.
    #[serde(default)]
    pub system_type: Option<SystemType>,
    /// `Some(true)` connects data channels to the control host instead of
    /// the address in the `PASV` reply; `None` leaves the client default.
    #[serde(default)]
    pub ignore_passive_address: Option<bool>,
    #[serde(default)]
    pub timestamps_on_unix_listings_enabled: bool,
    /// Walk directories one `LIST` at a time instead of `LIST -R`.
    #[serde(default = "default_true")]
    pub recurse_manually: bool,
    /// Whether `LIST` accepts `-aln` style options; `None` probes `SYST`.
    #[serde(default)]
    pub use_raw_list_options: Option<bool>,
}

fn default_port() -> u16 {
    21
}
fn default_timeout() -> u64 {
    90
}
fn default_true() -> bool {
    true
}

impl ConnectionOptions {
    pub fn new(
        host: impl Into<String>,
        root: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            root: root.into(),
            username: username.into(),
            password: password.into(),
            port: default_port(),
            ssl: false,
            timeout: default_timeout(),
            utf8: false,
            passive: true,
            transfer_mode: TransferMode::Binary,
            system_type: None,
            ignore_passive_address: None,
            timestamps_on_unix_listings_enabled: false,
            recurse_manually: true,
            use_raw_list_options: None,
        }
    }

    /// Parse options from a camelCase JSON object.
    pub fn from_json(json: &str) -> FtpResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| FtpError::invalid_config(format!("Invalid connection options: {}", e)))?;
        if options.host.is_empty() {
            return Err(FtpError::invalid_config("Host must not be empty"));
        }
        Ok(options)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    pub fn with_system_type(mut self, system_type: SystemType) -> Self {
        self.system_type = Some(system_type);
        self
    }

    pub fn with_ignore_passive_address(mut self, ignore: bool) -> Self {
        self.ignore_passive_address = Some(ignore);
        self
    }

    pub fn with_timestamps_on_unix_listings(mut self, enabled: bool) -> Self {
        self.timestamps_on_unix_listings_enabled = enabled;
        self
    }

    pub fn with_recurse_manually(mut self, manually: bool) -> Self {
        self.recurse_manually = manually;
        self
    }

    pub fn with_raw_list_options(mut self, supported: bool) -> Self {
        self.use_raw_list_options = Some(supported);
        self
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("root", &self.root)
            .field("username", &self.username)
            .field("password", &"****")
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("timeout", &self.timeout)
            .field("utf8", &self.utf8)
            .field("passive", &self.passive)
            .field("transfer_mode", &self.transfer_mode)
            .field("system_type", &self.system_type)
            .field("ignore_passive_address", &self.ignore_passive_address)
            .field(
                "timestamps_on_unix_listings_enabled",
                &self.timestamps_on_unix_listings_enabled,
            )
            .field("recurse_manually", &self.recurse_manually)
            .field("use_raw_list_options", &self.use_raw_list_options)
            .finish()
    }
}
