//! Shared protocol-level types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transfer type (RFC 959 TYPE command).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransferMode {
    Ascii,
    Binary,
}

impl Default for TransferMode {
    fn default() -> Self {
        Self::Binary
    }
}

impl TransferMode {
    pub fn type_command(&self) -> &'static str {
        match self {
            TransferMode::Ascii => "TYPE A",
            TransferMode::Binary => "TYPE I",
        }
    }
}

/// Listing dialect spoken by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SystemType {
    Unix,
    Windows,
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemType::Unix => f.write_str("unix"),
            SystemType::Windows => f.write_str("windows"),
        }
    }
}

impl FromStr for SystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unix" => Ok(SystemType::Unix),
            "windows" => Ok(SystemType::Windows),
            other => Err(format!("Unsupported system type '{}'", other)),
        }
    }
}

/// Data-channel establishment mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    /// `PASV`: server listens, client connects.
    Passive,
    /// `PORT`: client listens, server connects.
    Active,
}

impl Default for DataChannelMode {
    fn default() -> Self {
        Self::Passive
    }
}

// ─── FTP Response ────────────────────────────────────────────────────

/// A single FTP response (may be multi-line).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Full response text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the response code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether this is a positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}
