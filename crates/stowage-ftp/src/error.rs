//! Errors raised by the FTP transport layer.
//!
//! They stay inside the crate's transport seam: `FtpAdapter` and the
//! provider turn them into `stowage_core::FilesystemError`s, keeping the
//! message and reply code.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpError {
    pub kind: FtpErrorKind,
    pub message: String,
    /// Reply code that triggered the error, when the server sent one.
    pub code: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpErrorKind {
    /// DNS, TCP connect or banner failure.
    ConnectionFailed,
    TlsFailed,
    AuthFailed,
    /// The server answered a command with a 4xx/5xx reply.
    Rejected,
    NotFound,
    DataChannelFailed,
    /// Malformed or unexpected reply.
    ProtocolError,
    Io,
    Timeout,
    Disconnected,
    InvalidConfig,
}

pub type FtpResult<T> = Result<T, FtpError>;

impl FtpError {
    pub fn new(kind: FtpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(self, code: u16) -> Self {
        Self {
            code: Some(code),
            ..self
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ConnectionFailed, message)
    }

    pub fn tls_failed(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::TlsFailed, message)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::AuthFailed, message)
    }

    pub fn data_channel(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::DataChannelFailed, message)
    }

    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ProtocolError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Timeout, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Disconnected, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::InvalidConfig, message)
    }

    /// Error for a negative reply; `text` is the reply as the server sent it.
    pub fn from_reply(code: u16, text: &str) -> Self {
        Self::new(reply_kind(code, text), text).with_code(code)
    }
}

fn reply_kind(code: u16, text: &str) -> FtpErrorKind {
    match code {
        421 => FtpErrorKind::Disconnected,
        425 | 426 => FtpErrorKind::DataChannelFailed,
        430 | 530 => FtpErrorKind::AuthFailed,
        450 | 550 => {
            let text = text.to_ascii_lowercase();
            if text.contains("no such") || text.contains("not found") {
                FtpErrorKind::NotFound
            } else {
                FtpErrorKind::Rejected
            }
        }
        _ => FtpErrorKind::Rejected,
    }
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "FTP {:?} ({}): {}", self.kind, code, self.message),
            None => write!(f, "FTP {:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for FtpError {}

impl From<std::io::Error> for FtpError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let kind = match e.kind() {
            ErrorKind::TimedOut => FtpErrorKind::Timeout,
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof => FtpErrorKind::Disconnected,
            _ => FtpErrorKind::Io,
        };
        Self::new(kind, e.to_string())
    }
}
