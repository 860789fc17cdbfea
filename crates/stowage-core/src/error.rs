//! Filesystem error taxonomy shared by every backend adapter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One kind per failure class surfaced through the adapter contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilesystemErrorKind {
    /// Socket/session could not be opened.
    ConnectionError,
    /// Login was rejected.
    AuthenticationError,
    /// UTF-8 mode or a connection option could not be negotiated.
    ModeNegotiationError,
    /// Passive/active mode could not be set.
    PassiveModeError,
    /// The configured root is missing or its absolute path is unreadable.
    RootResolutionError,
    /// A listing line did not match the expected grammar.
    MalformedListingError,
    WriteError,
    ReadError,
    DeleteError,
    DeleteDirectoryError,
    MoveError,
    CopyError,
    CreateDirectoryError,
    SetVisibilityError,
    RetrieveMetadataError,
}

impl fmt::Display for FilesystemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Categorised filesystem error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemError {
    pub kind: FilesystemErrorKind,
    /// Affected path (or host for connect-time failures).
    pub location: String,
    /// Second path for move/copy failures.
    pub destination: Option<String>,
    pub message: String,
    /// Protocol reply code behind the failure, if any.
    pub code: Option<u16>,
    /// Underlying failure this error wraps.
    pub cause: Option<Box<FilesystemError>>,
}

pub type FilesystemResult<T> = Result<T, FilesystemError>;

// ── Construction helpers ─────────────────────────────────────────────

impl FilesystemError {
    pub fn new(
        kind: FilesystemErrorKind,
        location: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: location.into(),
            destination: None,
            message: msg.into(),
            code: None,
            cause: None,
        }
    }

    pub fn with_code(mut self, code: Option<u16>) -> Self {
        self.code = code;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_cause(mut self, cause: FilesystemError) -> Self {
        if self.code.is_none() {
            self.code = cause.code;
        }
        self.cause = Some(Box::new(cause));
        self
    }

    // ── Connect-time ─────────────────────────────────────────────

    pub fn connection(host: &str, port: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            FilesystemErrorKind::ConnectionError,
            format!("{}:{}", host, port),
            format!(
                "Unable to connect to host {} at port {}. {}",
                host, port, reason
            )
            .trim_end()
            .to_string(),
        )
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::AuthenticationError,
            "",
            format!("Unable to login/authenticate with FTP. {}", reason.into())
                .trim_end()
                .to_string(),
        )
    }

    pub fn mode_negotiation(msg: impl Into<String>) -> Self {
        Self::new(FilesystemErrorKind::ModeNegotiationError, "", msg)
    }

    pub fn passive_mode(reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::PassiveModeError,
            "",
            format!("Could not set passive mode for connection. {}", reason.into())
                .trim_end()
                .to_string(),
        )
    }

    pub fn root_does_not_exist(root: &str, reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::RootResolutionError,
            root,
            format!(
                "Unable to resolve connection root. It does not seem to exist: {}. {}",
                root,
                reason.into()
            )
            .trim_end()
            .to_string(),
        )
    }

    pub fn root_unreadable(root: &str, reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::RootResolutionError,
            root,
            format!(
                "Unable to resolve connection root. Could not get the current directory. {}",
                reason.into()
            )
            .trim_end()
            .to_string(),
        )
    }

    pub fn malformed_listing(line: &str, reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::MalformedListingError,
            "",
            format!("Metadata can't be parsed from item '{}', {}", line, reason.into()),
        )
    }

    // ── Per-operation ────────────────────────────────────────────

    pub fn write(location: &str, reason: impl Into<String>) -> Self {
        Self::located(FilesystemErrorKind::WriteError, "Unable to write file", location, reason)
    }

    pub fn read(location: &str, reason: impl Into<String>) -> Self {
        Self::located(FilesystemErrorKind::ReadError, "Unable to read file", location, reason)
    }

    pub fn delete(location: &str, reason: impl Into<String>) -> Self {
        Self::located(FilesystemErrorKind::DeleteError, "Unable to delete file", location, reason)
    }

    pub fn delete_directory(location: &str, reason: impl Into<String>) -> Self {
        Self::located(
            FilesystemErrorKind::DeleteDirectoryError,
            "Unable to delete directory",
            location,
            reason,
        )
    }

    pub fn create_directory(location: &str, reason: impl Into<String>) -> Self {
        Self::located(
            FilesystemErrorKind::CreateDirectoryError,
            "Unable to create a directory",
            location,
            reason,
        )
    }

    pub fn set_visibility(location: &str, reason: impl Into<String>) -> Self {
        Self::located(
            FilesystemErrorKind::SetVisibilityError,
            "Unable to set visibility for file",
            location,
            reason,
        )
    }

    /// `metadata` names the attribute, e.g. `file_size` or `visibility`.
    pub fn retrieve_metadata(location: &str, metadata: &str, reason: impl Into<String>) -> Self {
        Self::located(
            FilesystemErrorKind::RetrieveMetadataError,
            &format!("Unable to retrieve the {} for file", metadata),
            location,
            reason,
        )
    }

    pub fn move_file(source: &str, destination: &str, reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::MoveError,
            source,
            format!(
                "Unable to move file from {} to {}. {}",
                source,
                destination,
                reason.into()
            )
            .trim_end()
            .to_string(),
        )
        .with_destination(destination)
    }

    pub fn copy_file(source: &str, destination: &str, reason: impl Into<String>) -> Self {
        Self::new(
            FilesystemErrorKind::CopyError,
            source,
            format!(
                "Unable to copy file from {} to {}. {}",
                source,
                destination,
                reason.into()
            )
            .trim_end()
            .to_string(),
        )
        .with_destination(destination)
    }

    fn located(
        kind: FilesystemErrorKind,
        what: &str,
        location: &str,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        let message = if reason.is_empty() {
            format!("{} at location: {}.", what, location)
        } else {
            format!("{} at location: {}. {}", what, location, reason)
        };
        Self::new(kind, location, message)
    }

    pub fn is(&self, kind: FilesystemErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for FilesystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[{} {}] {}", self.kind, code, self.message)?;
        } else {
            write!(f, "[{}] {}", self.kind, self.message)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for FilesystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl From<FilesystemError> for String {
    fn from(e: FilesystemError) -> String {
        e.to_string()
    }
}
