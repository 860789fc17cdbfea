//! Storage attributes produced by listings and metadata lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Visibility ──────────────────────────────────────────────────────

/// Abstract access flag, independent of any permission encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("Invalid visibility '{}'", other)),
        }
    }
}

// ─── File / Directory ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileAttributes {
    pub path: String,
    pub file_size: Option<u64>,
    pub visibility: Option<Visibility>,
    /// Unix timestamp (seconds).
    pub last_modified: Option<i64>,
    pub mime_type: Option<String>,
}

impl FileAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_size: None,
            visibility: None,
            last_modified: None,
            mime_type: None,
        }
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_last_modified(mut self, timestamp: Option<i64>) -> Self {
        self.last_modified = timestamp;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryAttributes {
    pub path: String,
    pub visibility: Option<Visibility>,
    pub last_modified: Option<i64>,
}

impl DirectoryAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            visibility: None,
            last_modified: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_last_modified(mut self, timestamp: Option<i64>) -> Self {
        self.last_modified = timestamp;
        self
    }
}

/// One listing entry: either a file or a directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StorageAttributes {
    File(FileAttributes),
    Directory(DirectoryAttributes),
}

impl StorageAttributes {
    pub fn path(&self) -> &str {
        match self {
            StorageAttributes::File(f) => &f.path,
            StorageAttributes::Directory(d) => &d.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageAttributes::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, StorageAttributes::Directory(_))
    }

    pub fn visibility(&self) -> Option<Visibility> {
        match self {
            StorageAttributes::File(f) => f.visibility,
            StorageAttributes::Directory(d) => d.visibility,
        }
    }

    pub fn last_modified(&self) -> Option<i64> {
        match self {
            StorageAttributes::File(f) => f.last_modified,
            StorageAttributes::Directory(d) => d.last_modified,
        }
    }

    pub fn as_file(&self) -> Option<&FileAttributes> {
        match self {
            StorageAttributes::File(f) => Some(f),
            StorageAttributes::Directory(_) => None,
        }
    }
}

impl From<FileAttributes> for StorageAttributes {
    fn from(f: FileAttributes) -> Self {
        StorageAttributes::File(f)
    }
}

impl From<DirectoryAttributes> for StorageAttributes {
    fn from(d: DirectoryAttributes) -> Self {
        StorageAttributes::Directory(d)
    }
}
