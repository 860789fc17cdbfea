//! **stowage-core**: the backend-agnostic filesystem contract.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |---|---|
//! | [`adapter`] | `FilesystemAdapter` trait implemented by every backend |
//! | [`attributes`] | `StorageAttributes`, `FileAttributes`, `DirectoryAttributes`, `Visibility` |
//! | [`config`] | Per-call key/value settings (`visibility`, `directory_visibility`, …) |
//! | [`error`] | `FilesystemError` taxonomy |
//! | [`mime`] | Content-sniffed MIME detection |
//! | [`path`] | Root-relative `PathPrefixer` |

pub mod adapter;
pub mod attributes;
pub mod config;
pub mod error;
pub mod mime;
pub mod path;

pub use adapter::{ByteStream, ContentListing, FilesystemAdapter};
pub use attributes::{DirectoryAttributes, FileAttributes, StorageAttributes, Visibility};
pub use config::Config;
pub use error::{FilesystemError, FilesystemErrorKind, FilesystemResult};
pub use mime::detect_mime_type;
pub use path::PathPrefixer;
