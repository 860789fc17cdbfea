//! # stowage: one filesystem contract, many storage backends
//!
//! | Crate | Purpose |
//! |---|---|
//! | [`stowage_core`] | `FilesystemAdapter`, `StorageAttributes`, `Visibility`, `Config`, `PathPrefixer`, errors |
//! | [`stowage_ftp`] | `FtpAdapter` and its transport, provider, checker, parser and converter |
//!
//! ```no_run
//! use stowage::{Config, ConnectionOptions, FilesystemAdapter, FtpAdapter};
//!
//! # async fn demo() -> stowage::FilesystemResult<()> {
//! let options = ConnectionOptions::new("ftp.example.org", "/upload", "user", "secret");
//! let mut adapter = FtpAdapter::new(options);
//! adapter.write("reports/today.txt", b"hello", &Config::new()).await?;
//! assert_eq!(adapter.read("reports/today.txt").await?, b"hello");
//! # Ok(())
//! # }
//! ```

pub use stowage_core;
pub use stowage_ftp;

pub use stowage_core::{
    ByteStream, Config, ContentListing, DirectoryAttributes, FileAttributes, FilesystemAdapter,
    FilesystemError, FilesystemErrorKind, FilesystemResult, PathPrefixer, StorageAttributes,
    Visibility,
};
pub use stowage_ftp::{
    ConnectionOptions, ConnectionProvider, ConnectivityChecker, FtpAdapter, FtpConnectionProvider,
    NoopConnectivityChecker, PortableVisibilityConverter, RawListConnectivityChecker, SystemType,
    TransferMode, VisibilityConverter,
};
