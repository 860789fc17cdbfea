//! # stowage-ftp: FTP/FTPS backend for the stowage filesystem contract
//!
//! Speaks RFC 959 with explicit FTPS (RFC 4217) and hides the stateful
//! control channel behind `stowage_core::FilesystemAdapter`.
//!
//! Architecture:
//! - `types`: protocol enums and the reply type
//! - `error`: transport-level `FtpError`
//! - `protocol`: control-channel command/reply codec
//! - `connection`: TCP connect + banner
//! - `tls`: `AUTH TLS` upgrade and data-channel wrapping
//! - `transfer`: data channel management (PASV/PORT)
//! - `transport`: the `Transport` / `Connector` capability traits
//! - `client`: `FtpClient`, the socket-backed `Transport`
//! - `options`: `ConnectionOptions`
//! - `provider`: login and mode negotiation (`ConnectionProvider`)
//! - `connectivity`: liveness probes (`ConnectivityChecker`)
//! - `permissions`: visibility ↔ Unix mode mapping
//! - `listing`: Unix/Windows `LIST` parsing
//! - `adapter`: `FtpAdapter`, the reconnecting orchestrator

pub mod adapter;
pub mod client;
pub mod connection;
pub mod connectivity;
pub mod error;
pub mod listing;
pub mod options;
pub mod permissions;
pub mod protocol;
pub mod provider;
pub mod tls;
pub mod transfer;
pub mod transport;
pub mod types;

pub use adapter::FtpAdapter;
pub use client::{FtpClient, TcpConnector};
pub use connectivity::{ConnectivityChecker, NoopConnectivityChecker, RawListConnectivityChecker};
pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use listing::ListingParser;
pub use options::ConnectionOptions;
pub use permissions::{ModePair, PortableVisibilityConverter, VisibilityConverter};
pub use provider::{ConnectionProvider, FtpConnectionProvider};
pub use transport::{Connector, Transport};
pub use types::{FtpResponse, SystemType, TransferMode};
