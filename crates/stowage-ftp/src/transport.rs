//! The narrow capability interface the adapter consumes from an FTP
//! control connection.
//!
//! `FtpClient` implements it over a real socket; tests plug in an
//! in-memory server. Every method maps onto one protocol exchange, so
//! the adapter never has to branch on the concrete handle type.

use crate::error::FtpResult;
use crate::types::{FtpResponse, TransferMode};
use async_trait::async_trait;
use std::time::Duration;

/// An open (possibly not yet authenticated) control connection.
///
/// Adapter futures hold `&FtpAdapter` across awaits, hence `Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `USER` / `PASS`.
    async fn login(&mut self, username: &str, password: &str) -> FtpResult<()>;

    /// Send an arbitrary command and return the reply, whatever its code.
    async fn raw(&mut self, command: &str) -> FtpResult<FtpResponse>;

    async fn chdir(&mut self, path: &str) -> FtpResult<()>;

    /// Current working directory as reported by `PWD`.
    async fn pwd(&mut self) -> FtpResult<String>;

    /// Choose between `PASV` and `PORT` for subsequent data connections.
    async fn set_passive(&mut self, passive: bool) -> FtpResult<()>;

    /// Whether to trust the address in a `PASV` reply or reuse the
    /// control connection's host.
    async fn set_use_passive_address(&mut self, enabled: bool) -> FtpResult<()>;

    /// `LIST <argument>`, returned line by line.
    ///
    /// Lines are decoded lossily; bytes that are not UTF-8 come back as
    /// U+FFFD and the listing parser rejects such entries.
    async fn raw_list(&mut self, argument: &str) -> FtpResult<Vec<String>>;

    async fn get(&mut self, path: &str, mode: TransferMode) -> FtpResult<Vec<u8>>;

    async fn put(&mut self, path: &str, contents: &[u8], mode: TransferMode) -> FtpResult<()>;

    async fn size(&mut self, path: &str) -> FtpResult<u64>;

    /// Modification time as a Unix timestamp.
    async fn mdtm(&mut self, path: &str) -> FtpResult<i64>;

    async fn delete(&mut self, path: &str) -> FtpResult<()>;

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;

    /// Returns the created directory name as reported by the server.
    async fn mkdir(&mut self, path: &str) -> FtpResult<String>;

    async fn rmdir(&mut self, path: &str) -> FtpResult<()>;

    async fn chmod(&mut self, mode: u32, path: &str) -> FtpResult<()>;

    /// Send `QUIT` and release the connection.
    async fn close(&mut self);
}

/// Opens raw transports; the provider drives everything after the socket.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    async fn open(
        &self,
        host: &str,
        port: u16,
        ssl: bool,
        timeout: Duration,
    ) -> FtpResult<Self::Transport>;
}
