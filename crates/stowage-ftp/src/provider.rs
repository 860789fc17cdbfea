//! Turns `ConnectionOptions` into a live, authenticated, mode-negotiated
//! transport.

use crate::client::TcpConnector;
use crate::error::FtpError;
use crate::options::ConnectionOptions;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use stowage_core::{FilesystemError, FilesystemResult};

#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Transport: Transport + 'static;

    /// Open a connection ready for filesystem commands.
    ///
    /// A connection that fails after the socket was opened is closed
    /// before the error is returned.
    async fn create_connection(
        &self,
        options: &ConnectionOptions,
    ) -> FilesystemResult<Self::Transport>;
}

/// Provider driving a `Connector` through login and mode negotiation.
#[derive(Debug, Clone, Default)]
pub struct FtpConnectionProvider<C = TcpConnector> {
    connector: C,
}

impl FtpConnectionProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Connector> FtpConnectionProvider<C> {
    pub fn with_connector(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    async fn configure(
        transport: &mut C::Transport,
        options: &ConnectionOptions,
    ) -> FilesystemResult<()> {
        transport
            .login(&options.username, &options.password)
            .await
            .map_err(|e| FilesystemError::authentication(e.message.as_str()).with_code(e.code))?;

        if options.utf8 {
            Self::enable_utf8(transport, options).await?;
        }

        if let Some(ignore) = options.ignore_passive_address {
            transport
                .set_use_passive_address(!ignore)
                .await
                .map_err(|e| {
                    FilesystemError::mode_negotiation(format!(
                        "Unable to set FTP option USEPASVADDRESS. {}",
                        e.message
                    ))
                    .with_code(e.code)
                })?;
        }

        transport
            .set_passive(options.passive)
            .await
            .map_err(|e| FilesystemError::passive_mode(e.message.as_str()).with_code(e.code))?;
        Ok(())
    }

    async fn enable_utf8(
        transport: &mut C::Transport,
        options: &ConnectionOptions,
    ) -> FilesystemResult<()> {
        let refused = |reason: String, code: Option<u16>| {
            FilesystemError::mode_negotiation(format!(
                "Could not set UTF-8 mode for connection: {}::{}. {}",
                options.host, options.port, reason
            ))
            .with_code(code)
        };
        match transport.raw("OPTS UTF8 ON").await {
            Ok(resp) if resp.code == 200 || resp.code == 202 => Ok(()),
            Ok(resp) => Err(refused(resp.text(), Some(resp.code))),
            Err(FtpError { message, code, .. }) => Err(refused(message, code)),
        }
    }
}

#[async_trait]
impl<C: Connector> ConnectionProvider for FtpConnectionProvider<C> {
    type Transport = C::Transport;

    async fn create_connection(
        &self,
        options: &ConnectionOptions,
    ) -> FilesystemResult<C::Transport> {
        let mut transport = self
            .connector
            .open(
                &options.host,
                options.port,
                options.ssl,
                options.timeout_duration(),
            )
            .await
            .map_err(|e| {
                FilesystemError::connection(&options.host, options.port, e.message.as_str())
                    .with_code(e.code)
            })?;

        if let Err(e) = Self::configure(&mut transport, options).await {
            log::warn!(
                "Setting up the connection to {} failed, closing it: {}",
                options.host,
                e
            );
            transport.close().await;
            return Err(e);
        }

        log::info!(
            "FTP connection to {}:{} ready (passive: {})",
            options.host,
            options.port,
            options.passive
        );
        Ok(transport)
    }
}
