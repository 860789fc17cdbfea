//! Data-channel management for FTP transfers.
//!
//! Supports two modes (RFC 959):
//! - **PASV**: server opens a port, client connects
//! - **PORT**: client opens a port, tells server
//!
//! Opening is split in two halves: `prepare` runs before the transfer
//! command is sent (PASV connect / PORT listen) and `PendingData::finish`
//! runs after the server's 1xx reply (PORT accept, optional TLS wrap).

use crate::error::{FtpError, FtpResult};
use crate::protocol::ControlChannel;
use crate::tls;
use crate::types::DataChannelMode;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

lazy_static! {
    static ref PASV_RE: Regex = Regex::new(r"(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)").unwrap();
}

/// Abstraction over a plain or TLS-wrapped data stream.
pub enum DataStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl DataStream {
    pub async fn read_all(self) -> FtpResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            DataStream::Plain(mut tcp) => read_to_end(&mut tcp, &mut buf).await?,
            DataStream::Tls(mut tls) => read_to_end(tls.as_mut(), &mut buf).await?,
        }
        Ok(buf)
    }

    pub async fn write_all_and_close(self, contents: &[u8]) -> FtpResult<()> {
        match self {
            DataStream::Plain(mut tcp) => write_and_shutdown(&mut tcp, contents).await,
            DataStream::Tls(mut tls) => write_and_shutdown(tls.as_mut(), contents).await,
        }
    }
}

async fn read_to_end<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> FtpResult<()> {
    reader.read_to_end(buf).await?;
    Ok(())
}

async fn write_and_shutdown<W: AsyncWrite + Unpin>(writer: &mut W, contents: &[u8]) -> FtpResult<()> {
    writer.write_all(contents).await?;
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}

/// Settings that shape every data connection of one session.
pub struct DataChannelSettings<'a> {
    pub mode: DataChannelMode,
    /// Trust the address in the PASV reply instead of the control host.
    pub use_passive_address: bool,
    pub host: &'a str,
    pub timeout: Duration,
    pub tls: Option<&'a TlsConnector>,
}

/// A data connection that still has to be completed.
pub enum PendingData {
    Connected(TcpStream),
    Listening(TcpListener),
}

/// Set up the data channel before the transfer command is sent.
pub async fn prepare(control: &mut ControlChannel, settings: &DataChannelSettings<'_>) -> FtpResult<PendingData> {
    match settings.mode {
        DataChannelMode::Passive => open_pasv(control, settings).await.map(PendingData::Connected),
        DataChannelMode::Active => open_port(control).await.map(PendingData::Listening),
    }
}

impl PendingData {
    /// Complete the connection once the server accepted the command.
    pub async fn finish(self, settings: &DataChannelSettings<'_>) -> FtpResult<DataStream> {
        let tcp = match self {
            PendingData::Connected(tcp) => tcp,
            PendingData::Listening(listener) => {
                let (tcp, _) = timeout(settings.timeout, listener.accept())
                    .await
                    .map_err(|_| FtpError::data_channel("PORT accept timed out"))?
                    .map_err(|e| FtpError::data_channel(format!("PORT accept: {}", e)))?;
                tcp
            }
        };

        match settings.tls {
            Some(connector) => {
                let tls = tls::wrap_data_stream(tcp, connector, settings.host).await?;
                Ok(DataStream::Tls(Box::new(tls)))
            }
            None => Ok(DataStream::Plain(tcp)),
        }
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the response, connect to the returned address.
///
/// Response format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(control: &mut ControlChannel, settings: &DataChannelSettings<'_>) -> FtpResult<TcpStream> {
    let resp = control.command_ok("PASV").await?;
    let reported = parse_pasv_response(&resp.text())?;
    let addr = if settings.use_passive_address {
        reported.to_string()
    } else {
        format!("{}:{}", settings.host, reported.port())
    };
    log::trace!("PASV data connection to {}", addr);
    let tcp = timeout(settings.timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::data_channel("PASV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 response.
fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

// ─── PORT ────────────────────────────────────────────────────────────

/// Bind a listener next to the control connection and announce it via `PORT`.
async fn open_port(control: &mut ControlChannel) -> FtpResult<TcpListener> {
    let ip = match control.local_addr().ip() {
        IpAddr::V4(v4) => v4,
        _ => return Err(FtpError::data_channel("PORT requires IPv4")),
    };
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(ip), 0))
        .await
        .map_err(|e| FtpError::data_channel(format!("PORT bind: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| FtpError::data_channel(format!("PORT local_addr: {}", e)))?
        .port();

    control.command_ok(&format_port_command(ip.octets(), port)).await?;
    Ok(listener)
}

fn format_port_command(octets: [u8; 4], port: u16) -> String {
    format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port / 256,
        port % 256
    )
}
