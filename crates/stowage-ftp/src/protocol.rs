//! Control-channel codec: CRLF-terminated commands out, RFC 959 replies in.
//!
//! A reply is one line `NNN text`, or a block opened by `NNN-text` and
//! closed by the first line starting with `NNN ` (or a bare `NNN`):
//!
//! ```text
//! 213-Status of /pub/file.txt:
//!  -rw-r--r--   1 ftp      ftp           409 Aug 19 09:01 file.txt
//! 213 End of status
//! ```

use crate::error::{FtpError, FtpResult};
use crate::types::FtpResponse;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// The socket under the control channel, before or after `AUTH TLS`.
pub enum ControlStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for ControlStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ControlStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_flush(cx),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ControlStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            ControlStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Buffered command/reply exchange over one control connection.
pub struct ControlChannel {
    stream: BufReader<ControlStream>,
    /// Local end of the connection, announced in `PORT`.
    local_addr: SocketAddr,
}

impl ControlChannel {
    pub fn plain(stream: TcpStream) -> FtpResult<Self> {
        let local_addr = stream.local_addr()?;
        Ok(Self {
            stream: BufReader::new(ControlStream::Plain(stream)),
            local_addr,
        })
    }

    pub fn secure(stream: TlsStream<TcpStream>, local_addr: SocketAddr) -> Self {
        Self {
            stream: BufReader::new(ControlStream::Tls(Box::new(stream))),
            local_addr,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.stream.get_ref(), ControlStream::Tls(_))
    }

    /// Hand back the plain socket so it can be wrapped in TLS.
    ///
    /// Fails if the channel is already secure or the server sent bytes
    /// nobody has read yet.
    pub fn into_plain(self) -> FtpResult<TcpStream> {
        if !self.stream.buffer().is_empty() {
            return Err(FtpError::protocol_error(
                "Unexpected data on the control channel before the TLS handshake",
            ));
        }
        match self.stream.into_inner() {
            ControlStream::Plain(tcp) => Ok(tcp),
            ControlStream::Tls(_) => Err(FtpError::protocol_error(
                "The control channel is already secure",
            )),
        }
    }

    pub async fn send(&mut self, command: &str) -> FtpResult<()> {
        let writer = self.stream.get_mut();
        writer.write_all(command.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        match command.strip_prefix("PASS ") {
            Some(_) => log::trace!(">>> PASS ****"),
            None => log::trace!(">>> {}", command),
        }
        Ok(())
    }

    pub async fn reply(&mut self) -> FtpResult<FtpResponse> {
        let first = self.next_line().await?;
        let code = reply_code(&first)?;
        let continued = first.as_bytes().get(3) == Some(&b'-');
        let mut lines = vec![first];

        if continued {
            let closing = format!("{} ", code);
            loop {
                let line = self.next_line().await?;
                let done = line.starts_with(&closing) || line == closing.trim_end();
                lines.push(line);
                if done {
                    break;
                }
            }
        }

        log::trace!("<<< {}", lines.last().map(String::as_str).unwrap_or_default());
        Ok(FtpResponse::new(code, lines))
    }

    /// Send `command` and return the reply, whatever its code.
    pub async fn command(&mut self, command: &str) -> FtpResult<FtpResponse> {
        self.send(command).await?;
        self.reply().await
    }

    /// Send `command`; anything but a 2xx reply is an error.
    pub async fn command_ok(&mut self, command: &str) -> FtpResult<FtpResponse> {
        let reply = self.command(command).await?;
        if reply.is_completion() {
            Ok(reply)
        } else {
            Err(FtpError::from_reply(reply.code, &reply.text()))
        }
    }

    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            log::debug!("Control channel shutdown: {}", e);
        }
    }

    async fn next_line(&mut self) -> FtpResult<String> {
        let mut line = String::new();
        if self.stream.read_line(&mut line).await? == 0 {
            return Err(FtpError::disconnected("Server closed the control connection"));
        }
        let end = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(end);
        Ok(line)
    }
}

fn reply_code(line: &str) -> FtpResult<u16> {
    line.get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| FtpError::protocol_error(format!("Invalid reply code in: '{}'", line)))
}
