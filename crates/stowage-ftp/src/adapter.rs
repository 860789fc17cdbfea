//! `FtpAdapter`: the `FilesystemAdapter` implementation over FTP.
//!
//! The adapter owns at most one connection. Before every operation the
//! connection is probed with the `ConnectivityChecker`; a dead or missing
//! connection is rebuilt through the `ConnectionProvider` and re-anchored
//! at the configured root, a live one is moved back to the resolved root.
//! Paths are always prefixed with the *resolved* root (the server's `PWD`
//! after the initial `CWD`), never with the configured string.

use crate::connectivity::{ConnectivityChecker, NoopConnectivityChecker};
use crate::listing::{classify_line, LineKind, ListingParser};
use crate::options::ConnectionOptions;
use crate::permissions::{PortableVisibilityConverter, VisibilityConverter};
use crate::provider::{ConnectionProvider, FtpConnectionProvider};
use crate::transport::Transport;
use crate::types::SystemType;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::io::Cursor;
use std::sync::Arc;
use stowage_core::config::OPTION_VISIBILITY;
use stowage_core::{
    ByteStream, Config, ContentListing, FileAttributes, FilesystemAdapter, FilesystemError,
    FilesystemErrorKind, FilesystemResult, PathPrefixer, StorageAttributes, Visibility,
};
use tokio::io::AsyncReadExt;

/// A live, root-anchored connection.
struct Connection<T> {
    transport: T,
    /// Absolute root reported by the server.
    root: String,
    prefixer: PathPrefixer,
    is_pure_ftpd: bool,
    /// Whether `LIST` accepts `-aln` style options; probed lazily.
    list_options: Option<bool>,
}

impl<T: Transport> Connection<T> {
    async fn supports_list_options(&mut self) -> bool {
        if let Some(supported) = self.list_options {
            return supported;
        }
        let syst = match self.transport.raw("SYST").await {
            Ok(resp) => resp.text().to_lowercase(),
            Err(_) => String::new(),
        };
        let supported = !syst.contains("filezilla") && !syst.contains("l8");
        log::debug!("LIST options supported: {}", supported);
        self.list_options = Some(supported);
        supported
    }

    /// `LIST` a root-relative directory. A failed listing reads as empty.
    async fn raw_list(&mut self, options: &str, path: &str) -> Vec<String> {
        let mut location = format!("{}/", self.prefixer.prefix_path(path).trim_end_matches('/'));
        if self.is_pure_ftpd {
            location = escape_path(&location);
        }
        let argument = if self.supports_list_options().await {
            format!("{} {}", options, location)
        } else {
            location
        };
        match self.transport.raw_list(&argument).await {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("LIST {} failed, treating as empty: {}", argument, e);
                Vec::new()
            }
        }
    }

    /// A failed `DELE` only counts when the file is still there.
    async fn delete_file(&mut self, path: &str) -> FilesystemResult<()> {
        let location = self.prefixer.prefix_path(path);
        if let Err(e) = self.transport.delete(&location).await {
            if self.transport.size(&location).await.is_ok() {
                return Err(FilesystemError::delete(
                    path,
                    format!("the file still exists. {}", e.message),
                )
                .with_code(e.code));
            }
            log::debug!("{} was already gone", location);
        }
        Ok(())
    }

    /// Create every missing segment of `dirname`, chmod-ing new ones.
    async fn ensure_directory_exists(
        &mut self,
        dirname: &str,
        mode: Option<u32>,
    ) -> FilesystemResult<()> {
        let mut dir_path = String::new();
        for part in dirname.split('/').filter(|p| !p.is_empty()) {
            if !dir_path.is_empty() {
                dir_path.push('/');
            }
            dir_path.push_str(part);
            let location = self.prefixer.prefix_path(&dir_path);

            if self.transport.chdir(&location).await.is_ok() {
                continue;
            }
            if let Err(e) = self.transport.mkdir(&location).await {
                let reason = if e.message.is_empty() {
                    "unable to create the directory".to_string()
                } else {
                    e.message
                };
                return Err(FilesystemError::create_directory(&dir_path, reason).with_code(e.code));
            }
            if let Some(mode) = mode {
                self.transport.chmod(mode, &location).await.map_err(|e| {
                    FilesystemError::create_directory(&dir_path, "unable to chmod the directory")
                        .with_code(e.code)
                })?;
            }
        }
        Ok(())
    }
}

/// Pure-FTPd treats these characters as globs in `LIST` and `STAT`.
fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if matches!(c, ' ' | '*' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Surface `cause` as the triggering operation's error, except root
/// resolution failures which always keep their own kind.
fn operation_error(error: FilesystemError, cause: FilesystemError) -> FilesystemError {
    if cause.is(FilesystemErrorKind::RootResolutionError) {
        cause
    } else {
        error.with_cause(cause)
    }
}

fn normalize_listing_path(path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path.trim_matches('/'))
    }
}

pub struct FtpAdapter<P: ConnectionProvider = FtpConnectionProvider> {
    options: ConnectionOptions,
    provider: P,
    checker: Box<dyn ConnectivityChecker>,
    converter: Arc<dyn VisibilityConverter>,
    parser: ListingParser,
    connection: Option<Connection<P::Transport>>,
}

impl FtpAdapter {
    /// Adapter talking to a real server over TCP.
    pub fn new(options: ConnectionOptions) -> Self {
        Self::with_provider(options, FtpConnectionProvider::new())
    }
}

impl<P: ConnectionProvider> FtpAdapter<P> {
    pub fn with_provider(options: ConnectionOptions, provider: P) -> Self {
        let converter: Arc<dyn VisibilityConverter> = Arc::new(PortableVisibilityConverter::new());
        let parser = ListingParser::new(
            Arc::clone(&converter),
            options.system_type,
            options.timestamps_on_unix_listings_enabled,
        );
        Self {
            options,
            provider,
            checker: Box::new(NoopConnectivityChecker),
            converter,
            parser,
            connection: None,
        }
    }

    pub fn with_connectivity_checker<C: ConnectivityChecker + 'static>(mut self, checker: C) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn with_visibility_converter<V: VisibilityConverter + 'static>(mut self, converter: V) -> Self {
        self.converter = Arc::new(converter);
        self.parser = ListingParser::new(
            Arc::clone(&self.converter),
            self.options.system_type,
            self.options.timestamps_on_unix_listings_enabled,
        );
        self
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Listing dialect, once detected (or forced by the options).
    pub fn system_type(&self) -> Option<SystemType> {
        self.parser.system_type()
    }

    /// Send `QUIT` and forget the connection; the next operation reconnects.
    pub async fn disconnect(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.transport.close().await;
            log::info!("Disconnected from {}", self.options.host);
        }
    }

    // ─── Connection lifecycle ────────────────────────────────────

    async fn connection(&mut self) -> FilesystemResult<&mut Connection<P::Transport>> {
        let live = match self.connection.as_mut() {
            Some(conn) => self.checker.is_connected(&mut conn.transport).await,
            None => false,
        };

        if !live {
            if self.connection.take().is_some() {
                log::info!("Connection to {} is gone, reconnecting", self.options.host);
            }
            let conn = self.connect().await?;
            self.connection = Some(conn);
        }

        match self.connection.as_mut() {
            Some(conn) => {
                if live {
                    // A failed command may have left us anywhere.
                    let _ = conn.transport.chdir(&conn.root).await;
                }
                Ok(conn)
            }
            None => Err(FilesystemError::connection(
                &self.options.host,
                self.options.port,
                "no connection available",
            )),
        }
    }

    async fn connect(&self) -> FilesystemResult<Connection<P::Transport>> {
        let mut transport = self.provider.create_connection(&self.options).await?;

        if let Err(e) = transport.chdir(&self.options.root).await {
            transport.close().await;
            return Err(
                FilesystemError::root_does_not_exist(&self.options.root, e.message).with_code(e.code),
            );
        }
        let root = match transport.pwd().await {
            Ok(root) => root,
            Err(e) => {
                transport.close().await;
                return Err(
                    FilesystemError::root_unreadable(&self.options.root, e.message).with_code(e.code),
                );
            }
        };

        let is_pure_ftpd = match transport.raw("HELP").await {
            Ok(resp) => resp.text().contains("Pure-FTPd"),
            Err(_) => false,
        };
        log::debug!("Resolved root {} (Pure-FTPd: {})", root, is_pure_ftpd);

        Ok(Connection {
            transport,
            prefixer: PathPrefixer::new(&root),
            root,
            is_pure_ftpd,
            list_options: self.options.use_raw_list_options,
        })
    }

    // ─── Helpers ─────────────────────────────────────────────────

    async fn ensure_parent_directory_exists(
        &mut self,
        path: &str,
        visibility: Option<Visibility>,
    ) -> FilesystemResult<()> {
        match path.trim_start_matches('/').rsplit_once('/') {
            Some((dirname, _)) if !dirname.is_empty() && dirname != "." => {
                self.ensure_directory_exists(dirname, visibility).await
            }
            _ => Ok(()),
        }
    }

    async fn ensure_directory_exists(
        &mut self,
        dirname: &str,
        visibility: Option<Visibility>,
    ) -> FilesystemResult<()> {
        let trimmed = dirname.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(());
        }
        let mode = visibility.map(|v| self.converter.for_directory(v));
        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::create_directory(dirname, ""), e))?;
        conn.ensure_directory_exists(trimmed, mode).await
    }
}

#[async_trait]
impl<P: ConnectionProvider> FilesystemAdapter for FtpAdapter<P> {
    async fn file_exists(&mut self, path: &str) -> FilesystemResult<bool> {
        match self.file_size(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is(FilesystemErrorKind::RetrieveMetadataError) && e.cause.is_none() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn directory_exists(&mut self, path: &str) -> FilesystemResult<bool> {
        let conn = self.connection().await.map_err(|e| {
            operation_error(FilesystemError::retrieve_metadata(path, "type", ""), e)
        })?;
        let location = conn.prefixer.prefix_directory_path(path);
        Ok(conn.transport.chdir(&location).await.is_ok())
    }

    async fn write(&mut self, path: &str, contents: &[u8], config: &Config) -> FilesystemResult<()> {
        let mode = self.options.transfer_mode;
        self.ensure_parent_directory_exists(path, config.directory_visibility())
            .await
            .map_err(|e| {
                operation_error(
                    FilesystemError::write(path, "creating parent directory failed"),
                    e,
                )
            })?;

        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::write(path, ""), e))?;
        let location = conn.prefixer.prefix_path(path);
        conn.transport
            .put(&location, contents, mode)
            .await
            .map_err(|e| {
                FilesystemError::write(path, format!("writing the file failed. {}", e.message))
                    .with_code(e.code)
            })?;

        if let Some(visibility) = config.visibility() {
            self.set_visibility(path, visibility).await.map_err(|e| {
                operation_error(FilesystemError::write(path, "setting visibility failed"), e)
            })?;
        }
        Ok(())
    }

    async fn write_stream(
        &mut self,
        path: &str,
        mut contents: ByteStream,
        config: &Config,
    ) -> FilesystemResult<()> {
        let mut buf = Vec::new();
        contents.read_to_end(&mut buf).await.map_err(|e| {
            FilesystemError::write(path, format!("reading the source stream failed. {}", e))
        })?;
        self.write(path, &buf, config).await
    }

    async fn read(&mut self, path: &str) -> FilesystemResult<Vec<u8>> {
        let mode = self.options.transfer_mode;
        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::read(path, ""), e))?;
        let location = conn.prefixer.prefix_path(path);
        conn.transport
            .get(&location, mode)
            .await
            .map_err(|e| FilesystemError::read(path, e.message).with_code(e.code))
    }

    async fn read_stream(&mut self, path: &str) -> FilesystemResult<ByteStream> {
        let contents = self.read(path).await?;
        Ok(Box::new(Cursor::new(contents)))
    }

    async fn delete(&mut self, path: &str) -> FilesystemResult<()> {
        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::delete(path, ""), e))?;
        conn.delete_file(path).await
    }

    async fn delete_directory(&mut self, path: &str) -> FilesystemResult<()> {
        let contents: Vec<StorageAttributes> = self
            .list_contents(path, true)
            .try_collect()
            .await
            .map_err(|e| operation_error(FilesystemError::delete_directory(path, ""), e))?;

        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::delete_directory(path, ""), e))?;

        let mut directories = vec![conn.prefixer.prefix_path(path.trim_end_matches('/'))];
        for item in &contents {
            if item.is_dir() {
                directories.push(conn.prefixer.prefix_path(item.path()));
                continue;
            }
            conn.delete_file(item.path()).await.map_err(|e| {
                FilesystemError::delete_directory(
                    path,
                    format!("Failed to delete file {}", item.path()),
                )
                .with_cause(e)
            })?;
        }

        // Reverse lexicographic order puts children before their parents.
        directories.sort_unstable_by(|a, b| b.cmp(a));
        for directory in &directories {
            if let Err(e) = conn.transport.rmdir(directory).await {
                if conn.transport.chdir(directory).await.is_err() {
                    log::debug!("{} was already gone", directory);
                    continue;
                }
                return Err(FilesystemError::delete_directory(
                    path,
                    format!("Could not delete directory {}. {}", directory, e.message),
                )
                .with_code(e.code));
            }
        }
        Ok(())
    }

    async fn create_directory(&mut self, path: &str, config: &Config) -> FilesystemResult<()> {
        let visibility = config.directory_visibility().or_else(|| config.visibility());
        self.ensure_directory_exists(path, visibility).await
    }

    async fn set_visibility(&mut self, path: &str, visibility: Visibility) -> FilesystemResult<()> {
        let mode = self.converter.for_file(visibility);
        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(FilesystemError::set_visibility(path, ""), e))?;
        let location = conn.prefixer.prefix_path(path);
        conn.transport
            .chmod(mode, &location)
            .await
            .map_err(|e| FilesystemError::set_visibility(path, e.message).with_code(e.code))
    }

    async fn visibility(&mut self, path: &str) -> FilesystemResult<FileAttributes> {
        let metadata_error =
            |reason: &str| FilesystemError::retrieve_metadata(path, "visibility", reason);

        let conn = self
            .connection()
            .await
            .map_err(|e| operation_error(metadata_error(""), e))?;
        let mut location = conn.prefixer.prefix_path(path);
        if conn.is_pure_ftpd {
            location = escape_path(&location);
        }
        let reply = conn
            .transport
            .raw(&format!("STAT {}", location))
            .await
            .map_err(|e| metadata_error(&e.message).with_code(e.code))?;
        if reply.lines.len() < 3 || reply.lines[1].starts_with("ftpd:") {
            return Err(metadata_error("").with_code(Some(reply.code)));
        }

        match self.parser.parse_line("", &reply.lines[1]) {
            Ok(StorageAttributes::File(file)) => Ok(FileAttributes {
                path: path.to_string(),
                ..file
            }),
            Ok(StorageAttributes::Directory(_)) => Err(metadata_error("expected file, directory found")),
            Err(e) => Err(metadata_error("").with_cause(e)),
        }
    }

    async fn mime_type(&mut self, path: &str) -> FilesystemResult<FileAttributes> {
        let contents = self.read(path).await.map_err(|e| {
            operation_error(FilesystemError::retrieve_metadata(path, "mime_type", ""), e)
        })?;
        match stowage_core::detect_mime_type(path, &contents) {
            Some(mime_type) => Ok(FileAttributes::new(path).with_mime_type(mime_type)),
            None => Err(FilesystemError::retrieve_metadata(path, "mime_type", "Unknown.")),
        }
    }

    async fn last_modified(&mut self, path: &str) -> FilesystemResult<FileAttributes> {
        let conn = self.connection().await.map_err(|e| {
            operation_error(FilesystemError::retrieve_metadata(path, "last_modified", ""), e)
        })?;
        let location = conn.prefixer.prefix_path(path);
        match conn.transport.mdtm(&location).await {
            Ok(timestamp) => Ok(FileAttributes::new(path).with_last_modified(Some(timestamp))),
            Err(e) => Err(
                FilesystemError::retrieve_metadata(path, "last_modified", e.message).with_code(e.code),
            ),
        }
    }

    async fn file_size(&mut self, path: &str) -> FilesystemResult<FileAttributes> {
        let conn = self.connection().await.map_err(|e| {
            operation_error(FilesystemError::retrieve_metadata(path, "file_size", ""), e)
        })?;
        let location = conn.prefixer.prefix_path(path);
        match conn.transport.size(&location).await {
            Ok(size) => Ok(FileAttributes::new(path).with_file_size(size)),
            Err(e) => Err(
                FilesystemError::retrieve_metadata(path, "file_size", e.message).with_code(e.code),
            ),
        }
    }

    fn list_contents(&mut self, path: &str, deep: bool) -> ContentListing<'_> {
        let native = deep && !self.options.recurse_manually;
        let cursor = ListingCursor {
            options: if native { "-alnR" } else { "-aln" },
            native,
            descend: deep && !native,
            frames: vec![Frame::new(normalize_listing_path(path))],
            adapter: self,
        };
        stream::try_unfold(cursor, |mut cursor| async move {
            Ok(cursor.next_entry().await?.map(|item| (item, cursor)))
        })
        .boxed()
    }

    async fn move_file(
        &mut self,
        source: &str,
        destination: &str,
        config: &Config,
    ) -> FilesystemResult<()> {
        self.ensure_parent_directory_exists(destination, config.directory_visibility())
            .await
            .map_err(|e| {
                operation_error(FilesystemError::move_file(source, destination, ""), e)
            })?;

        let conn = self.connection().await.map_err(|e| {
            operation_error(FilesystemError::move_file(source, destination, ""), e)
        })?;
        let from = conn.prefixer.prefix_path(source);
        let to = conn.prefixer.prefix_path(destination);
        conn.transport.rename(&from, &to).await.map_err(|e| {
            let reason = if e.message.is_empty() {
                "reason unknown"
            } else {
                e.message.as_str()
            };
            FilesystemError::move_file(source, destination, reason).with_code(e.code)
        })
    }

    async fn copy_file(
        &mut self,
        source: &str,
        destination: &str,
        config: &Config,
    ) -> FilesystemResult<()> {
        let copy_error = |e| operation_error(FilesystemError::copy_file(source, destination, ""), e);

        let contents = self.read(source).await.map_err(copy_error)?;
        let mut config = config.clone();
        if config.visibility().is_none() && config.retain_visibility() {
            if let Some(visibility) = self.visibility(source).await.map_err(copy_error)?.visibility {
                config = config.with_setting(OPTION_VISIBILITY, visibility.as_str());
            }
        }
        self.write(destination, &contents, &config)
            .await
            .map_err(copy_error)
    }
}

// ─── Lazy listing ────────────────────────────────────────────────────

/// One directory awaiting or undergoing listing.
struct Frame {
    /// Root-relative directory; taken once the `LIST` has been issued.
    pending: Option<String>,
    /// Directory entry paths are joined onto; reset by `-R` headers.
    base: String,
    lines: std::vec::IntoIter<String>,
}

impl Frame {
    fn new(path: String) -> Self {
        Self {
            pending: Some(path.clone()),
            base: path,
            lines: Vec::new().into_iter(),
        }
    }
}

struct ListingCursor<'a, P: ConnectionProvider> {
    adapter: &'a mut FtpAdapter<P>,
    options: &'static str,
    /// Native `-R` output, split into directories by header lines.
    native: bool,
    /// Manual depth-first recursion into every listed directory.
    descend: bool,
    frames: Vec<Frame>,
}

impl<'a, P: ConnectionProvider> ListingCursor<'a, P> {
    async fn next_entry(&mut self) -> FilesystemResult<Option<StorageAttributes>> {
        loop {
            let frame = match self.frames.last_mut() {
                Some(frame) => frame,
                None => return Ok(None),
            };

            if let Some(path) = frame.pending.take() {
                let conn = self.adapter.connection().await?;
                frame.lines = conn.raw_list(self.options, &path).await.into_iter();
                continue;
            }

            let line = match frame.lines.next() {
                Some(line) => line,
                None => {
                    self.frames.pop();
                    continue;
                }
            };

            match classify_line(&line, self.native) {
                LineKind::Ignored => {}
                LineKind::Header(header) => {
                    let base = self.header_base(header);
                    if let Some(frame) = self.frames.last_mut() {
                        frame.base = base;
                    }
                }
                LineKind::Entry => {
                    let item = match self.frames.last() {
                        Some(frame) => self.adapter.parser.parse_line(&frame.base, &line)?,
                        None => return Ok(None),
                    };
                    if self.descend && item.is_dir() {
                        self.frames.push(Frame::new(item.path().to_string()));
                    }
                    return Ok(Some(item));
                }
            }
        }
    }

    /// `./dir/sub` or `/abs/root/dir/sub` → `dir/sub`.
    fn header_base(&self, header: &str) -> String {
        let dir = header
            .strip_prefix('.')
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(header);
        let dir = format!("{}/", dir.trim_end_matches('/'));
        match self.adapter.connection.as_ref() {
            Some(conn) => conn.prefixer.strip_directory_prefix(&dir).to_string(),
            None => dir.trim_end_matches('/').to_string(),
        }
    }
}
