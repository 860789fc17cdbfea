//! The filesystem contract every storage backend implements.

use crate::attributes::{FileAttributes, StorageAttributes, Visibility};
use crate::config::Config;
use crate::error::FilesystemResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;

/// Owned byte source used by the streamed read/write operations.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Lazy, single-pass listing result.
pub type ContentListing<'a> = BoxStream<'a, FilesystemResult<StorageAttributes>>;

/// Backend adapter contract consumed by the generic storage facade.
///
/// Every method takes `&mut self`: an adapter owns one stateful connection
/// and runs at most one operation at a time.
#[async_trait]
pub trait FilesystemAdapter: Send {
    async fn file_exists(&mut self, path: &str) -> FilesystemResult<bool>;

    async fn directory_exists(&mut self, path: &str) -> FilesystemResult<bool>;

    async fn write(&mut self, path: &str, contents: &[u8], config: &Config)
        -> FilesystemResult<()>;

    async fn write_stream(
        &mut self,
        path: &str,
        contents: ByteStream,
        config: &Config,
    ) -> FilesystemResult<()>;

    async fn read(&mut self, path: &str) -> FilesystemResult<Vec<u8>>;

    async fn read_stream(&mut self, path: &str) -> FilesystemResult<ByteStream>;

    async fn delete(&mut self, path: &str) -> FilesystemResult<()>;

    async fn delete_directory(&mut self, path: &str) -> FilesystemResult<()>;

    async fn create_directory(&mut self, path: &str, config: &Config) -> FilesystemResult<()>;

    async fn set_visibility(&mut self, path: &str, visibility: Visibility)
        -> FilesystemResult<()>;

    async fn visibility(&mut self, path: &str) -> FilesystemResult<FileAttributes>;

    async fn mime_type(&mut self, path: &str) -> FilesystemResult<FileAttributes>;

    async fn last_modified(&mut self, path: &str) -> FilesystemResult<FileAttributes>;

    async fn file_size(&mut self, path: &str) -> FilesystemResult<FileAttributes>;

    /// List entries below `path`; `deep` descends into subdirectories.
    /// Nothing is fetched until the stream is polled.
    fn list_contents(&mut self, path: &str, deep: bool) -> ContentListing<'_>;

    async fn move_file(
        &mut self,
        source: &str,
        destination: &str,
        config: &Config,
    ) -> FilesystemResult<()>;

    async fn copy_file(
        &mut self,
        source: &str,
        destination: &str,
        config: &Config,
    ) -> FilesystemResult<()>;
}
