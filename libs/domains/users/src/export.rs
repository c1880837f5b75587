//! Batched CSV export with a time-based file cache.
//!
//! Exports stream user records in pages of [`EXPORT_CHUNK_SIZE`] so peak
//! memory stays at one page regardless of table size. Generated CSVs are
//! written to a cache directory keyed by a content fingerprint; while the
//! data is unchanged and the file is younger than [`CACHE_TTL`], repeat
//! exports replay the cached bytes without touching the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::UserResult;
use crate::models::{PageRequest, User};
use crate::repository::UserRepository;

/// Records fetched per repository round-trip
pub const EXPORT_CHUNK_SIZE: u64 = 100;

/// Pause between page fetches to keep the store breathing
pub const CHUNK_DELAY: Duration = Duration::from_millis(10);

/// How long a cached export stays servable
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Age past which the eviction sweep removes cache files
pub const EVICTION_THRESHOLD: Duration = Duration::from_secs(60 * 60);

const CSV_HEADER: [&str; 5] = ["ID", "Name", "Email", "CreatedAt", "UpdatedAt"];

/// CSV export service with fingerprint-keyed file caching
pub struct ExportService<R: UserRepository> {
    repository: Arc<R>,
    cache_dir: PathBuf,
}

impl<R: UserRepository> Clone for ExportService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

impl<R: UserRepository> ExportService<R> {
    pub fn new(repository: Arc<R>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Content fingerprint of the current user data.
    ///
    /// Derived from the total row count and the newest record's update
    /// timestamp (falling back to the current time when the table is
    /// empty or the timestamp is missing). Best-effort: deletions or
    /// backdated updates that leave both the count and the newest
    /// update timestamp unchanged can serve a stale cache entry until
    /// the TTL expires.
    pub async fn fingerprint(&self) -> UserResult<String> {
        let page = self.repository.list(PageRequest::new(1, 1)).await?;
        let newest = page
            .data
            .first()
            .and_then(|u| u.updated_at)
            .unwrap_or_else(Utc::now);

        let seed = format!("{}-{}", page.total, newest.to_rfc3339());
        Ok(const_hex::encode(Sha256::digest(seed.as_bytes())))
    }

    fn cache_path(&self, digest: &str) -> PathBuf {
        self.cache_dir.join(format!("users_export_{}.csv", digest))
    }

    /// Stream the user export as CSV into `sink`.
    ///
    /// Serves the cached file when one exists for the current fingerprint
    /// and is younger than [`CACHE_TTL`]; otherwise generates the export,
    /// fanning every write out to both the sink and the cache file.
    pub async fn export_csv<W>(&self, sink: &mut W) -> UserResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let digest = self.fingerprint().await?;
        self.write_csv(&digest, sink).await
    }

    /// Stream the export for an already-computed fingerprint.
    ///
    /// Lets callers run the fingerprint query separately (and surface its
    /// failure) before any response bytes exist.
    pub(crate) async fn write_csv<W>(&self, digest: &str, sink: &mut W) -> UserResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let path = self.cache_path(digest);

        if is_younger_than(&path, CACHE_TTL).await {
            debug!(digest = %digest, "Serving export from cache");
            let mut file = tokio::fs::File::open(&path).await?;
            tokio::io::copy(&mut file, sink).await?;
            sink.flush().await?;
            return Ok(());
        }

        debug!(digest = %digest, "Generating export");
        self.generate(sink, &path).await
    }

    /// Generate the export, writing to both the sink and the cache file.
    ///
    /// A failure of either destination fails the whole export; partial
    /// cache files are left for the eviction sweep.
    async fn generate<W>(&self, sink: &mut W, cache_path: &Path) -> UserResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let cache_file = tokio::fs::File::create(cache_path).await?;
        let mut out = FanoutWriter::new(sink, cache_file);

        out.write_all(&encode_record(&CSV_HEADER)?).await?;

        let mut page_no = 1;
        let mut exported = 0u64;
        loop {
            let page = self
                .repository
                .list(PageRequest::new(page_no, EXPORT_CHUNK_SIZE))
                .await?;

            out.write_all(&encode_users(&page.data)?).await?;
            exported += page.data.len() as u64;

            if page_no >= page.total_pages {
                break;
            }
            page_no += 1;
            tokio::time::sleep(CHUNK_DELAY).await;
        }

        out.shutdown().await?;
        info!(rows = exported, cache = %cache_path.display(), "Export complete");
        Ok(())
    }

    /// Remove cache files older than [`EVICTION_THRESHOLD`].
    ///
    /// Per-file failures are logged and do not abort the sweep.
    pub async fn evict_stale(&self) -> UserResult<u64> {
        self.evict_older_than(EVICTION_THRESHOLD).await
    }

    async fn evict_older_than(&self, threshold: Duration) -> UserResult<u64> {
        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_older_than(&path, threshold).await {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(_) => {
                    debug!(path = %path.display(), "Evicted stale export cache file");
                    removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), "Failed to evict cache file: {}", e);
                }
            }
        }

        if removed > 0 {
            info!(removed, "Export cache sweep complete");
        }
        Ok(removed)
    }
}

/// Writer that fans every write out to two destinations.
///
/// A failed write to either destination fails the whole write; there is
/// no partial success.
pub struct FanoutWriter<A, B> {
    first: A,
    second: B,
}

impl<A, B> FanoutWriter<A, B>
where
    A: AsyncWrite + Unpin + Send,
    B: AsyncWrite + Unpin + Send,
{
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.first.write_all(buf).await?;
        self.second.write_all(buf).await?;
        Ok(())
    }

    /// Flush and shut down both destinations
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.first.flush().await?;
        self.second.flush().await?;
        self.first.shutdown().await?;
        self.second.shutdown().await?;
        Ok(())
    }
}

fn encode_record(fields: &[&str]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

fn encode_users(users: &[User]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for user in users {
        writer.write_record([
            user.id.to_string(),
            user.name.clone(),
            user.email.clone(),
            // Missing timestamps become empty cells
            user.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            user.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

async fn file_age(path: &Path) -> Option<Duration> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let mtime = meta.modified().ok()?;
    SystemTime::now().duration_since(mtime).ok()
}

async fn is_younger_than(path: &Path, ttl: Duration) -> bool {
    matches!(file_age(path).await, Some(age) if age < ttl)
}

async fn is_older_than(path: &Path, threshold: Duration) -> bool {
    matches!(file_age(path).await, Some(age) if age >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::repository::InMemoryUserRepository;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    fn export_service(cache_dir: &TempDir) -> (Arc<InMemoryUserRepository>, ExportService<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let export = ExportService::new(repo.clone(), cache_dir.path());
        (repo, export)
    }

    async fn seed(repo: &InMemoryUserRepository, count: usize) {
        for i in 0..count {
            repo.create(NewUser {
                name: format!("User {:03}", i),
                email: format!("user{:03}@example.com", i),
            })
            .await
            .unwrap();
        }
    }

    async fn export_to_bytes(export: &ExportService<InMemoryUserRepository>) -> Vec<u8> {
        let mut sink = Cursor::new(Vec::new());
        export.export_csv(&mut sink).await.unwrap();
        sink.into_inner()
    }

    #[tokio::test]
    async fn test_empty_repo_exports_header_only() {
        let dir = TempDir::new().unwrap();
        let (_repo, export) = export_service(&dir);

        let bytes = export_to_bytes(&export).await;
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "ID,Name,Email,CreatedAt,UpdatedAt\n");

        // Still cached and servable
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_export_contains_all_rows() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 25).await;

        let bytes = export_to_bytes(&export).await;
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 26);
        assert_eq!(lines[0], "ID,Name,Email,CreatedAt,UpdatedAt");
        // Newest first
        assert!(lines[1].contains("User 024"));
        assert!(lines[25].contains("User 000"));
    }

    #[tokio::test]
    async fn test_export_spans_multiple_chunks() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 150).await;

        let bytes = export_to_bytes(&export).await;
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 151);
    }

    #[tokio::test]
    async fn test_unchanged_data_replays_cache_byte_identical() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 5).await;

        let first = export_to_bytes(&export).await;
        let second = export_to_bytes(&export).await;

        assert_eq!(first, second);
        // Same fingerprint, same file
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fingerprint_changes_when_count_changes() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 2).await;

        let before = export.fingerprint().await.unwrap();
        seed(&repo, 1).await;
        let after = export.fingerprint().await.unwrap();

        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_fingerprint_changes_when_newest_update_changes() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 2).await;

        let before = export.fingerprint().await.unwrap();

        // Touch the newest record
        let newest = repo
            .list(PageRequest::new(1, 1))
            .await
            .unwrap()
            .data
            .remove(0);
        tokio::time::sleep(Duration::from_millis(5)).await;
        repo.update(
            newest.id,
            crate::models::UpdateUser {
                name: Some("Renamed".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();

        let after = export.fingerprint().await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_evict_removes_aged_files_and_keeps_fresh_ones() {
        let dir = TempDir::new().unwrap();
        let (_repo, export) = export_service(&dir);

        export_to_bytes(&export).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // A fresh file survives the one-hour sweep
        assert_eq!(export.evict_stale().await.unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // With a zero threshold everything is stale
        assert_eq!(export.evict_older_than(Duration::ZERO).await.unwrap(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_evict_on_missing_cache_dir_is_a_noop() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let export = ExportService::new(repo, "/nonexistent/export/cache/dir");

        assert_eq!(export.evict_stale().await.unwrap(), 0);
    }

    /// Writer that fails every write
    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("sink closed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_fanout_fails_when_first_destination_fails() {
        let mut out = FanoutWriter::new(FailingWriter, Cursor::new(Vec::new()));
        assert!(out.write_all(b"data").await.is_err());
    }

    #[tokio::test]
    async fn test_fanout_fails_when_second_destination_fails() {
        let mut out = FanoutWriter::new(Cursor::new(Vec::new()), FailingWriter);
        assert!(out.write_all(b"data").await.is_err());
    }

    #[tokio::test]
    async fn test_fanout_writes_to_both_destinations() {
        let mut out = FanoutWriter::new(Cursor::new(Vec::new()), Cursor::new(Vec::new()));
        out.write_all(b"hello").await.unwrap();
        out.shutdown().await.unwrap();

        let FanoutWriter { first, second } = out;
        assert_eq!(first.into_inner(), b"hello");
        assert_eq!(second.into_inner(), b"hello");
    }

    #[tokio::test]
    async fn test_failed_sink_aborts_generation_but_leaves_partial_cache() {
        let dir = TempDir::new().unwrap();
        let (repo, export) = export_service(&dir);
        seed(&repo, 3).await;

        let mut sink = FailingWriter;
        let result = export.export_csv(&mut sink).await;
        assert!(result.is_err());

        // The partial cache file stays behind for the sweep
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
