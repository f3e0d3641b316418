use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::feed::Post;
use crate::{Error, Result};

/// The last successful extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub posts: Vec<Post>,
}

impl CacheEntry {
    pub fn new(posts: Vec<Post>, fetched_at: DateTime<Utc>) -> Self {
        Self { fetched_at, posts }
    }

    /// Time since the entry was fetched; zero if `fetched_at` lies in the future
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// True while `fetched_at + ttl` is still ahead of `now`
pub fn is_fresh(entry: &CacheEntry, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| entry.fetched_at.checked_add_signed(ttl))
    {
        Some(expires_at) => expires_at > now,
        // A TTL too large to represent never expires
        None => true,
    }
}

/// Single-file JSON snapshot store
///
/// Writes go to a temporary sibling file that is renamed over the target, so
/// readers see either the old or the new snapshot, never a partial one.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cache_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current entry
    ///
    /// A missing or unparseable file reads as absent; other I/O failures are errors.
    pub async fn read(&self) -> Result<Option<CacheEntry>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::cache_io(&self.path, e)),
        };

        match serde_json::from_slice::<CacheEntry>(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt cache file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Replace the stored entry atomically
    pub async fn write(&self, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_vec_pretty(entry)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::cache_io(parent, e))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::cache_io(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::cache_io(&self.path, e));
        }

        tracing::debug!(
            "Wrote {} posts to cache {}",
            entry.posts.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Unique per write so concurrent writers never share a temp file
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry(fetched_at: DateTime<Utc>) -> CacheEntry {
        let mut post = Post::new("A", "https://blog.example.com/a");
        post.summary = Some("Summary".to_string());
        CacheEntry::new(vec![post, Post::new("B", "https://blog.example.com/b")], fetched_at)
    }

    #[tokio::test]
    async fn test_read_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("cache.json"));
        let entry = sample_entry(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());

        store.write(&entry).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));

        let first = sample_entry(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
        let second = CacheEntry::new(
            vec![Post::new("C", "https://blog.example.com/c")],
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        );
        store.write(&first).await.unwrap();
        store.write(&second).await.unwrap();

        assert_eq!(store.read().await.unwrap(), Some(second));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cache.json".to_string()]);
    }

    #[tokio::test]
    async fn test_file_is_human_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        store
            .write(&sample_entry(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()))
            .await
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["fetched_at"], "2024-03-05T09:00:00Z");
        assert_eq!(value["posts"][0]["title"], "A");
        // Absent optional fields are not written
        assert!(value["posts"][1].get("summary").is_none());
        assert!(text.contains('\n'));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{\"fetched_at\": \"yesterday\", \"po").unwrap();

        let store = CacheStore::new(&path);
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_path_is_cache_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        let store = CacheStore::new(dir.path());
        let err = store.read().await.unwrap_err();
        assert!(matches!(err, Error::CacheIo { .. }));
    }

    #[test]
    fn test_is_fresh() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let entry = sample_entry(fetched_at);
        let ttl = Duration::from_secs(900);

        assert!(is_fresh(&entry, ttl, fetched_at));
        assert!(is_fresh(&entry, ttl, fetched_at + chrono::Duration::seconds(899)));
        assert!(!is_fresh(&entry, ttl, fetched_at + chrono::Duration::seconds(900)));
        assert!(!is_fresh(&entry, Duration::ZERO, fetched_at));
        assert!(is_fresh(&entry, Duration::MAX, fetched_at + chrono::Duration::days(3650)));
    }

    #[test]
    fn test_age() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let entry = sample_entry(fetched_at);
        assert_eq!(
            entry.age(fetched_at + chrono::Duration::seconds(30)),
            Duration::from_secs(30)
        );
        assert_eq!(entry.age(fetched_at - chrono::Duration::seconds(30)), Duration::ZERO);
    }
}
