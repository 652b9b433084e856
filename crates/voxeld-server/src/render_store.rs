// crates/voxeld-server/src/render_store.rs
// ============================================================================
// Module: Render Artifact Store
// Description: Owns render_dir; TTL + size-capped eviction; background reaper.
// Purpose: Let render handlers hand back a small opaque token instead of
//          streaming image bytes inline on every render call (§4.4).
// Dependencies: rand (OsRng), tokio (fs, time, sync), voxeld-core::DomainError
// ============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;
use tokio::time::interval;
use voxeld_core::DomainError;

/// Opaque 128-bit render artifact token, rendered as lowercase hex.
///
/// Path validation on lookup refuses anything outside `[0-9a-f]` to prevent
/// traversal (§4.4); this type only ever constructs values already known to
/// satisfy that shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderToken(String);

impl RenderToken {
    /// Generates a fresh token from 128 bits of OS randomness.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parses a token from wire input, rejecting anything containing a
    /// character outside `[0-9a-f]`.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownArtifact`] if `raw` contains any
    /// character outside the hex alphabet.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(DomainError::UnknownArtifact);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the token's hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RenderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single completed render, owned by the [`RenderStore`].
#[derive(Debug, Clone)]
pub struct RenderArtifact {
    /// The artifact's opaque token.
    pub token: RenderToken,
    /// Filesystem path inside `render_dir`.
    pub path: PathBuf,
    /// Size of the artifact on disk, in bytes.
    pub size_bytes: u64,
    /// Unix-epoch milliseconds this artifact was created.
    pub created_at: u64,
    /// Unix-epoch milliseconds after which this artifact is eligible for
    /// reaping, subject to `ref_count`.
    pub expires_at: u64,
    /// Number of in-flight handlers currently holding this artifact open;
    /// reaping is deferred while this is nonzero.
    pub ref_count: u32,
    /// The artifact's MIME type.
    pub mime_type: String,
}

/// Summary statistics returned by `get_render_stats`.
#[derive(Debug, Clone)]
pub struct RenderStoreStats {
    /// Number of live artifacts.
    pub artifact_count: usize,
    /// Sum of `size_bytes` across live artifacts.
    pub total_bytes: u64,
    /// The configured total byte cap.
    pub max_total_bytes: u64,
}

/// Current Unix-epoch milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Inner, lock-protected store state.
#[derive(Debug, Default)]
struct Inner {
    /// Live artifacts by token.
    artifacts: HashMap<RenderToken, RenderArtifact>,
    /// Running total of `size_bytes` across live artifacts.
    total_bytes: u64,
}

/// Owns `render_dir`: inserts new render artifacts under TTL and total-size
/// caps, evicting the oldest-expiring artifacts first when a new insertion
/// would exceed the cap (§4.4). Safe for concurrent use by many workers.
pub struct RenderStore {
    /// Directory artifacts are written into and read from.
    render_dir: PathBuf,
    /// Maximum combined `size_bytes` across all live artifacts.
    max_total_bytes: u64,
    /// Lock-protected bookkeeping.
    inner: Mutex<Inner>,
}

impl RenderStore {
    /// Builds a store rooted at `render_dir` with the given total byte cap.
    /// Does not touch the filesystem; call [`RenderStore::cleanup_orphans`]
    /// separately at startup.
    #[must_use]
    pub fn new(render_dir: PathBuf, max_total_bytes: u64) -> Self {
        Self {
            render_dir,
            max_total_bytes,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns the directory this store manages.
    #[must_use]
    pub fn render_dir(&self) -> &Path {
        &self.render_dir
    }

    /// Registers a freshly written file at `render_dir/<token>.<ext>` as a
    /// new artifact with the given TTL, evicting older artifacts (oldest
    /// `expires_at` first, ties broken by oldest `created_at`) until it
    /// fits the total byte cap.
    ///
    /// # Errors
    /// Returns [`DomainError::CacheFull`] if the artifact does not fit even
    /// after evicting every eligible artifact.
    pub async fn insert(
        &self,
        ext: &str,
        size_bytes: u64,
        ttl_ms: u64,
        mime_type: String,
    ) -> Result<RenderArtifact, DomainError> {
        if size_bytes > self.max_total_bytes {
            return Err(DomainError::CacheFull);
        }
        let token = RenderToken::generate();
        let path = self.render_dir.join(format!("{token}.{ext}"));
        let created_at = now_ms();
        let artifact = RenderArtifact {
            token: token.clone(),
            path,
            size_bytes,
            created_at,
            expires_at: created_at.saturating_add(ttl_ms),
            ref_count: 0,
            mime_type,
        };

        let mut inner = self.inner.lock().await;
        self.evict_until_fits(&mut inner, size_bytes).await;
        if inner.total_bytes.saturating_add(size_bytes) > self.max_total_bytes {
            return Err(DomainError::CacheFull);
        }
        inner.total_bytes = inner.total_bytes.saturating_add(size_bytes);
        inner.artifacts.insert(token, artifact.clone());
        Ok(artifact)
    }

    /// Evicts artifacts (ascending `expires_at`, ties by ascending
    /// `created_at`) with `ref_count == 0` until adding `incoming_bytes`
    /// would no longer exceed the cap, or there is nothing left to evict.
    async fn evict_until_fits(&self, inner: &mut Inner, incoming_bytes: u64) {
        while inner.total_bytes.saturating_add(incoming_bytes) > self.max_total_bytes {
            let victim = inner
                .artifacts
                .values()
                .filter(|artifact| artifact.ref_count == 0)
                .min_by_key(|artifact| (artifact.expires_at, artifact.created_at))
                .map(|artifact| artifact.token.clone());
            let Some(token) = victim else {
                break;
            };
            if let Some(artifact) = inner.artifacts.remove(&token) {
                inner.total_bytes = inner.total_bytes.saturating_sub(artifact.size_bytes);
                let _ = tokio::fs::remove_file(&artifact.path).await;
            }
        }
    }

    /// Looks up a live artifact by token, parsing and validating the raw
    /// string first.
    ///
    /// # Errors
    /// Returns [`DomainError::UnknownArtifact`] if the token is malformed
    /// or not currently live, or [`DomainError::ArtifactExpired`] if it has
    /// passed its `expires_at` (but not yet been swept).
    pub async fn get_info(&self, raw_token: &str) -> Result<RenderArtifact, DomainError> {
        let token = RenderToken::parse(raw_token)?;
        let inner = self.inner.lock().await;
        let artifact = inner.artifacts.get(&token).ok_or(DomainError::UnknownArtifact)?;
        if artifact.expires_at < now_ms() {
            return Err(DomainError::ArtifactExpired);
        }
        Ok(artifact.clone())
    }

    /// Lists every currently live artifact.
    pub async fn list(&self) -> Vec<RenderArtifact> {
        self.inner.lock().await.artifacts.values().cloned().collect()
    }

    /// Increments `ref_count` for `token`, e.g. while a handler is
    /// encoding it inline. No-op if the token is unknown.
    pub async fn acquire_ref(&self, token: &RenderToken) {
        let mut inner = self.inner.lock().await;
        if let Some(artifact) = inner.artifacts.get_mut(token) {
            artifact.ref_count = artifact.ref_count.saturating_add(1);
        }
    }

    /// Decrements `ref_count` for `token`. If it reaches zero and the
    /// artifact has already expired, deletes it immediately rather than
    /// waiting for the next sweep.
    pub async fn release_ref(&self, token: &RenderToken) {
        let mut inner = self.inner.lock().await;
        let expired = {
            let Some(artifact) = inner.artifacts.get_mut(token) else {
                return;
            };
            artifact.ref_count = artifact.ref_count.saturating_sub(1);
            artifact.ref_count == 0 && artifact.expires_at <= now_ms()
        };
        if expired {
            self.remove_locked(&mut inner, token).await;
        }
    }

    /// Deletes a token's artifact immediately regardless of TTL, used by
    /// `cleanup_render`. No-op if unknown.
    pub async fn cleanup(&self, raw_token: &str) -> Result<(), DomainError> {
        let token = RenderToken::parse(raw_token)?;
        let mut inner = self.inner.lock().await;
        self.remove_locked(&mut inner, &token).await;
        Ok(())
    }

    /// Removes `token` from bookkeeping and deletes its file, best-effort.
    async fn remove_locked(&self, inner: &mut Inner, token: &RenderToken) {
        if let Some(artifact) = inner.artifacts.remove(token) {
            inner.total_bytes = inner.total_bytes.saturating_sub(artifact.size_bytes);
            let _ = tokio::fs::remove_file(&artifact.path).await;
        }
    }

    /// Returns current size/count statistics.
    pub async fn stats(&self) -> RenderStoreStats {
        let inner = self.inner.lock().await;
        RenderStoreStats {
            artifact_count: inner.artifacts.len(),
            total_bytes: inner.total_bytes,
            max_total_bytes: self.max_total_bytes,
        }
    }

    /// Deletes every artifact with `expires_at` in the past and
    /// `ref_count == 0`. Run by the reaper every `render_sweep_interval_ms`
    /// and once more during shutdown.
    pub async fn sweep(&self) {
        let now = now_ms();
        let mut inner = self.inner.lock().await;
        let expired: Vec<RenderToken> = inner
            .artifacts
            .values()
            .filter(|artifact| artifact.ref_count == 0 && artifact.expires_at < now)
            .map(|artifact| artifact.token.clone())
            .collect();
        for token in expired {
            self.remove_locked(&mut inner, &token).await;
        }
    }

    /// Deletes any file directly inside `render_dir` that is not tracked
    /// as a live artifact and whose modification time is older than
    /// `ttl_ms`. Run once at daemon startup.
    pub async fn cleanup_orphans(&self, ttl_ms: u64) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.render_dir).await else {
            return;
        };
        let cutoff = now_ms().saturating_sub(ttl_ms);
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified_ms = metadata
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0);
            if modified_ms < cutoff {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
    }
}

/// Spawns the background reaper task, waking every `sweep_interval_ms` to
/// call [`RenderStore::sweep`]. The returned handle should be awaited
/// (after being aborted) during shutdown to let the final sweep run.
pub fn spawn_reaper(store: Arc<RenderStore>, sweep_interval_ms: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(sweep_interval_ms.max(1)));
        loop {
            ticker.tick().await;
            store.sweep().await;
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use std::sync::Arc;

    use super::RenderStore;
    use super::RenderToken;
    use voxeld_core::DomainError;

    fn store(max_total_bytes: u64) -> Arc<RenderStore> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(RenderStore::new(dir.into_path(), max_total_bytes))
    }

    #[tokio::test]
    async fn insert_and_get_info_round_trips() {
        let store = store(1024);
        let artifact = store.insert("png", 100, 60_000, "image/png".to_string()).await.unwrap();
        let fetched = store.get_info(artifact.token.as_str()).await.unwrap();
        assert_eq!(fetched.size_bytes, 100);
    }

    #[tokio::test]
    async fn oversized_single_insert_is_cache_full() {
        let store = store(50);
        let result = store.insert("png", 100, 60_000, "image/png".to_string()).await;
        assert!(matches!(result, Err(DomainError::CacheFull)));
    }

    #[tokio::test]
    async fn insert_evicts_oldest_expiring_artifact_to_make_room() {
        let store = store(150);
        let first = store.insert("png", 100, 10, "image/png".to_string()).await.unwrap();
        let _second = store.insert("png", 100, 1_000_000, "image/png".to_string()).await.unwrap();
        assert!(store.get_info(first.token.as_str()).await.is_err());
    }

    #[tokio::test]
    async fn ref_count_defers_eviction_until_released() {
        let store = store(100);
        let first = store.insert("png", 100, 0, "image/png".to_string()).await.unwrap();
        store.acquire_ref(&first.token).await;
        store.sweep().await;
        assert_eq!(store.list().await.len(), 1, "held ref must survive a sweep");
        store.release_ref(&first.token).await;
        assert!(store.list().await.is_empty(), "releasing the ref after expiry reaps immediately");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_artifacts() {
        let store = store(1024);
        let _expired = store.insert("png", 10, 0, "image/png".to_string()).await.unwrap();
        let alive = store.insert("png", 10, 1_000_000, "image/png".to_string()).await.unwrap();
        store.sweep().await;
        let remaining = store.list().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, alive.token);
    }

    #[test]
    fn token_parse_rejects_non_hex_characters() {
        assert!(RenderToken::parse("not-hex!").is_err());
        assert!(RenderToken::parse("DEADBEEF").is_err());
        assert!(RenderToken::parse("deadbeef").is_ok());
    }
}
