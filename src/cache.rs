//! Content-addressed image cache
//!
//! One file per (source URL, target extension) pair, named
//! `<hash>.<ext>` inside a cache directory that survives process
//! restarts. The key hashes the URL **text** only, never the fetched
//! bytes: two different images served from the same URL at different
//! times collapse into one slot, and refreshing requires clearing the
//! directory. Nothing here expires or evicts; eviction is a concern for
//! a layer above, not for this cache.
//!
//! The key hash is BLAKE3 truncated to 128 bits and hex-encoded, the
//! same deterministic scheme used for HTTP validators elsewhere in the
//! proxy stack. Concurrent first writes for one key are a benign race
//! (identical input and configuration encode to identical bytes), but
//! writes still go through a temp file renamed into place so a reader
//! never observes a half-written artifact.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TranscodeError;

/// URL-path prefix under which the proxy serves cached images
const REFERENCE_PREFIX: &str = "/cached_image/";

/// Monotonic discriminator for temp file names within this process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk cache keyed by (URL, extension)
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    /// Open (and create if absent) a cache directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TranscodeError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Deterministic cache key for a (URL, extension) pair
    ///
    /// BLAKE3 of the URL text, truncated to 128 bits, hex-encoded, with
    /// the target extension appended.
    pub fn key_for(url: &str, extension: &str) -> String {
        let hash = blake3::hash(url.as_bytes());
        format!("{}.{}", hex::encode(&hash.as_bytes()[..16]), extension)
    }

    /// Reference string the legacy client will request
    pub fn reference_for(key: &str) -> String {
        format!("{}{}", REFERENCE_PREFIX, key)
    }

    /// Storage path for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Cache-hit check; no fetch, no decode, no transform behind it
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    /// Persist encoded bytes under a key via temp-file-then-rename
    ///
    /// Rename within one directory is atomic on the platforms the proxy
    /// targets, so concurrent writers finish with one complete file.
    pub fn store(&self, key: &str, bytes: &[u8]) -> Result<(), TranscodeError> {
        let final_path = self.path_for(key);
        let temp_path = self.temp_path(key);
        std::fs::write(&temp_path, bytes)?;
        if let Err(err) = std::fs::rename(&temp_path, &final_path) {
            // Don't leave temp litter behind a failed rename
            let _ = std::fs::remove_file(&temp_path);
            return Err(err.into());
        }
        log::debug!("cached {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let discriminator = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), discriminator))
    }
}
