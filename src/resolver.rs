//! Image resolution: cache lookup, fetch, transcode, persist
//!
//! `resolve()` is the subsystem's single entry point. The core performance
//! guarantee is the cache-hit fast path: transcoding cost is paid at most
//! once per distinct (URL, format) pair, and a hit performs no fetch, no
//! decode, and no transform.
//!
//! Network access goes through the [`Fetch`] capability so the hosting
//! proxy (and the tests) control transport. The bundled [`HttpFetcher`]
//! is a blocking client with a fixed User-Agent and request timeout;
//! callers run each request's pipeline on its own worker so a stalled
//! fetch cannot block unrelated requests. Concurrent first-time requests
//! for one (URL, format) pair may both miss and both write; that race is
//! tolerated because encoding is deterministic, so the duplicate write is
//! content-equivalent.

use std::time::Duration;

use crate::cache::ImageCache;
use crate::error::TranscodeError;
use crate::imaging::{ImageTranscodeConfig, optimize_image};

/// User-Agent presented to origin servers on image fetches
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

/// Timeout imposed at the fetch boundary; the legacy-client audience is
/// latency sensitive and a hung origin must not hang the page
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Capability for retrieving remote image bytes
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TranscodeError>;
}

/// Blocking HTTP fetcher backed by a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, TranscodeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TranscodeError::Fetch(format!("client build error: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TranscodeError> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TranscodeError::Fetch(format!("{}: {}", url, e)))?;
        let bytes = response
            .bytes()
            .map_err(|e| TranscodeError::Fetch(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

/// Guess whether a URL names an image, by extension MIME type
pub fn is_image_url(url: &str) -> bool {
    // Drop query and fragment before extension sniffing
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

/// Outcome of a successful resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Localized reference of the form `/cached_image/<hash>.<ext>`
    Cached(String),
    /// Bytes that could not be transcoded, returned unmodified and
    /// deliberately not cached so a future request retries
    Passthrough(Vec<u8>),
}

/// Image transcoding front end bound to a cache, a config, and a fetcher
pub struct ImageResolver {
    cache: ImageCache,
    config: ImageTranscodeConfig,
    fetcher: Box<dyn Fetch>,
}

impl ImageResolver {
    pub fn new(cache: ImageCache, config: ImageTranscodeConfig, fetcher: Box<dyn Fetch>) -> Self {
        Self {
            cache,
            config,
            fetcher,
        }
    }

    /// Construct with the bundled blocking HTTP fetcher
    pub fn with_http_fetcher(
        cache: ImageCache,
        config: ImageTranscodeConfig,
    ) -> Result<Self, TranscodeError> {
        Ok(Self::new(cache, config, Box::new(HttpFetcher::new()?)))
    }

    pub fn config(&self) -> &ImageTranscodeConfig {
        &self.config
    }

    /// Resolve a source URL into a local cached reference
    ///
    /// Algorithm: cache-key lookup, then fetch (unless `prefetched` bytes
    /// were supplied), then decode/normalize/resize/dither/encode, then
    /// persist. Failure handling follows the degrade-to-original policy:
    ///
    /// - fetch failure -> `Err(Fetch)`, nothing cached
    /// - undecodable or unencodable image -> `Ok(Passthrough)`, nothing
    ///   cached (no negative caching; the URL is retried next time)
    /// - cache write failure -> `Err(Storage)`, request survives
    pub fn resolve(
        &self,
        url: &str,
        prefetched: Option<&[u8]>,
    ) -> Result<ImageOutcome, TranscodeError> {
        let key = ImageCache::key_for(url, self.config.cache_extension());
        if self.cache.contains(&key) {
            log::debug!("image cache hit: {}", url);
            return Ok(ImageOutcome::Cached(ImageCache::reference_for(&key)));
        }

        let original = match prefetched {
            Some(bytes) => bytes.to_vec(),
            None => self.fetcher.fetch(url).map_err(|e| {
                log::warn!("image fetch failed: {}", e);
                e
            })?,
        };

        let processed = if self.config.wants_processing() {
            match optimize_image(&original, &self.config) {
                Ok(bytes) => bytes,
                Err(err @ (TranscodeError::Decode(_) | TranscodeError::Encode(_))) => {
                    log::warn!("image not transcodable, passing through {}: {}", url, err);
                    return Ok(ImageOutcome::Passthrough(original));
                }
                Err(err) => return Err(err),
            }
        } else {
            original
        };

        self.cache.store(&key, &processed).map_err(|e| {
            log::warn!("image cache write failed for {}: {}", url, e);
            e
        })?;
        Ok(ImageOutcome::Cached(ImageCache::reference_for(&key)))
    }
}
