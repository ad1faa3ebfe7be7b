//! Cache abstraction layer for the Folio wiki.
//!
//! This crate provides a byte-level [`Cache`] trait that decouples cache
//! consumers from the cache server. Values are opaque bytes with an optional
//! time-to-live; bulk invalidation goes through glob-style key patterns.
//!
//! # Implementations
//!
//! - [`NullCache`]: disabled cache (always misses, every write succeeds)
//! - [`MemoryCache`]: in-process map with expiry, for tests and single-process use
//! - `RedisCache` in the `folio-cache-redis` crate
//!
//! Keys are built with the helpers in [`keys`].
//!
//! # Example
//!
//! ```
//! use folio_cache::{Cache, NullCache};
//!
//! let cache = NullCache;
//! cache.set("page:welcome", b"hello", None).unwrap();
//! assert_eq!(cache.get("page:welcome").unwrap(), None); // NullCache always misses
//! ```

mod ext;
pub mod keys;
mod memory;

use std::time::Duration;

pub use ext::CacheExt;
pub use memory::MemoryCache;

/// Error from a cache operation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache server failed or is unreachable.
    #[error("{backend} cache error")]
    Backend {
        /// Backend identifier (e.g., "Redis").
        backend: &'static str,
        /// Underlying client error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Key pattern is not a valid glob.
    #[error("invalid key pattern")]
    Pattern(#[from] glob::PatternError),

    /// Value could not be encoded or decoded.
    #[error("cache value serialization failed")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Wrap a client error from a cache server.
    pub fn backend(
        backend: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            backend,
            source: Box::new(source),
        }
    }
}

/// Key-value cache with expiry and pattern deletes.
///
/// Implementations must be safe to share between request threads.
pub trait Cache: Send + Sync {
    /// Retrieve a value. `Ok(None)` on miss or expiry.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value, replacing any existing entry.
    ///
    /// `ttl` of `None` keeps the entry until it is deleted.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove entries. Missing keys are ignored.
    fn delete(&self, keys: &[&str]) -> Result<(), CacheError>;

    /// Remove every entry whose key matches a glob pattern (`*`, `?`, `[...]`).
    ///
    /// Returns the number of entries removed.
    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError>;

    /// False for the disabled cache.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Disabled [`Cache`]: every lookup misses and every write succeeds.
///
/// Used when caching is turned off or the cache server was unreachable at
/// startup, so the system runs correctly but slower.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl Cache for NullCache {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&self, _keys: &[&str]) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete_matching(&self, _pattern: &str) -> Result<usize, CacheError> {
        Ok(0)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
