//! Store composition from configuration.

use std::sync::Arc;

use folio_cache_redis::RedisCache;
use folio_config::{Config, ConfigError, StorageMode};
use folio_storage::{StorageError, Store};
use folio_storage_fs::LocalStore;
use folio_storage_github::{GitHubSettings, GitHubStore};

use crate::cache::DocumentCache;
use crate::cached::CachedStore;
use crate::dual::DualWriteStore;

/// Error opening the configured store.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The configuration lacks what the storage mode needs.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A backend could not be reached.
    #[error("Failed to open {mode:?} storage")]
    Storage {
        /// Configured mode.
        mode: StorageMode,
        /// Backend error.
        #[source]
        source: StorageError,
    },
}

/// Connect the document cache, or fall back to a disabled one.
///
/// An unreachable cache server is not fatal: the store runs uncached.
#[must_use]
pub fn open_cache(config: &Config) -> DocumentCache {
    if !config.redis.enabled {
        tracing::debug!("Redis disabled, running without cache");
        return DocumentCache::disabled();
    }
    match RedisCache::connect(&config.redis_url()) {
        Ok(cache) => {
            tracing::info!(address = %config.redis.address, "Connected to cache");
            DocumentCache::new(Arc::new(cache), config.redis.ttl())
        }
        Err(e) => {
            tracing::warn!(
                address = %config.redis.address,
                error = %e,
                "Cache unavailable, running without cache"
            );
            DocumentCache::disabled()
        }
    }
}

fn github_store(config: &Config) -> Result<GitHubStore, OpenError> {
    let github = config.require_github()?;
    let settings = GitHubSettings {
        token: github.token.clone(),
        owner: github.owner.clone(),
        repository: github.repository.clone(),
        branch: github.branch.clone(),
        api_url: github.api_url.clone(),
    };
    GitHubStore::connect(settings).map_err(|source| OpenError::Storage {
        mode: config.storage_mode,
        source,
    })
}

/// Build the store for the configured storage mode.
///
/// | Mode | Store |
/// |------|-------|
/// | `local` | [`LocalStore`], cached when Redis is enabled |
/// | `github` | [`CachedStore`] over [`GitHubStore`] |
/// | `dual` | [`DualWriteStore`] of [`LocalStore`] and a cached [`GitHubStore`] |
///
/// The store is built once at startup and handed to every consumer.
///
/// # Errors
///
/// Returns [`OpenError::Config`] when the `[github]` section is missing or
/// invalid, and [`OpenError::Storage`] when GitHub rejects the credentials or
/// the branch does not exist.
pub fn open_store(config: &Config) -> Result<Box<dyn Store>, OpenError> {
    let data_dir = config.local_resolved.data_dir.clone();

    let store: Box<dyn Store> = match config.storage_mode {
        StorageMode::Local => {
            let local = LocalStore::new(data_dir);
            if config.redis.enabled {
                Box::new(CachedStore::new(local, open_cache(config)))
            } else {
                Box::new(local)
            }
        }
        StorageMode::GitHub => Box::new(CachedStore::new(github_store(config)?, open_cache(config))),
        StorageMode::Dual => {
            let remote = CachedStore::new(github_store(config)?, open_cache(config));
            Box::new(DualWriteStore::new(LocalStore::new(data_dir), remote))
        }
    };

    tracing::info!(mode = ?config.storage_mode, "Opened store");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use folio_storage::Document;
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(dir: &Path, content: &str) -> Config {
        let path = dir.join("folio.toml");
        std::fs::write(&path, content).unwrap();
        Config::load(Some(path.as_path())).unwrap()
    }

    #[test]
    fn test_local_without_redis() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(
            dir.path(),
            "storage_mode = \"local\"\n[local]\ndata_dir = \"data\"\n[redis]\nenabled = false\n",
        );

        let store = open_store(&config).unwrap();
        store.create_document(&Document::new("hello", "world")).unwrap();

        assert_eq!(store.get_document("hello").unwrap().content(), "world");
        assert!(dir.path().join("data/hello.txt").exists());
    }

    #[test]
    fn test_unreachable_redis_falls_back_to_disabled_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(
            dir.path(),
            "[local]\ndata_dir = \"data\"\n[redis]\nenabled = true\naddress = \"127.0.0.1:1\"\n",
        );

        assert!(!open_cache(&config).is_enabled());

        let store = open_store(&config).unwrap();
        store.create_folder("notes").unwrap();
        assert_eq!(store.list_folders().unwrap(), vec!["notes"]);
    }

    #[test]
    fn test_github_mode_requires_section() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_config(dir.path(), "[redis]\nenabled = false\n");
        config.storage_mode = StorageMode::GitHub;

        let err = open_store(&config).err().unwrap();

        assert!(matches!(err, OpenError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_disabled_redis_yields_disabled_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "[redis]\nenabled = false\n");

        assert!(!open_cache(&config).is_enabled());
    }
}
