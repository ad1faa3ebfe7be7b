//! Extension trait for [`Cache`] with typed convenience methods.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Cache, CacheError};

/// Typed convenience methods for [`Cache`].
///
/// Implemented as default methods on an extension trait so that:
///
/// - [`Cache`] stays object-safe and byte-oriented
/// - Implementors only need to handle raw bytes
/// - Callers get JSON access to any cache via a blanket impl
///
/// # Example
///
/// ```
/// use folio_cache::{CacheExt, MemoryCache};
///
/// let cache = MemoryCache::new();
/// cache.set_json("folders:all", &vec!["notes"], None).unwrap();
/// let folders: Option<Vec<String>> = cache.get_json("folders:all").unwrap();
/// assert_eq!(folders, Some(vec!["notes".to_owned()]));
/// ```
pub trait CacheExt: Cache {
    /// Retrieve a JSON-deserialized value.
    ///
    /// A stored value that no longer decodes is reported as
    /// [`CacheError::Serialization`].
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a value as JSON.
    fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes, ttl)
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryCache, NullCache};

    #[test]
    fn test_json_round_trip() {
        let cache = MemoryCache::new();

        cache.set_json("k", &("a", 1), None).unwrap();

        let value: Option<(String, u32)> = cache.get_json("k").unwrap();
        assert_eq!(value, Some(("a".to_owned(), 1)));
    }

    #[test]
    fn test_undecodable_value_is_error() {
        let cache = MemoryCache::new();
        cache.set("k", b"not json", None).unwrap();

        let err = cache.get_json::<Vec<String>>("k").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_works_through_trait_object() {
        let cache: Box<dyn Cache> = Box::new(NullCache);

        cache.set_json("k", &1, None).unwrap();
        assert_eq!(cache.get_json::<u32>("k").unwrap(), None);
    }
}
