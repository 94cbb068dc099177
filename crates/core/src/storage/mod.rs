//! Storage media and the backends persistent values write through.
//!
//! A [StorageMedium] is the raw key-value capability supplied by the host
//! (session scoped, origin scoped, ...). A [StorageBackend] is what a
//! [PersistentValue](crate::PersistentValue) actually holds: one of the
//! probed media, the ambient cookie string, or [StorageBackend::Null] when
//! nothing usable is available.

mod cookie;
mod file;
mod memory;
mod probe;

use std::{fmt, sync::Arc};

use log::warn;

pub use self::{
    cookie::{AmbientCookies, CookieStorage, InMemoryCookies},
    file::FileStorage,
    memory::MemoryStorage,
    probe::{probe, StorageContext, PROBE_KEY},
};
use crate::error::StorageError;

/// A host provided key-value store.
///
/// Implementations may fail on any call, e.g. when a quota is exhausted or
/// the host refuses storage access altogether.
pub trait StorageMedium: Send + Sync {
    /// Gets the value for the given key, or None if not found
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Sets the value for the given key
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the entry for the given key
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Lives as long as the current session.
    Session,
    /// Survives across sessions.
    Durable,
    /// Written into the ambient cookie string.
    Cookie,
    /// Nothing is persisted.
    Null,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Session => f.write_str("session"),
            StorageKind::Durable => f.write_str("durable"),
            StorageKind::Cookie => f.write_str("cookie"),
            StorageKind::Null => f.write_str("null"),
        }
    }
}

/// The storage a persistent value reads from and flushes to.
#[derive(Clone)]
pub enum StorageBackend {
    Session(Arc<dyn StorageMedium>),
    Durable(Arc<dyn StorageMedium>),
    Cookie(CookieStorage),
    Null,
}

impl StorageBackend {
    pub fn kind(&self) -> StorageKind {
        match self {
            StorageBackend::Session(_) => StorageKind::Session,
            StorageBackend::Durable(_) => StorageKind::Durable,
            StorageBackend::Cookie(_) => StorageKind::Cookie,
            StorageBackend::Null => StorageKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StorageBackend::Null)
    }

    /// Reads `key`. A medium that fails to read is treated as not having the key.
    pub fn get(&self, key: &str) -> Option<String> {
        let result = match self {
            StorageBackend::Session(medium) | StorageBackend::Durable(medium) => {
                medium.get_item(key)
            }
            StorageBackend::Cookie(cookies) => Ok(cookies.get_item(key)),
            StorageBackend::Null => Ok(None),
        };

        result.unwrap_or_else(|e| {
            warn!("Failed to read {key} from {} storage: {e}", self.kind());
            None
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            StorageBackend::Session(medium) | StorageBackend::Durable(medium) => {
                medium.set_item(key, value)
            }
            StorageBackend::Cookie(cookies) => cookies.set_item(key, value),
            StorageBackend::Null => Ok(()),
        }
    }
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Cookie(cookies) => f
                .debug_tuple("Cookie")
                .field(&cookies.attributes())
                .finish(),
            other => f.write_str(match other.kind() {
                StorageKind::Session => "Session(..)",
                StorageKind::Durable => "Durable(..)",
                _ => "Null",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn null_backend_reads_nothing_and_accepts_writes() {
        let backend = StorageBackend::Null;
        assert!(backend.is_null());
        assert!(backend.set("k", "v").is_ok());
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn backends_sharing_a_medium_keep_distinct_keys() {
        let medium: Arc<dyn StorageMedium> = Arc::new(MemoryStorage::new());
        let a = StorageBackend::Durable(medium.clone());
        let b = StorageBackend::Durable(medium);

        a.set("a", "1").unwrap();
        b.set("b", "2").unwrap();

        assert_eq!(a.get("b").as_deref(), Some("2"));
        assert_eq!(b.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn failing_reads_are_absent() {
        let backend = StorageBackend::Session(Arc::new(MemoryStorage::unavailable()));
        assert_eq!(backend.get("anything"), None);
        assert!(backend.set("anything", "x").is_err());
    }

    #[test]
    fn debug_hides_medium() {
        let backend = StorageBackend::Session(Arc::new(MemoryStorage::new()));
        assert_eq!(format!("{backend:?}"), "Session(..)");
        assert_eq!(format!("{:?}", StorageBackend::Null), "Null");
        assert_eq!(StorageKind::Cookie.to_string(), "cookie");
    }
}
