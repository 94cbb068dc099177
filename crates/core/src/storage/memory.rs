use std::{collections::HashMap, sync::Mutex};

use super::StorageMedium;
use crate::error::StorageError;

/// A volatile medium that lives as long as the process, the natural
/// session-scoped medium for a native host.
///
/// It can be configured to refuse all access ([MemoryStorage::unavailable])
/// or to enforce a byte quota ([MemoryStorage::with_quota]), which mirrors
/// how browser storage behaves in private mode or when full.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    available: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::default(),
            quota: None,
            available: true,
        }
    }

    /// A medium on which every operation fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Limits the summed length of all keys and values to `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poison").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                reason: "storage access is disabled".to_owned(),
            })
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMedium for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.entries.lock().expect("lock poison").get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut entries = self.entries.lock().expect("lock poison");

        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.entries.lock().expect("lock poison").remove(key);
        Ok(())
    }
}
