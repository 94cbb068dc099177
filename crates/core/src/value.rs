use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex},
};

use log::{trace, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    callbacks::StoreEvent,
    error::{CodecError, StorageError},
    scheduler::{FlushScheduler, Flushable},
    storage::StorageBackend,
};

/// Converts values to and from their persisted string form.
///
/// `parse(serialize(v))` should give back a value equivalent to `v`,
/// otherwise values won't survive a restart.
pub trait ValueCodec<T>: Send + Sync {
    fn serialize(&self, value: &T) -> String;

    fn parse(&self, persisted: &str) -> Result<T, CodecError>;
}

/// Stores strings as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl ValueCodec<String> for StringCodec {
    fn serialize(&self, value: &String) -> String {
        value.clone()
    }

    fn parse(&self, persisted: &str) -> Result<String, CodecError> {
        Ok(persisted.to_owned())
    }
}

/// Stores any serde type as JSON.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> String {
        // serializing plain data into a String can't fail, a custom
        // Serialize impl that errors gets persisted as null
        serde_json::to_string(value).unwrap_or_else(|e| {
            warn!("Failed to serialize value: {e}");
            "null".to_owned()
        })
    }

    fn parse(&self, persisted: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(persisted)?)
    }
}

/// A codec made from a pair of closures.
pub struct FnCodec<S, P> {
    serialize: S,
    parse: P,
}

impl<S, P> FnCodec<S, P> {
    pub fn new(serialize: S, parse: P) -> Self {
        Self { serialize, parse }
    }
}

impl<T, S, P, E> ValueCodec<T> for FnCodec<S, P>
where
    S: Fn(&T) -> String + Send + Sync,
    P: Fn(&str) -> Result<T, E> + Send + Sync,
    E: fmt::Display,
{
    fn serialize(&self, value: &T) -> String {
        (self.serialize)(value)
    }

    fn parse(&self, persisted: &str) -> Result<T, CodecError> {
        (self.parse)(persisted).map_err(CodecError::parse)
    }
}

/// A typed value mirrored into a storage backend.
///
/// Reads are served from memory. Writes update memory right away and mark
/// the value dirty with its [FlushScheduler], which writes the latest value
/// to storage once writes have been quiet for the debounce window.
///
/// Cloning is cheap and clones share the same value.
pub struct PersistentValue<T> {
    cell: Arc<ValueCell<T>>,
    scheduler: FlushScheduler,
}

struct ValueCell<T> {
    id: u64,
    key: String,
    value: Mutex<T>,
    codec: Box<dyn ValueCodec<T>>,
    backend: StorageBackend,
}

impl<T> Flushable for ValueCell<T>
where
    T: Send + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn is_persisted(&self) -> bool {
        !self.backend.is_null()
    }

    fn save(&self) -> Result<(), StorageError> {
        let serialized = {
            let value = self.value.lock().expect("lock poison");
            self.codec.serialize(&*value)
        };
        trace!("Saving {} to {} storage", self.key, self.backend.kind());
        self.backend.set(&self.key, &serialized)
    }
}

impl<T> PersistentValue<T>
where
    T: Clone + Send + 'static,
{
    /// Loads `key` from `backend`.
    ///
    /// When nothing is stored, `missing_value_initializer` provides the value
    /// and it is scheduled for persisting. When the stored value doesn't
    /// parse the initializer's value is used as well, but only written back
    /// if the scheduler is configured with `rewrite_on_parse_failure`.
    pub fn new<I, C>(
        key: impl Into<String>,
        missing_value_initializer: I,
        codec: C,
        backend: StorageBackend,
        scheduler: &FlushScheduler,
    ) -> Self
    where
        I: FnOnce() -> T,
        C: ValueCodec<T> + 'static,
    {
        let key = key.into();
        let persisted = backend.get(&key).filter(|persisted| !persisted.is_empty());

        let (value, needs_save) = match persisted {
            None => (missing_value_initializer(), true),
            Some(persisted) => match codec.parse(&persisted) {
                Ok(value) => (value, false),
                Err(e) => {
                    warn!("Discarding unparseable value for {key}: {e}");
                    scheduler.emit(StoreEvent::ParseFailed {
                        key: key.clone(),
                        reason: e.to_string(),
                    });
                    (
                        missing_value_initializer(),
                        scheduler.config().rewrite_on_parse_failure,
                    )
                }
            },
        };

        let this = Self {
            cell: Arc::new(ValueCell {
                id: scheduler.next_id(),
                key,
                value: Mutex::new(value),
                codec: Box::new(codec),
                backend,
            }),
            scheduler: scheduler.clone(),
        };

        if needs_save {
            this.schedule();
        }
        this
    }

    pub fn value(&self) -> T {
        self.cell.value.lock().expect("lock poison").clone()
    }

    pub fn set_value(&self, value: T) -> T {
        *self.cell.value.lock().expect("lock poison") = value.clone();
        self.schedule();
        value
    }

    fn schedule(&self) {
        self.scheduler.schedule(self.cell.id, self.cell.clone());
    }
}

impl<T> PersistentValue<T> {
    /// Reads the value without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.cell.value.lock().expect("lock poison");
        f(&*value)
    }

    pub fn is_persisted(&self) -> bool {
        !self.cell.backend.is_null()
    }

    pub fn key(&self) -> &str {
        &self.cell.key
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.cell.backend
    }
}

impl<T> Clone for PersistentValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentValue")
            .field("key", &self.cell.key)
            .field("value", &*self.cell.value.lock().expect("lock poison"))
            .field("backend", &self.cell.backend)
            .finish()
    }
}
