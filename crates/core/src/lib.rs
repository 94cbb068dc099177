//! Debounced persistent values.
//!
//! A [PersistentValue] keeps a typed value in memory and mirrors it into a
//! [StorageBackend]. Writes are never sent to storage directly: every value
//! changed within the debounce window of a [FlushScheduler] is written in one
//! batch once writes go quiet. Storage that turns out to be unusable, data
//! that no longer parses and failed writes all degrade silently; they are
//! logged and reported to an optional [StoreEventHandler].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use persistent_data_core::{
//!     FlushScheduler, MemoryStorage, StorageContext, StoreConfiguration, StringCodec,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), persistent_data_core::StoreError> {
//! let scheduler = FlushScheduler::new(StoreConfiguration::default())?;
//! let storage = StorageContext::new(scheduler).with_session_medium(Arc::new(MemoryStorage::new()));
//!
//! let session_id = storage.session_value("sid", || "fresh-id".to_owned(), StringCodec);
//! assert_eq!(session_id.value(), "fresh-id");
//! # Ok(())
//! # }
//! ```

mod callbacks;
mod config;
mod error;
pub mod logging;
mod scheduler;
pub mod storage;
mod trigger;
mod value;

pub use self::{
    callbacks::{StoreEvent, StoreEventHandler},
    config::{LogLevel, StoreConfiguration, SAVE_INTERVAL_MS},
    error::{CodecError, StorageError, StoreError},
    scheduler::FlushScheduler,
    storage::{
        AmbientCookies, CookieStorage, FileStorage, InMemoryCookies, MemoryStorage,
        StorageBackend, StorageContext, StorageKind, StorageMedium,
    },
    trigger::TimedTrigger,
    value::{FnCodec, JsonCodec, PersistentValue, StringCodec, ValueCodec},
};
