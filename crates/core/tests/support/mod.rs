#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use persistent_data_core::{
    FlushScheduler, StorageError, StorageMedium, StoreConfiguration, StoreEvent,
    StoreEventHandler,
};

pub fn init_logging() {
    let _ = env_logger::builder()
        .parse_default_env()
        .is_test(true)
        .try_init();
}

/// Storage medium that remembers every write, optionally refusing some keys.
#[derive(Default)]
pub struct RecordingStorage {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_entry(key: &str, value: &str) -> Arc<Self> {
        Self::with_entries(&[(key, value)])
    }

    /// Pre-populated storage, the seeded entries don't count as writes.
    pub fn with_entries(entries: &[(&str, &str)]) -> Arc<Self> {
        let storage = Self::default();
        storage.entries.lock().unwrap().extend(
            entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        Arc::new(storage)
    }

    pub fn fail_writes_to(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_owned());
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl StorageMedium for RecordingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.stored(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
                needed: value.len(),
                quota: 0,
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_owned(), value.to_owned()));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct EventLog(Mutex<Vec<StoreEvent>>);

impl EventLog {
    pub fn events(&self) -> Vec<StoreEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StoreEvent::Flushed { written, failed } => Some((written, failed)),
                _ => None,
            })
            .collect()
    }
}

impl StoreEventHandler for EventLog {
    fn on_event(&self, event: StoreEvent) {
        self.0.lock().unwrap().push(event);
    }
}

/// A scheduler reporting into a fresh [EventLog].
pub fn new_scheduler_with(config: StoreConfiguration) -> (FlushScheduler, Arc<EventLog>) {
    init_logging();
    let events = Arc::new(EventLog::default());
    let scheduler = FlushScheduler::new(StoreConfiguration {
        event_handler: Some(events.clone()),
        ..config
    })
    .expect("inside a tokio runtime");
    (scheduler, events)
}

pub fn new_scheduler() -> (FlushScheduler, Arc<EventLog>) {
    new_scheduler_with(StoreConfiguration::default())
}
