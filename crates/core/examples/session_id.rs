//! Keeps a client session id in session storage and user preferences in a
//! file, the same way an application would at startup.
//!
//! Run twice with the same directory to see the preferences survive:
//! `cargo run --example session_id -- /tmp/session-demo`

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use log::info;
use persistent_data_core::{
    FileStorage, FlushScheduler, JsonCodec, LogLevel, MemoryStorage, StorageContext,
    StoreConfiguration, StoreError, StringCodec,
};

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("persistent-data-demo"));

    let scheduler = FlushScheduler::new(StoreConfiguration {
        log_level: LogLevel::Debug,
        ..Default::default()
    })?;
    let storage = StorageContext::new(scheduler.clone())
        .with_session_medium(Arc::new(MemoryStorage::new()))
        .with_durable_medium(Arc::new(FileStorage::open(dir.join("durable.json"))?));

    let session_id = storage.session_value(
        "alcsid",
        || uuid::Uuid::new_v4().to_string(),
        StringCodec,
    );
    info!("Session id {}", session_id.value());

    let launches = storage.durable_value("launches", || 0u64, JsonCodec::new());
    let count = launches.set_value(launches.value() + 1);
    info!("Launched {count} times");

    // give the debounced flush a chance to run before exiting
    tokio::time::sleep(Duration::from_millis(scheduler.config().debounce_ms * 2)).await;
    Ok(())
}
