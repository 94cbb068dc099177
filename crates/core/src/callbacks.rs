use crate::storage::StorageKind;

/// Outcomes the store swallows instead of returning to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A storage medium failed its sentinel write/remove check and was
    /// replaced by the null backend for the rest of the process.
    ProbeFailed { kind: StorageKind, reason: String },
    /// The value persisted under `key` could not be parsed, the
    /// initializer's value is used instead.
    ParseFailed { key: String, reason: String },
    /// Writing `key` failed during a batched flush. The rest of the batch
    /// is still written.
    FlushFailed { key: String, reason: String },
    /// A batched flush finished.
    Flushed { written: usize, failed: usize },
}

/// Implement this to observe the store's otherwise silent degradation,
/// for example to forward it to a metrics pipeline.
pub trait StoreEventHandler: Send + Sync {
    fn on_event(&self, event: StoreEvent);
}
