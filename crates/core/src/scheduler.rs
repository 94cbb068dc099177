use std::{
    collections::BTreeMap,
    fmt, mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use log::{debug, error, trace};
use tokio::runtime::Handle;

use crate::{
    callbacks::StoreEvent,
    config::StoreConfiguration,
    error::{StorageError, StoreError},
    logging::init_log,
    trigger::TimedTrigger,
};

/// Something the scheduler can write out on flush.
pub(crate) trait Flushable: Send + Sync {
    fn key(&self) -> &str;

    fn is_persisted(&self) -> bool;

    /// Serializes the current in-memory value and writes it to storage.
    fn save(&self) -> Result<(), StorageError>;
}

/// Coalesces writes from any number of persistent values into a single
/// debounced flush.
///
/// At most one flush is pending at any time. Every value dirtied before it
/// fires is written in the same batch, with whatever it holds at flush time.
/// Clones share the same pending state.
#[derive(Clone)]
pub struct FlushScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    runtime: Handle,
    config: StoreConfiguration,
    next_id: AtomicU64,
    state: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    /// Present while a flush is scheduled.
    runner: Option<TimedTrigger>,
    /// Dirty values keyed by their scheduler-assigned id.
    pending: BTreeMap<u64, Arc<dyn Flushable>>,
}

impl FlushScheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// Unless [StoreConfiguration::install_logger] is off, this installs the
    /// process-wide logger, see [init_log](crate::logging::init_log).
    pub fn new(config: StoreConfiguration) -> Result<Self, StoreError> {
        Ok(Self::with_runtime(Handle::try_current()?, config))
    }

    pub fn with_runtime(runtime: Handle, config: StoreConfiguration) -> Self {
        if config.install_logger {
            init_log(config.log_level);
        }
        debug!("Creating flush scheduler {config:?}");

        Self {
            inner: Arc::new(SchedulerInner {
                runtime,
                config,
                next_id: AtomicU64::new(0),
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfiguration {
        &self.inner.config
    }

    /// Number of values waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().expect("lock poison").pending.len()
    }

    /// Whether a flush is currently scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("lock poison")
            .runner
            .is_some()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        self.inner.config.emit(event)
    }

    /// Marks `instance` dirty, arming the flush trigger or pushing it back.
    pub(crate) fn schedule(&self, id: u64, instance: Arc<dyn Flushable>) {
        if !instance.is_persisted() {
            return;
        }

        let mut state = self.inner.state.lock().expect("lock poison");
        match &state.runner {
            Some(runner) => runner.delay(),
            None => {
                trace!("Arming flush for {}", instance.key());
                let inner = self.inner.clone();
                state.runner = Some(TimedTrigger::new(
                    &self.inner.runtime,
                    self.inner.config.debounce_window(),
                    self.inner.config.max_deferral(),
                    move || inner.flush(),
                ));
            }
        }
        state.pending.entry(id).or_insert(instance);
    }
}

impl SchedulerInner {
    fn flush(&self) {
        // values dirtied from here on belong to the next batch
        let batch = {
            let mut state = self.state.lock().expect("lock poison");
            state.runner = None;
            mem::take(&mut state.pending)
        };

        let mut written = 0;
        let mut failed = 0;
        for instance in batch.into_values() {
            match instance.save() {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    error!("Failed to persist {}: {e}", instance.key());
                    self.config.emit(StoreEvent::FlushFailed {
                        key: instance.key().to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!("Flushed {written} values, {failed} failed");
        self.config.emit(StoreEvent::Flushed { written, failed });
    }
}

impl fmt::Debug for FlushScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushScheduler")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_count())
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, time::Duration};

    use pretty_assertions::assert_eq;

    use super::*;

    struct Probe {
        key: String,
        persisted: bool,
        fail: bool,
        saves: AtomicUsize,
    }

    impl Probe {
        fn new(key: &str, persisted: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                key: key.to_owned(),
                persisted,
                fail,
                saves: AtomicUsize::new(0),
            })
        }

        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    impl Flushable for Probe {
        fn key(&self) -> &str {
            &self.key
        }

        fn is_persisted(&self) -> bool {
            self.persisted
        }

        fn save(&self) -> Result<(), StorageError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StorageError::Unavailable {
                    reason: "test".to_owned(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn requires_runtime() {
        let err = FlushScheduler::new(StoreConfiguration::default()).unwrap_err();
        assert!(matches!(err, StoreError::NoRuntime { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn unpersisted_instances_are_ignored() {
        let scheduler = FlushScheduler::new(StoreConfiguration::default()).unwrap();
        let probe = Probe::new("k", false, false);

        scheduler.schedule(scheduler.next_id(), probe.clone());

        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn dirty_set_is_unique() {
        let scheduler = FlushScheduler::new(StoreConfiguration::default()).unwrap();
        let probe = Probe::new("k", true, false);
        let id = scheduler.next_id();

        scheduler.schedule(id, probe.clone());
        scheduler.schedule(id, probe.clone());
        assert_eq!(scheduler.pending_count(), 1);
        assert!(scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(probe.saves(), 1);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_save_does_not_block_batch() {
        let scheduler = FlushScheduler::new(StoreConfiguration::default()).unwrap();
        let first = Probe::new("first", true, false);
        let broken = Probe::new("broken", true, true);
        let last = Probe::new("last", true, false);

        scheduler.schedule(scheduler.next_id(), first.clone());
        scheduler.schedule(scheduler.next_id(), broken.clone());
        scheduler.schedule(scheduler.next_id(), last.clone());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(
            (first.saves(), broken.saves(), last.saves()),
            (1, 1, 1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rearms_after_flush() {
        let scheduler = FlushScheduler::new(StoreConfiguration::default()).unwrap();
        let probe = Probe::new("k", true, false);
        let id = scheduler.next_id();

        scheduler.schedule(id, probe.clone());
        tokio::time::sleep(Duration::from_millis(101)).await;
        scheduler.schedule(id, probe.clone());
        assert!(scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(probe.saves(), 2);
    }
}
