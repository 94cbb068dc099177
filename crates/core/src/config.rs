use std::{sync::Arc, time::Duration};

use crate::callbacks::{StoreEvent, StoreEventHandler};

/// Debounce window between the last write and the batched flush.
pub const SAVE_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Default, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Clone)]
pub struct StoreConfiguration {
    /// Quiet period after the most recent `set_value` before dirty values are flushed.
    pub debounce_ms: u64,
    /// Upper bound on how long continuous writes may postpone a flush,
    /// measured from the first write of a batch. `None` keeps extending forever.
    pub max_deferral_ms: Option<u64>,
    /// Write the initializer's value back when the persisted value fails to parse.
    pub rewrite_on_parse_failure: bool,
    /// Initial log level - defaults to [LogLevel::Info]
    pub log_level: LogLevel,
    /// Install the crate's `env_logger` when the first scheduler is created.
    /// Hosts that install their own logger afterwards should turn this off.
    pub install_logger: bool,
    /// Receives probe, parse and flush failures that are otherwise only logged.
    pub event_handler: Option<Arc<dyn StoreEventHandler>>,
}

impl StoreConfiguration {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_deferral(&self) -> Option<Duration> {
        self.max_deferral_ms.map(Duration::from_millis)
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_event(event);
        }
    }
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self {
            debounce_ms: SAVE_INTERVAL_MS,
            max_deferral_ms: None,
            rewrite_on_parse_failure: false,
            log_level: LogLevel::default(),
            install_logger: true,
            event_handler: None,
        }
    }
}

impl std::fmt::Debug for StoreConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfiguration")
            .field("debounce_ms", &self.debounce_ms)
            .field("max_deferral_ms", &self.max_deferral_ms)
            .field("rewrite_on_parse_failure", &self.rewrite_on_parse_failure)
            .field("log_level", &self.log_level)
            .field("install_logger", &self.install_logger)
            .field(
                "event_handler",
                &self.event_handler.is_some().then_some("..."),
            )
            .finish()
    }
}
