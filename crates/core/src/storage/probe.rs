use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use super::{AmbientCookies, CookieStorage, StorageBackend, StorageKind, StorageMedium};
use crate::{
    callbacks::StoreEvent,
    error::StorageError,
    scheduler::FlushScheduler,
    value::{PersistentValue, ValueCodec},
};

/// Sentinel key written and removed to check a medium works.
pub const PROBE_KEY: &str = "__storage_test__";

/// Checks that `medium` accepts a write and a delete, handing it back if so.
pub fn probe(medium: Arc<dyn StorageMedium>) -> Result<Arc<dyn StorageMedium>, StorageError> {
    medium.set_item(PROBE_KEY, PROBE_KEY)?;
    medium.remove_item(PROBE_KEY)?;
    Ok(medium)
}

/// The storage available to a process.
///
/// Holds the host's session and durable media, each probed the first time
/// it is asked for. The outcome is kept for the lifetime of the context: a
/// medium that failed its probe stays [StorageBackend::Null], it is never
/// probed again.
pub struct StorageContext {
    scheduler: FlushScheduler,
    session_medium: Option<Arc<dyn StorageMedium>>,
    durable_medium: Option<Arc<dyn StorageMedium>>,
    cookies: Option<Arc<dyn AmbientCookies>>,
    session: OnceLock<StorageBackend>,
    durable: OnceLock<StorageBackend>,
}

impl StorageContext {
    /// A context without any media, every backend it hands out is null
    /// until media are added.
    pub fn new(scheduler: FlushScheduler) -> Self {
        Self {
            scheduler,
            session_medium: None,
            durable_medium: None,
            cookies: None,
            session: OnceLock::new(),
            durable: OnceLock::new(),
        }
    }

    pub fn with_session_medium(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.session_medium = Some(medium);
        self
    }

    pub fn with_durable_medium(mut self, medium: Arc<dyn StorageMedium>) -> Self {
        self.durable_medium = Some(medium);
        self
    }

    pub fn with_cookies(mut self, cookies: Arc<dyn AmbientCookies>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn scheduler(&self) -> &FlushScheduler {
        &self.scheduler
    }

    pub fn session_backend(&self) -> StorageBackend {
        self.session
            .get_or_init(|| self.resolve(StorageKind::Session, self.session_medium.clone()))
            .clone()
    }

    pub fn durable_backend(&self) -> StorageBackend {
        self.durable
            .get_or_init(|| self.resolve(StorageKind::Durable, self.durable_medium.clone()))
            .clone()
    }

    /// Cookies aren't probed, a rejected write surfaces when it is flushed.
    pub fn cookie_backend(&self, attributes: impl Into<String>) -> StorageBackend {
        match &self.cookies {
            Some(cookies) => StorageBackend::Cookie(CookieStorage::new(cookies.clone(), attributes)),
            None => StorageBackend::Null,
        }
    }

    pub fn session_value<T, I, C>(
        &self,
        key: impl Into<String>,
        missing_value_initializer: I,
        codec: C,
    ) -> PersistentValue<T>
    where
        T: Clone + Send + 'static,
        I: FnOnce() -> T,
        C: ValueCodec<T> + 'static,
    {
        PersistentValue::new(
            key,
            missing_value_initializer,
            codec,
            self.session_backend(),
            &self.scheduler,
        )
    }

    pub fn durable_value<T, I, C>(
        &self,
        key: impl Into<String>,
        missing_value_initializer: I,
        codec: C,
    ) -> PersistentValue<T>
    where
        T: Clone + Send + 'static,
        I: FnOnce() -> T,
        C: ValueCodec<T> + 'static,
    {
        PersistentValue::new(
            key,
            missing_value_initializer,
            codec,
            self.durable_backend(),
            &self.scheduler,
        )
    }

    pub fn cookie_value<T, I, C>(
        &self,
        key: impl Into<String>,
        missing_value_initializer: I,
        codec: C,
        attributes: impl Into<String>,
    ) -> PersistentValue<T>
    where
        T: Clone + Send + 'static,
        I: FnOnce() -> T,
        C: ValueCodec<T> + 'static,
    {
        PersistentValue::new(
            key,
            missing_value_initializer,
            codec,
            self.cookie_backend(attributes),
            &self.scheduler,
        )
    }

    fn resolve(&self, kind: StorageKind, medium: Option<Arc<dyn StorageMedium>>) -> StorageBackend {
        let Some(medium) = medium else {
            debug!("No {kind} storage configured, values will not be persisted");
            return StorageBackend::Null;
        };

        match probe(medium) {
            Ok(medium) if kind == StorageKind::Session => StorageBackend::Session(medium),
            Ok(medium) => StorageBackend::Durable(medium),
            Err(e) => {
                warn!("{kind} storage is unusable, values will not be persisted: {e}");
                self.scheduler.emit(StoreEvent::ProbeFailed {
                    kind,
                    reason: e.to_string(),
                });
                StorageBackend::Null
            }
        }
    }
}
