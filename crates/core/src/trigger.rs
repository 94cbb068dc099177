use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use log::trace;
use tokio::{runtime::Handle, time::Instant};
use tokio_util::sync::CancellationToken;

/// A one-shot deferred callback whose deadline can be pushed back.
///
/// The callback runs on the given runtime once `delay` has elapsed without
/// a call to [TimedTrigger::delay]. If `max_deferral` is set the deadline
/// is never pushed past `armed_at + max_deferral`. Dropping the trigger
/// before it fires cancels the callback.
pub struct TimedTrigger {
    deadline: Arc<Mutex<Instant>>,
    armed_at: Instant,
    delay: Duration,
    max_deferral: Option<Duration>,
    cancellation_token: CancellationToken,
}

impl TimedTrigger {
    pub fn new<F>(
        runtime: &Handle,
        delay: Duration,
        max_deferral: Option<Duration>,
        callback: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let armed_at = Instant::now();
        let deadline = Arc::new(Mutex::new(armed_at + delay));
        let cancellation_token = CancellationToken::new();

        let task_deadline = deadline.clone();
        let task_token = cancellation_token.clone();
        runtime.spawn(async move {
            loop {
                let current = *task_deadline.lock().expect("lock poison");
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep_until(current) => {}
                }

                // the deadline may have moved while we slept
                if *task_deadline.lock().expect("lock poison") <= Instant::now() {
                    break;
                }
            }
            callback();
        });

        Self {
            deadline,
            armed_at,
            delay,
            max_deferral,
            cancellation_token,
        }
    }

    /// Restarts the countdown from now.
    pub fn delay(&self) {
        let mut next = Instant::now() + self.delay;
        if let Some(max_deferral) = self.max_deferral {
            next = next.min(self.armed_at + max_deferral);
        }
        trace!("Trigger postponed by {:?}", self.delay);
        *self.deadline.lock().expect("lock poison") = next;
    }

    pub fn deadline(&self) -> Instant {
        *self.deadline.lock().expect("lock poison")
    }
}

impl Drop for TimedTrigger {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
