use std::{io::Write, sync::Once};

use env_logger::{Builder, Env};
use log::LevelFilter;

use crate::config::LogLevel;

static INIT_LOG: Once = Once::new();

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// Installs the process logger. Only the first call has an effect, and
/// an already installed logger (e.g. from a test harness) is left alone.
/// A logger installed by the host after this call is rejected by `log`.
pub fn init_log(level: LogLevel) {
    INIT_LOG.call_once(|| {
        let env = Env::default();
        let mut builder = Builder::from_env(env);
        let _ = builder
            .is_test(cfg!(test))
            .format(|formatter, record| {
                writeln!(
                    formatter,
                    "[{}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .filter(None, level.into())
            .try_init();
    });
}

pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.into())
}
