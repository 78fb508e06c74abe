mod config;
mod error;
mod format;
mod install;
mod level;
mod timer;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::{LoggerFormat, LoggerTimeZone};
pub use level::LoggerLevel;
pub use timer::LogTimer;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// With [`LoggerTimeZone::Local`] the offset is detected here, so call this
/// before any runtime threads are started; detection fails once the process is
/// multi-threaded and timestamps then fall back to UTC.
///
/// ```rust
/// use solo_observe::{LoggerConfig, init_logger};
///
/// let cfg = LoggerConfig::default();
/// init_logger(&cfg).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let timer = LogTimer::for_zone(cfg.tz);
    match cfg.format {
        LoggerFormat::Text => install::text(cfg, timer),
        LoggerFormat::Json => install::json(cfg, timer),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
