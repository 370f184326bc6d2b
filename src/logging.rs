//! Logger setup for the odometry binaries

use log::info;
use thiserror::Error;

pub use log::LevelFilter;

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(#[from] log::SetLoggerError),
}

/// Initialise the logger for this process.
///
/// Debug and trace lines include the log target. Must only be called once;
/// a second call returns [`LoggerInitError::FernInitError`].
pub fn logger_init(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{} {}] {}: {}",
                    stamp,
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{} {}] {}",
                    stamp,
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level)
        .chain(std::io::stdout())
        .apply()?;

    info!("Logging initialised at level {:?}", min_level);
    Ok(())
}

/// Parse a level name, falling back to `Info` for anything unrecognised
pub fn level_from_str(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

fn level_to_str(level: log::Level) -> &'static str {
    match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    }
}
