// Logging bridge: `log` records are forwarded to the native runtime's logger.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::api::is_api_initialized;
use crate::ffi_dispatch;

/// Native log level constants.
pub const LOG_INFO: u8 = 0;
pub const LOG_WARNING: u8 = 1;
pub const LOG_ERROR: u8 = 2;

/// `log::Log` implementation that writes through the native logging table.
///
/// Records emitted before the API table is installed are dropped.
pub struct NativeLogger;

static LOGGER: NativeLogger = NativeLogger;

impl Log for NativeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) || !is_api_initialized() {
            return;
        }
        let msg = format!("{}", record.args());
        ffi_dispatch::logging_log(native_level(record.level()), &msg);
    }

    fn flush(&self) {}
}

fn native_level(level: Level) -> u8 {
    match level {
        Level::Error => LOG_ERROR,
        Level::Warn => LOG_WARNING,
        Level::Info | Level::Debug | Level::Trace => LOG_INFO,
    }
}

/// Install [`NativeLogger`] as the global logger.
///
/// Returns `false` if another logger was already installed; the existing
/// logger stays in place.
pub fn init(max_level: LevelFilter) -> bool {
    match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(max_level);
            true
        }
        Err(_) => false,
    }
}
