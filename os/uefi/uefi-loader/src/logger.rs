//! # Console Logger
//!
//! A `log` facade backend that writes to the UEFI text console. The console
//! is a boot service, so the logger goes quiet the moment the loader starts
//! terminating them; records logged after that point are dropped rather than
//! risking a call into a dead service table.

use core::sync::atomic::{AtomicBool, Ordering};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

static BOOT_SERVICES_ACTIVE: AtomicBool = AtomicBool::new(true);

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Call once, before the first `ExitBootServices` attempt. Irreversible.
pub fn mark_boot_services_exited() {
    BOOT_SERVICES_ACTIVE.store(false, Ordering::Relaxed);
}

/// Installs the console logger. Call once during early init.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if BOOT_SERVICES_ACTIVE.load(Ordering::Relaxed) {
            uefi::println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        // console output is unbuffered
    }
}
