//! Captures the log records emitted on the current test thread.

use std::cell::RefCell;
use std::string::String;
use std::sync::Once;
use std::vec::Vec;

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let msg = std::format!("{}", record.args());
        RECORDS.with(|r| r.borrow_mut().push((record.level(), msg)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Start capturing on this thread, dropping anything captured before.
pub fn capture() {
    INIT.call_once(|| {
        // ignore a logger installed by the test harness
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Captured messages of `level` containing `pattern`.
pub fn matching(level: log::Level, pattern: &str) -> Vec<String> {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(pattern))
            .map(|(_, m)| m.clone())
            .collect()
    })
}
