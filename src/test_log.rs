//! Captures log records per test thread.
//!
//! Tests run in parallel threads within one process, but a `log` logger is global. Records
//! are therefore buffered in a thread-local so each test only sees its own output.

use std::cell::RefCell;
use std::sync::Once;

/// A single captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: log::Level,
    pub message: String,
}

thread_local! {
    static ENTRIES: RefCell<Vec<LogEntry>> = const { RefCell::new(Vec::new()) };
}

struct ThreadCapture;

impl log::Log for ThreadCapture {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let entry = LogEntry {
            level: record.level(),
            message: format!("{}", record.args()),
        };
        ENTRIES.with(|entries| entries.borrow_mut().push(entry));
    }

    fn flush(&self) {}
}

static LOGGER: ThreadCapture = ThreadCapture;
static INSTALL: Once = Once::new();

/// Install the capturing logger (once per process) and clear this thread's buffer.
pub fn capture() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    ENTRIES.with(|entries| entries.borrow_mut().clear());
}

/// Drain everything this thread logged since [`capture`].
pub fn take() -> Vec<LogEntry> {
    ENTRIES.with(|entries| std::mem::take(&mut *entries.borrow_mut()))
}

/// Drain this thread's entries, keeping only errors.
pub fn take_errors() -> Vec<LogEntry> {
    take()
        .into_iter()
        .filter(|entry| entry.level == log::Level::Error)
        .collect()
}
