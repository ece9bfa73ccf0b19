use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

const LOG_CAPACITY: usize = 200;

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct SharedLogger {
    level: LevelFilter,
    buffer: LogBuffer,
    echo_stderr: bool,
}

impl Log for SharedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_record(record);
        if self.echo_stderr {
            eprintln!("{}", line);
        }
        push_line(&self.buffer, line);
    }

    fn flush(&self) {}
}

/// `[LEVEL crate] message`, with the crate taken from the record target.
fn format_record(record: &Record) -> String {
    let source = record.target().split("::").next().unwrap_or_default();
    format!("[{} {}] {}", record.level(), source, record.args())
}

fn locked(buffer: &LogBuffer) -> MutexGuard<'_, VecDeque<String>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn push_line(buffer: &LogBuffer, line: String) {
    let mut lines = locked(buffer);
    if lines.len() >= LOG_CAPACITY {
        lines.pop_front();
    }
    lines.push_back(line);
}

static LOG_BUFFER: OnceLock<LogBuffer> = OnceLock::new();
static LOGGER: OnceLock<SharedLogger> = OnceLock::new();

fn parse_level(value: &str) -> LevelFilter {
    match value.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Install the logger. `OTODECKS_LOG` wins over `RUST_LOG`.
pub fn init() -> LogBuffer {
    let buffer = LOG_BUFFER
        .get_or_init(|| Arc::new(Mutex::new(VecDeque::with_capacity(LOG_CAPACITY))))
        .clone();

    let level = std::env::var("OTODECKS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(|value| parse_level(&value))
        .unwrap_or(LevelFilter::Info);

    let echo_stderr = std::env::var("OTODECKS_LOG_STDERR")
        .map(|value| value != "0")
        .unwrap_or(true);

    let logger = SharedLogger {
        level,
        buffer: buffer.clone(),
        echo_stderr,
    };

    let logger_ref = LOGGER.get_or_init(|| logger);
    if log::set_logger(logger_ref).is_ok() {
        log::set_max_level(level);
    }

    buffer
}

/// Most recent log line, shown next to the play status.
pub fn last_line(buffer: &LogBuffer) -> Option<String> {
    locked(buffer).back().cloned()
}
