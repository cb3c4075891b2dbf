/*
================================================================================
                            tilesheet logging
================================================================================

Console logging goes through the `log` facade with an `env_logger` backend.
Every record from this crate is also copied into a small in-memory ring buffer
(last 1000 lines) so the panic hook can dump recent context next to the
backtrace.

**Log Levels**:
- `RUST_LOG` wins when set
- otherwise DEBUG in debug builds and INFO in release builds
- `--verbose` / `--quiet` on the command line override the default

**Panic log**: `<data dir>/tilesheet/logs/panic.log`
================================================================================
*/

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use backtrace::Backtrace;
use chrono::Utc;
use env_logger::fmt::Color;
use log::{Level, LevelFilter, Metadata, Record};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

const MAX_LOG_LINES: usize = 1000;
const LOG_TARGET: &str = "tilesheet";

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct BufferLogger {
    log_buffer: LogBuffer,
}

impl BufferLogger {
    fn new() -> Self {
        Self {
            log_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES))),
        }
    }

    fn log_to_buffer(&self, message: &str, target: &str, line: Option<u32>) {
        // A poisoned buffer only means a panic happened mid-push; keep logging
        let mut buffer = match self.log_buffer.lock() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buffer.len() == MAX_LOG_LINES {
            buffer.pop_front();
        }

        let formatted_message = match line {
            Some(line_num) => format!("{} {target}:{line_num} {message}", Utc::now().format("%H:%M:%S%.3f")),
            None => format!("{} {target} {message}", Utc::now().format("%H:%M:%S%.3f")),
        };
        buffer.push_back(formatted_message);
    }

    fn get_shared_buffer(&self) -> LogBuffer {
        Arc::clone(&self.log_buffer)
    }
}

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(LOG_TARGET) && metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{:<5} {}", record.level(), record.args());
            self.log_to_buffer(&message, record.target(), record.line());
        }
    }

    fn flush(&self) {}
}

struct CompositeLogger {
    console_logger: env_logger::Logger,
    buffer_logger: BufferLogger,
}

impl log::Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console_logger.enabled(metadata) || self.buffer_logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console_logger.enabled(record.metadata()) {
            self.console_logger.log(record);
        }
        if self.buffer_logger.enabled(record.metadata()) {
            self.buffer_logger.log(record);
        }
    }

    fn flush(&self) {
        self.console_logger.flush();
        self.buffer_logger.flush();
    }
}

fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. `level_override` comes from `--verbose`/`--quiet`
/// and is ignored when `RUST_LOG` is set.
pub fn setup_logger(level_override: Option<LevelFilter>) -> LogBuffer {
    let buffer_logger = BufferLogger::new();
    let shared_buffer = buffer_logger.get_shared_buffer();

    let mut builder = env_logger::Builder::new();
    builder.filter(None, LevelFilter::Off);
    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter(Some(LOG_TARGET), level_override.unwrap_or_else(default_level));
    }

    builder.format(|buf, record| {
        let mut style = buf.style();
        match record.level() {
            Level::Error => style.set_color(Color::Red),
            Level::Warn => style.set_color(Color::Yellow),
            Level::Info => style.set_color(Color::Green),
            Level::Debug => style.set_color(Color::Blue),
            Level::Trace => style.set_color(Color::White),
        };
        writeln!(buf, "{:<5} {}", style.value(record.level()), record.args())
    });

    let console_logger = builder.build();
    let composite_logger = CompositeLogger {
        console_logger,
        buffer_logger,
    };

    log::set_boxed_logger(Box::new(composite_logger)).expect("Failed to set logger");
    log::set_max_level(LevelFilter::Trace);

    shared_buffer
}

pub fn get_log_directory(app_name: &str) -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(app_name).join("logs")
}

/// Writes panic info, a backtrace and the buffered log lines to `panic.log`.
pub fn setup_panic_hook(app_name: &str, log_buffer: LogBuffer) {
    let log_file_path = get_log_directory(app_name).join("panic.log");
    if let Some(parent) = log_file_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Cannot create log directory {:?}, panic log disabled: {}", parent, e);
            return;
        }
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        default_hook(info);

        let Ok(mut file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_file_path)
        else {
            return;
        };

        let backtrace = Backtrace::new();
        let _ = writeln!(file, "Panic at {}: {}", Utc::now().to_rfc3339(), info);
        let _ = writeln!(file, "Backtrace:\n{:?}\n", backtrace);
        let _ = writeln!(file, "Last {} log entries:\n", MAX_LOG_LINES);

        let buffer = match log_buffer.lock() {
            Ok(buffer) => buffer,
            Err(poisoned) => poisoned.into_inner(),
        };
        for log in buffer.iter() {
            let _ = writeln!(file, "{}", log);
        }
        eprintln!("Panic details written to {:?}", log_file_path);
    }));
}
