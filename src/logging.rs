use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set the level and the target file. While the terminal is in raw mode
/// stderr is not usable, so messages append to a file instead; with no
/// file configured, logging is a no-op.
pub fn init(level: LogLevel, file: Option<PathBuf>) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    if let Ok(mut target) = LOG_FILE.lock() {
        *target = file;
    }
}

pub fn error(message: impl AsRef<str>) {
    log(LogLevel::Error, "error", message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    log(LogLevel::Warn, "warn", message.as_ref());
}

pub fn info(message: impl AsRef<str>) {
    log(LogLevel::Info, "info", message.as_ref());
}

pub fn debug(message: impl AsRef<str>) {
    log(LogLevel::Debug, "debug", message.as_ref());
}

fn log(level: LogLevel, label: &str, message: &str) {
    let current = LOG_LEVEL.load(Ordering::Relaxed);
    if current < level as u8 {
        return;
    }
    let Ok(target) = LOG_FILE.lock() else {
        return;
    };
    let Some(path) = target.as_ref() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(file, "{} [{}] {}", now, label, message);
    }
}
