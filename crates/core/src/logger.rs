// Session log shared by the core and the host runtime. The render host
// gives us no console, so lines are buffered and appended to a per-session
// file in the plugin data directory. The host tears the plugin down without
// notice, so anything above info level hits the disk immediately.
use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Info lines ride along once this many have accumulated.
const FLUSH_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Info => "",
            Level::Warn => "WARN: ",
            Level::Error => "ERROR: ",
            Level::Fatal => "FATAL: ",
        }
    }
}

pub struct SessionLogger {
    buffer: Mutex<Vec<String>>,
    log_path: PathBuf,
    log_dir: PathBuf,
    retention_count: usize,
    app_name: String,
}

impl SessionLogger {
    pub fn new(log_dir: PathBuf, app_name: &str, retention_count: usize) -> Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{}_{}.log", app_name, timestamp));

        let logger = Self {
            buffer: Mutex::new(Vec::new()),
            log_path,
            log_dir,
            retention_count,
            app_name: app_name.to_string(),
        };

        logger.clean_old_logs()?;
        logger.log(Level::Info, format!("=== {} Session Started ===", app_name));

        Ok(logger)
    }

    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{}] {}{}", timestamp, level.prefix(), message.as_ref());

        let pending = {
            let Ok(mut buffer) = self.buffer.lock() else {
                return;
            };
            buffer.push(line);
            buffer.len()
        };

        if level >= Level::Warn || pending >= FLUSH_THRESHOLD {
            let _ = self.flush_to_disk();
        }
    }

    fn clean_old_logs(&self) -> Result<()> {
        let prefix = format!("{}_", self.app_name);
        let mut logs: Vec<(PathBuf, std::time::SystemTime)> = fs::read_dir(&self.log_dir)?
            .flatten()
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(&prefix) && name.ends_with(".log")
            })
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((entry.path(), modified))
            })
            .collect();

        // Newest first, drop everything past the retention count
        logs.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in logs.iter().skip(self.retention_count) {
            let _ = fs::remove_file(path);
        }

        Ok(())
    }

    pub fn flush_to_disk(&self) -> Result<()> {
        let Ok(mut buffer) = self.buffer.lock() else {
            return Ok(());
        };
        if buffer.is_empty() {
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        for line in buffer.iter() {
            writeln!(file, "{}", line)?;
        }

        file.flush()?;
        buffer.clear();
        Ok(())
    }

    pub fn finalize(&self) -> Result<()> {
        self.log(Level::Info, format!("=== {} Session Ended ===", self.app_name));
        self.flush_to_disk()
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}

static LOGGER: once_cell::sync::OnceCell<SessionLogger> = once_cell::sync::OnceCell::new();

pub fn init_logger(log_dir: PathBuf, app_name: &str, retention_count: usize) -> Result<()> {
    let logger = SessionLogger::new(log_dir, app_name, retention_count)?;
    LOGGER
        .set(logger)
        .map_err(|_| anyhow::anyhow!("Logger already initialized"))?;
    Ok(())
}

/// Backend for the `log_*!` macros. A no-op until `init_logger` runs.
pub fn emit(level: Level, message: String) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, message);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Info, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Warn, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Error, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Fatal, format!($($arg)*))
    };
}
