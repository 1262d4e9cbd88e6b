use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Global logger instance
static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Log file configuration
const LOG_FILE_MAX_SIZE: u64 = 1024 * 1024; // 1MB
const LOG_FILE_MAX_COUNT: usize = 5;
const LOG_FILE_NAME: &str = "ladder.log";

/// Severity of a log message. Declaration order is also filter order:
/// a logger set to `Warn` lets `Fatal`, `Error` and `Warn` through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Fatal => write!(f, "[FATAL]"),
            Severity::Error => write!(f, "[ERROR]"),
            Severity::Warn => write!(f, "[WARN]"),
            Severity::Info => write!(f, "[INFO]"),
            Severity::Debug => write!(f, "[DEBUG]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: Severity,
    pub msg: String,
}

impl LogMessage {
    pub fn new(level: Severity, msg: String) -> Self {
        LogMessage { level, msg }
    }
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.level, self.msg)
    }
}

/// File-based log writer with rotation
#[derive(Debug)]
pub struct LogFileWriter {
    log_dir: PathBuf,
    current_file: Option<File>,
    current_size: u64,
}

impl LogFileWriter {
    pub fn new() -> io::Result<Self> {
        Self::in_dir(Self::default_log_directory())
    }

    pub fn in_dir(log_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&log_dir)?;
        Ok(LogFileWriter {
            log_dir,
            current_file: None,
            current_size: 0,
        })
    }

    fn default_log_directory() -> PathBuf {
        let mut path = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        path.push("ladder");
        path.push("logs");
        path
    }

    fn current_log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    fn archive_path(&self, n: usize) -> PathBuf {
        self.log_dir.join(format!("{}.{}", LOG_FILE_NAME, n))
    }

    /// Shifts `ladder.log.N` to `.N+1`, dropping the oldest archive, then
    /// archives the live file as `.1`.
    fn rotate(&mut self) -> io::Result<()> {
        self.current_file = None;
        self.current_size = 0;

        let oldest = self.archive_path(LOG_FILE_MAX_COUNT - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..LOG_FILE_MAX_COUNT - 1).rev() {
            let from = self.archive_path(n);
            if from.exists() {
                fs::rename(&from, self.archive_path(n + 1))?;
            }
        }
        let live = self.current_log_path();
        if live.exists() {
            fs::rename(&live, self.archive_path(1))?;
        }
        Ok(())
    }

    fn ensure_file_open(&mut self) -> io::Result<()> {
        if self.current_file.is_none() {
            let path = self.current_log_path();
            self.current_file = Some(OpenOptions::new().create(true).append(true).open(&path)?);
            if let Ok(metadata) = fs::metadata(&path) {
                self.current_size = metadata.len();
            }
        }
        Ok(())
    }

    pub fn write_log(&mut self, log_msg: &LogMessage) -> io::Result<()> {
        self.ensure_file_open()?;

        let formatted_log = format!("{}\n", log_msg);
        let log_bytes = formatted_log.as_bytes();

        if self.current_size + log_bytes.len() as u64 > LOG_FILE_MAX_SIZE {
            self.rotate()?;
            self.ensure_file_open()?;
        }

        if let Some(ref mut file) = self.current_file {
            file.write_all(log_bytes)?;
            file.flush()?;
            self.current_size += log_bytes.len() as u64;
        }

        Ok(())
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.current_log_path()
    }
}

/// Logger operating mode
#[derive(Debug, Clone)]
pub enum LoggerMode {
    /// Terminal only
    Standalone,
    /// Forward every message through a channel (host applications, tests)
    Embedded(Sender<LogMessage>),
    /// Rotating log file only
    File,
    /// File and terminal
    Full,
    /// Drop everything
    Silent,
}

pub struct Logger {
    mode: Mutex<LoggerMode>,
    level: Mutex<Severity>,
    file_writer: Mutex<Option<LogFileWriter>>,
}

fn open_file_writer() -> Option<LogFileWriter> {
    match LogFileWriter::new() {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!("Failed to create log file writer: {}", e);
            None
        }
    }
}

fn write_to_terminal(log_msg: &LogMessage) {
    match log_msg.level {
        Severity::Fatal | Severity::Error => {
            eprintln!("{}", log_msg);
            let _ = std::io::stderr().flush();
        }
        _ => {
            println!("{}", log_msg);
            let _ = std::io::stdout().flush();
        }
    }
}

impl Logger {
    pub fn with_mode(mode: LoggerMode, level: Severity) -> Self {
        let file_writer = match mode {
            LoggerMode::File | LoggerMode::Full => open_file_writer(),
            _ => None,
        };
        Logger {
            mode: Mutex::new(mode),
            level: Mutex::new(level),
            file_writer: Mutex::new(file_writer),
        }
    }

    pub fn new_standalone() -> Self {
        Logger::with_mode(LoggerMode::Standalone, Severity::Warn)
    }

    pub fn new_embedded(sender: Sender<LogMessage>) -> Self {
        Logger::with_mode(LoggerMode::Embedded(sender), Severity::Debug)
    }

    pub fn set_mode(&self, mode: LoggerMode) {
        let needs_file = matches!(mode, LoggerMode::File | LoggerMode::Full);
        if let Ok(mut current) = self.mode.lock() {
            *current = mode;
        }
        if needs_file {
            if let Ok(mut file_writer) = self.file_writer.lock() {
                if file_writer.is_none() {
                    *file_writer = open_file_writer();
                }
            }
        }
    }

    /// Routes file output to `dir` instead of the platform data directory.
    pub fn set_log_dir(&self, dir: PathBuf) -> io::Result<()> {
        let writer = LogFileWriter::in_dir(dir)?;
        if let Ok(mut file_writer) = self.file_writer.lock() {
            *file_writer = Some(writer);
        }
        Ok(())
    }

    pub fn set_level(&self, level: Severity) {
        if let Ok(mut current) = self.level.lock() {
            *current = level;
        }
    }

    pub fn level(&self) -> Severity {
        self.level.lock().map(|l| *l).unwrap_or(Severity::Warn)
    }

    pub fn enabled(&self, level: Severity) -> bool {
        level <= self.level()
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.file_writer
            .lock()
            .ok()
            .and_then(|w| w.as_ref().map(|w| w.log_file_path()))
    }

    pub fn log(&self, level: Severity, msg: String) {
        if !self.enabled(level) {
            return;
        }
        let log_msg = LogMessage::new(level, msg);

        let write_to_file = |log_msg: &LogMessage| {
            if let Ok(mut file_writer) = self.file_writer.lock() {
                if let Some(writer) = file_writer.as_mut() {
                    if let Err(e) = writer.write_log(log_msg) {
                        eprintln!("Failed to write to log file: {}", e);
                    }
                }
            }
        };

        if let Ok(mode) = self.mode.lock() {
            match &*mode {
                LoggerMode::Standalone => write_to_terminal(&log_msg),
                LoggerMode::Embedded(sender) => {
                    if sender.try_send(log_msg.clone()).is_err() {
                        eprintln!("Logger channel error: {}", log_msg);
                    }
                }
                LoggerMode::File => write_to_file(&log_msg),
                LoggerMode::Full => {
                    write_to_file(&log_msg);
                    write_to_terminal(&log_msg);
                }
                LoggerMode::Silent => {}
            }
        }
    }

    pub fn debug(&self, msg: String) {
        self.log(Severity::Debug, msg);
    }

    pub fn info(&self, msg: String) {
        self.log(Severity::Info, msg);
    }

    pub fn warn(&self, msg: String) {
        self.log(Severity::Warn, msg);
    }

    pub fn error(&self, msg: String) {
        self.log(Severity::Error, msg);
    }

    pub fn fatal(&self, msg: String) {
        self.log(Severity::Fatal, msg);
    }
}

/// Initialize the global logger in standalone mode
pub fn init_standalone() {
    let _ = GLOBAL_LOGGER.set(Logger::new_standalone());
}

/// Initialize the global logger in embedded mode
pub fn init_embedded(sender: Sender<LogMessage>) {
    let _ = GLOBAL_LOGGER.set(Logger::new_embedded(sender));
}

/// Create a logging channel pair
pub fn create_log_channel() -> (Sender<LogMessage>, Receiver<LogMessage>) {
    unbounded()
}

/// Get the global logger instance
pub fn get_logger() -> &'static Logger {
    GLOBAL_LOGGER.get_or_init(Logger::new_standalone)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        let logger = $crate::logger::get_logger();
        if logger.enabled($crate::logger::Severity::Debug) {
            logger.debug(format!($($arg)*))
        }
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().warn(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().fatal(format!($($arg)*))
    };
}
