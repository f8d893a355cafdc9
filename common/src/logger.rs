use std::sync::OnceLock;
use chrono::Local;

static LOGGER: OnceLock<Logger> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> Option<&'static str> {
        match self {
            Level::Info => None,
            Level::Warn => Some("WARN"),
            Level::Error => Some("ERROR"),
        }
    }
}

pub struct Logger {
    prefix: Option<String>,
}

impl Logger {
    fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    fn format_line(&self, timestamp: &str, level: Level, message: &str) -> String {
        let mut line = format!("[{}]", timestamp);
        if let Some(ref prefix) = self.prefix {
            line.push_str(&format!("[{}]", prefix));
        }
        if let Some(tag) = level.tag() {
            line.push_str(&format!("[{}]", tag));
        }
        line.push(' ');
        line.push_str(message);
        line
    }

    pub fn log(&self, level: Level, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let line = self.format_line(&timestamp, level, message);
        match level {
            Level::Info => println!("{}", line),
            Level::Warn | Level::Error => eprintln!("{}", line),
        }
    }
}

pub fn init_logger(prefix: Option<String>) {
    LOGGER.get_or_init(|| Logger::new(prefix));
}

pub fn log(level: Level, message: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, message);
    } else {
        eprintln!("Logger not initialized! Call init_logger() first.");
    }
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Error, &format!($($arg)*))
    };
}
