// Thu Oct 15 2026 - Alex

use colored::*;
use log::{Level, LevelFilter};
use std::io::Write;
use std::time::Instant;

pub struct LoggingUtils;

impl LoggingUtils {
    /// Installs the global logger at `level`. A `RUST_LOG` filter, when set,
    /// takes precedence. Calling this twice is harmless.
    pub fn init_logger(level: LevelFilter) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level).format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                Self::format_level(record.level()),
                record.target().dimmed(),
                record.args()
            )
        });

        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }

        builder.try_init().ok();
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn format_level(level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

/// Logs the lifetime of a scope at debug level.
pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: &str) -> Self {
        log::debug!("[TIMER] {} started", name);
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("[TIMER] {} took {:.2}ms", self.name, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(LoggingUtils::level_from_str("WARNING"), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_str("debug"), LevelFilter::Debug);
        assert_eq!(LoggingUtils::level_from_str("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingUtils::level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(LoggingUtils::level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        LoggingUtils::init_logger(LevelFilter::Off);
        LoggingUtils::init_logger(LevelFilter::Off);
    }
}
