//! Session log persistence.
//!
//! Each flushed session becomes one plain-text file: the report followed by
//! the raw per-reading dump.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use voltwatch_platform::format_timestamp_filename;

use crate::config::logs_dir;
use crate::data::session::SessionFlush;

#[derive(Debug, thiserror::Error)]
pub enum SessionLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionLogError>;

/// Writes one text log file per flushed session.
pub struct SessionLogger {
    dir: PathBuf,
}

impl SessionLogger {
    pub fn new() -> Self {
        Self { dir: logs_dir() }
    }

    #[allow(dead_code)]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist a flush; returns the path of the written file.
    pub fn save(&self, flush: &SessionFlush) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let filename = format!(
            "{}_{}.log",
            flush.report.direction_word(),
            format_timestamp_filename(Utc::now().timestamp()),
        );
        let path = self.dir.join(filename);

        let mut content = flush.report.render();
        content.push('\n');
        for reading in &flush.readings {
            content.push_str(&reading.render_line(false));
            content.push('\n');
        }

        fs::write(&path, content)?;
        Ok(path)
    }
}

impl Default for SessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::session::{FlushCause, SessionAccumulator};
    use voltwatch_platform::{ChargeMode, Reading};

    fn sample_flush() -> SessionFlush {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);
        let mut flushed = None;
        for i in 0..6i64 {
            let reading = Reading {
                timestamp: i * 5,
                charging: false,
                voltage: 3.7,
                current: -0.5,
                effective_voltage: 3.75,
                ..Reading::default()
            };
            if let Some(flush) = acc.ingest(reading, i == 5) {
                flushed = Some(flush);
            }
        }
        flushed.expect("shutdown flush")
    }

    #[test]
    fn test_save_writes_report_and_dump() {
        let dir = std::env::temp_dir().join(format!("voltwatch-test-{}", std::process::id()));
        let logger = SessionLogger::with_dir(dir.clone());

        let flush = sample_flush();
        assert_eq!(flush.cause, FlushCause::Shutdown);

        let path = logger.save(&flush).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Discharging_"));
        assert!(content.starts_with("Discharging for"));
        // report, a blank separator, then one line per reading
        assert_eq!(
            content.lines().count(),
            flush.report.render().lines().count() + 1 + flush.readings.len()
        );

        let _ = fs::remove_dir_all(dir);
    }
}
