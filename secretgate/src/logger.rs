//! Access and error log files
//!
//! Two append-only streams rooted in a configurable directory:
//! `access.log` takes one combined-format line per HTTP request and
//! `error.log` takes an ISO-8601 timestamp line followed by the failure
//! detail. Both handles live for the process.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::warn;

pub struct LogFiles {
    access: Mutex<File>,
    error: Mutex<File>,
}

impl LogFiles {
    /// Open both log files under `dir`, creating the directory if absent.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let open = |name: &str| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))
        };
        Ok(Self {
            access: Mutex::new(open("access.log")?),
            error: Mutex::new(open("error.log")?),
        })
    }

    /// Append one access record.
    pub fn access(&self, line: &str) {
        let mut file = self.access.lock();
        if let Err(err) = writeln!(file, "{line}") {
            warn!(error = %err, "failed to write access log");
        }
    }

    /// Append one error record: timestamp line, then the detail line.
    pub fn error(&self, detail: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut file = self.error.lock();
        if let Err(err) = writeln!(file, "{timestamp}\n{detail}") {
            warn!(error = %err, "failed to write error log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");

        let logs = LogFiles::open(&nested).unwrap();
        logs.access(r#"127.0.0.1 - - [01/Jan/2026:00:00:00 +0000] "GET /secrets HTTP/1.1" 200 2 "-" "-""#);
        logs.error("Secret not found: projects/p/secrets/missing");

        let access = std::fs::read_to_string(nested.join("access.log")).unwrap();
        assert!(access.contains("GET /secrets"));

        let error = std::fs::read_to_string(nested.join("error.log")).unwrap();
        let mut lines = error.lines();
        let timestamp = lines.next().unwrap();
        assert!(timestamp.ends_with('Z') && timestamp.contains('T'));
        assert_eq!(
            lines.next().unwrap(),
            "Secret not found: projects/p/secrets/missing"
        );
    }
}
