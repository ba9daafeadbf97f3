//! Append-only text log of fatal errors.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` stamped with the current local time.
    pub fn append(&self, message: impl Display) -> io::Result<()> {
        self.append_at(&Local::now(), message)
    }

    /// Append one entry: timestamp line, message, blank separator line.
    pub fn append_at<Tz>(&self, at: &DateTime<Tz>, message: impl Display) -> io::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let entry = format!("{}\n{message}\n\n", at.format("%a %b %e %H:%M:%S %Y"));
        file.write_all(entry.as_bytes())?;
        file.flush()
    }
}
