use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Library error type for wallpaper rotation.
#[derive(Debug, Error)]
pub enum Error {
    /// The wallpaper root itself could not be opened.
    #[error("cannot enumerate wallpaper root {}: {source}", path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The durable rotation record could not be written.
    #[error("cannot write rotation state {}: {source}", path.display())]
    StatePersistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The wallpaper at the cursor vanished since the last enumeration.
    #[error("wallpaper {} no longer exists", .0.display())]
    MissingFile(PathBuf),

    /// The presenter refused to set the wallpaper.
    #[error("failed to set wallpaper {}: {reason}", path.display())]
    Presentation { path: PathBuf, reason: String },

    /// Repeated reconciliation never produced a file that exists.
    #[error("no presentable wallpaper after {attempts} consecutive reconciliations")]
    UnresolvableState { attempts: u32 },

    /// Invalid runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StatePersistence {
            path: path.into(),
            source,
        }
    }

    /// Whether the scheduler can recover from this error locally.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingFile(_))
    }
}
