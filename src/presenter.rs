//! Setting the desktop background.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::config::PresenterConfig;
use crate::error::Error;

/// How an image is fitted to the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Scale to the screen size, ignoring aspect ratio.
    #[default]
    Stretch,
}

impl FillMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stretch => "stretch",
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can put an image on the desktop.
pub trait Presenter {
    /// # Errors
    /// Returns [`Error::MissingFile`] if the image vanished before it could be
    /// applied, or [`Error::Presentation`] if the setter failed.
    fn set_wallpaper(&mut self, path: &Path, fill: FillMode) -> Result<(), Error>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn set_wallpaper(&mut self, path: &Path, fill: FillMode) -> Result<(), Error> {
        (**self).set_wallpaper(path, fill)
    }
}

/// Runs an external setter such as `feh` or `swww`.
///
/// `{path}` in the argument list is replaced with the absolute image path and
/// `{fill}` with the fill mode name.
#[derive(Debug, Clone)]
pub struct CommandPresenter {
    program: String,
    args: Vec<String>,
}

impl CommandPresenter {
    /// # Errors
    /// Returns [`Error::Config`] when the command is empty.
    pub fn from_config(cfg: &PresenterConfig) -> Result<Self, Error> {
        let (program, args) = cfg
            .command
            .split_first()
            .ok_or_else(|| Error::Config("presenter.command must not be empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn render_args(&self, path: &Path, fill: FillMode) -> Vec<String> {
        let path = path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{path}", &path)
                    .replace("{fill}", fill.as_str())
            })
            .collect()
    }
}

impl Presenter for CommandPresenter {
    fn set_wallpaper(&mut self, path: &Path, fill: FillMode) -> Result<(), Error> {
        let failed = |reason: String| Error::Presentation {
            path: path.to_path_buf(),
            reason,
        };
        let absolute = path.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
            _ => failed(e.to_string()),
        })?;
        let args = self.render_args(&absolute, fill);
        debug!(program = %self.program, ?args, "running wallpaper setter");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| failed(format!("failed to spawn {}: {e}", self.program)))?;
        if !status.success() {
            return Err(failed(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }
}

/// Logs instead of touching the desktop. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn set_wallpaper(&mut self, path: &Path, fill: FillMode) -> Result<(), Error> {
        info!(path = %path.display(), %fill, "dry run: would set wallpaper");
        Ok(())
    }
}
