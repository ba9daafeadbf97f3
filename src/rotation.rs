//! The rotation loop: present, persist, advance, sleep.
//!
//! Each [`Rotation::tick`] either presents the wallpaper under the cursor or,
//! once a pass is complete, re-enumerates the root and reconciles. A missing
//! file triggers an immediate reconciliation and retry, bounded by the
//! failsafe limit.

use std::convert::Infallible;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::permutation::{Permutation, PositionPicker};
use crate::presenter::{FillMode, Presenter};
use crate::reconcile::{Reconciliation, reconcile};
use crate::scan::FileLister;
use crate::state::StateFile;

/// Monotonic time source and sleeper.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

/// [`Clock`] backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Remaining part of `interval` after `elapsed`, never negative.
#[must_use]
pub const fn sleep_budget(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub root: PathBuf,
    pub interval: Duration,
    pub failsafe_limit: u32,
    pub fill: FillMode,
    pub reshuffle_each_pass: bool,
}

impl From<&Configuration> for RotationSettings {
    fn from(cfg: &Configuration) -> Self {
        Self {
            root: cfg.wallpaper_root.clone(),
            interval: cfg.interval,
            failsafe_limit: cfg.failsafe_limit,
            fill: FillMode::default(),
            reshuffle_each_pass: cfg.reshuffle_each_pass,
        }
    }
}

/// Outcome of a single [`Rotation::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// `path` was shown from permutation slot `slot`.
    Presented { path: PathBuf, slot: usize },
    /// The pass ended and the order was reconciled against a fresh listing.
    PassCompleted(Reconciliation),
    /// Nothing to show; a full interval was waited out.
    Idle,
}

pub struct Rotation<L, P, K, C> {
    lister: L,
    presenter: P,
    picker: K,
    clock: C,
    state: StateFile,
    settings: RotationSettings,
    wallpapers: Vec<PathBuf>,
    order: Permutation,
}

impl<L, P, K, C> Rotation<L, P, K, C>
where
    L: FileLister,
    P: Presenter,
    K: PositionPicker,
    C: Clock,
{
    /// Enumerate the root and resume from `state`, or start a fresh shuffle
    /// when no usable record exists.
    ///
    /// # Errors
    /// Fails if the root cannot be enumerated or the state cannot be written.
    pub fn start(
        lister: L,
        presenter: P,
        mut picker: K,
        clock: C,
        state: StateFile,
        settings: RotationSettings,
    ) -> Result<Self, Error> {
        let wallpapers = lister.list(&settings.root)?;
        let order = if let Some(order) = state.read_state(wallpapers.len()) {
            info!(
                state = %state.path().display(),
                cursor = order.cursor(),
                entries = order.size(),
                "resuming rotation"
            );
            order
        } else {
            let order = Permutation::shuffled(wallpapers.len(), &mut picker);
            state.write_full(&order)?;
            info!(entries = order.size(), "started fresh shuffle");
            order
        };

        let mut rotation = Self {
            lister,
            presenter,
            picker,
            clock,
            state,
            settings,
            wallpapers,
            order,
        };
        if rotation.order.size() != rotation.wallpapers.len() {
            let report = reconcile(
                &mut rotation.order,
                rotation.wallpapers.len(),
                &mut rotation.picker,
            );
            rotation.state.write_full(&rotation.order)?;
            info!(
                previous = report.previous_len,
                current = report.current_len,
                "wallpaper set changed while stopped"
            );
        }
        Ok(rotation)
    }

    #[must_use]
    pub const fn order(&self) -> &Permutation {
        &self.order
    }

    #[must_use]
    pub fn wallpapers(&self) -> &[PathBuf] {
        &self.wallpapers
    }

    /// Rotate forever. Only returns on a fatal error.
    ///
    /// # Errors
    /// Any error from [`Rotation::tick`].
    pub fn run(&mut self) -> Result<Infallible, Error> {
        info!(
            root = %self.settings.root.display(),
            interval = %humantime::format_duration(self.settings.interval),
            wallpapers = self.wallpapers.len(),
            "rotation running"
        );
        loop {
            self.tick()?;
        }
    }

    /// Advance the rotation by one step.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvableState`] when the failsafe limit is hit,
    /// and propagates enumeration, persistence and presentation failures.
    pub fn tick(&mut self) -> Result<Tick, Error> {
        if self.order.is_pass_complete() {
            return self.complete_pass();
        }

        let started = self.clock.now();
        let Some(path) = self.present_current()? else {
            self.pause(started);
            return Ok(Tick::Idle);
        };
        let slot = self.order.cursor();
        self.state.write_pos(slot)?;
        self.order.advance();
        debug!(path = %path.display(), slot, "wallpaper set");
        self.pause(started);
        Ok(Tick::Presented { path, slot })
    }

    fn present_current(&mut self) -> Result<Option<PathBuf>, Error> {
        let mut failures = 0;
        loop {
            let shown = self.resolve_current().and_then(|current| {
                if let Some(path) = &current {
                    self.presenter.set_wallpaper(path, self.settings.fill)?;
                }
                Ok(current)
            });
            match shown {
                Ok(current) => return Ok(current),
                Err(err) if err.is_recoverable() => {
                    if failures >= self.settings.failsafe_limit {
                        return Err(Error::UnresolvableState { attempts: failures });
                    }
                    warn!(error = %err, attempt = failures + 1, "re-enumerating");
                    self.refresh()?;
                    failures += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn resolve_current(&self) -> Result<Option<PathBuf>, Error> {
        let Some(index) = self.order.current() else {
            return Ok(None);
        };
        // The order always spans exactly the current wallpaper list.
        let path = &self.wallpapers[index];
        if self.lister.exists(path) {
            Ok(Some(path.clone()))
        } else {
            Err(Error::MissingFile(path.clone()))
        }
    }

    fn complete_pass(&mut self) -> Result<Tick, Error> {
        let started = self.clock.now();
        let report = self.refresh()?;
        if self.settings.reshuffle_each_pass && self.order.size() > 1 {
            self.order.shuffle(&mut self.picker);
            self.state.write_full(&self.order)?;
            debug!("reshuffled for the next pass");
        }
        if self.order.is_empty() {
            warn!(root = %self.settings.root.display(), "no wallpapers found; waiting");
            self.pause(started);
            return Ok(Tick::Idle);
        }
        info!(wallpapers = self.order.size(), "pass complete");
        Ok(Tick::PassCompleted(report))
    }

    fn refresh(&mut self) -> Result<Reconciliation, Error> {
        let wallpapers = self.lister.list(&self.settings.root)?;
        let report = reconcile(&mut self.order, wallpapers.len(), &mut self.picker);
        self.wallpapers = wallpapers;
        self.state.write_full(&self.order)?;
        if report.changed() {
            info!(
                previous = report.previous_len,
                current = report.current_len,
                added = report.inserted_at.len(),
                removed = report.removed_from.len(),
                cursor = report.cursor_after,
                "wallpaper set changed"
            );
        }
        Ok(report)
    }

    fn pause(&mut self, started: Instant) {
        let elapsed = self.clock.now().saturating_duration_since(started);
        let budget = sleep_budget(self.settings.interval, elapsed);
        trace!(elapsed = ?elapsed, sleep = ?budget, "pacing");
        if !budget.is_zero() {
            self.clock.sleep(budget);
        }
    }
}
