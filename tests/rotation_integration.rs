use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tempfile::tempdir;
use wallpaper_rotator::Error;
use wallpaper_rotator::permutation::{RngPicker, is_bijection};
use wallpaper_rotator::presenter::{FillMode, Presenter};
use wallpaper_rotator::rotation::{Clock, Rotation, RotationSettings, Tick};
use wallpaper_rotator::scan::FileLister;
use wallpaper_rotator::state::StateFile;

const INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Library {
    listed: Vec<PathBuf>,
    missing: HashSet<PathBuf>,
    list_calls: usize,
}

#[derive(Clone, Default)]
struct FakeLister(Rc<RefCell<Library>>);

impl FileLister for FakeLister {
    fn list(&self, _root: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut lib = self.0.borrow_mut();
        lib.list_calls += 1;
        Ok(lib.listed.clone())
    }

    fn exists(&self, path: &Path) -> bool {
        !self.0.borrow().missing.contains(path)
    }
}

#[derive(Clone)]
struct FakeClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
            sleeps: Rc::default(),
        }
    }

    fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

#[derive(Clone)]
struct FakePresenter {
    shown: Rc<RefCell<Vec<PathBuf>>>,
    clock: FakeClock,
    work: Duration,
    reject: bool,
    // Deletes the next wallpaper from this library just before it is shown.
    vanish: Option<FakeLister>,
}

impl Presenter for FakePresenter {
    fn set_wallpaper(&mut self, path: &Path, fill: FillMode) -> Result<(), Error> {
        assert_eq!(fill, FillMode::Stretch);
        if let Some(library) = self.vanish.take() {
            library.0.borrow_mut().listed.retain(|p| p != path);
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        if self.reject {
            return Err(Error::Presentation {
                path: path.to_path_buf(),
                reason: "rejected".into(),
            });
        }
        self.clock.advance(self.work);
        self.shown.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

struct Harness {
    library: FakeLister,
    clock: FakeClock,
    presenter: FakePresenter,
    state: StateFile,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(files: usize) -> Self {
        let dir = tempdir().unwrap();
        let library = FakeLister::default();
        library.0.borrow_mut().listed = (0..files).map(wallpaper).collect();
        let clock = FakeClock::new();
        let presenter = FakePresenter {
            shown: Rc::default(),
            clock: clock.clone(),
            work: Duration::ZERO,
            reject: false,
            vanish: None,
        };
        Self {
            state: StateFile::new(dir.path().join("status")),
            library,
            clock,
            presenter,
            _dir: dir,
        }
    }

    fn start(
        &self,
        seed: u64,
    ) -> Result<Rotation<FakeLister, FakePresenter, RngPicker, FakeClock>, Error> {
        Rotation::start(
            self.library.clone(),
            self.presenter.clone(),
            RngPicker::seeded(seed),
            self.clock.clone(),
            self.state.clone(),
            RotationSettings {
                root: PathBuf::from("/walls"),
                interval: INTERVAL,
                failsafe_limit: 5,
                fill: FillMode::Stretch,
                reshuffle_each_pass: false,
            },
        )
    }

    fn shown(&self) -> Vec<PathBuf> {
        self.presenter.shown.borrow().clone()
    }

    fn sleeps(&self) -> Vec<Duration> {
        self.clock.sleeps.borrow().clone()
    }
}

fn wallpaper(i: usize) -> PathBuf {
    PathBuf::from(format!("/walls/{i:03}.png"))
}

fn presented(tick: Tick) -> PathBuf {
    match tick {
        Tick::Presented { path, .. } => path,
        other => panic!("expected a presentation, got {other:?}"),
    }
}

#[test]
fn full_pass_shows_every_wallpaper_once_then_repeats_the_order() {
    let h = Harness::new(5);
    let mut rotation = h.start(1).unwrap();

    let first: Vec<PathBuf> = (0..5).map(|_| presented(rotation.tick().unwrap())).collect();
    let mut distinct = first.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct, (0..5).map(wallpaper).collect::<Vec<_>>());
    assert!(rotation.order().is_pass_complete());

    match rotation.tick().unwrap() {
        Tick::PassCompleted(report) => assert!(!report.changed()),
        other => panic!("expected end of pass, got {other:?}"),
    }
    assert_eq!(rotation.order().cursor(), 0);

    let second: Vec<PathBuf> = (0..5).map(|_| presented(rotation.tick().unwrap())).collect();
    assert_eq!(first, second);
    assert_eq!(h.sleeps(), vec![INTERVAL; 10]);
}

#[test]
fn restart_resumes_at_the_last_shown_wallpaper() {
    let h = Harness::new(6);
    let mut rotation = h.start(2).unwrap();
    rotation.tick().unwrap();
    let last = presented(rotation.tick().unwrap());
    let order = rotation.order().as_slice().to_vec();
    drop(rotation);

    // A different seed proves the order comes from the state file.
    let mut resumed = h.start(99).unwrap();
    assert_eq!(resumed.order().as_slice(), order.as_slice());
    assert_eq!(presented(resumed.tick().unwrap()), last);
}

#[test]
fn missing_file_triggers_reconciliation_and_retry() {
    let h = Harness::new(5);
    let mut rotation = h.start(3).unwrap();
    let index = rotation.order().current().unwrap();
    let gone = wallpaper(index);
    {
        let mut lib = h.library.0.borrow_mut();
        lib.listed.retain(|p| *p != gone);
        lib.missing.insert(gone.clone());
    }

    let shown = presented(rotation.tick().unwrap());
    assert_ne!(shown, gone);
    assert_eq!(rotation.order().size(), 4);
    assert!(is_bijection(rotation.order().as_slice()));
    assert_eq!(rotation.wallpapers().len(), 4);
    assert_eq!(h.library.0.borrow().list_calls, 2);
}

#[test]
fn file_vanishing_during_presentation_is_retried() {
    let mut h = Harness::new(4);
    h.presenter.vanish = Some(h.library.clone());
    let mut rotation = h.start(12).unwrap();
    let doomed = wallpaper(rotation.order().current().unwrap());

    let shown = presented(rotation.tick().unwrap());
    assert_ne!(shown, doomed);
    assert_eq!(h.shown(), vec![shown]);
    assert_eq!(rotation.order().size(), 3);
    assert_eq!(h.library.0.borrow().list_calls, 2);
}

#[test]
fn failsafe_gives_up_after_five_reconciliations() {
    let h = Harness::new(3);
    let mut rotation = h.start(4).unwrap();
    {
        let mut lib = h.library.0.borrow_mut();
        let all = lib.listed.clone();
        lib.missing.extend(all);
    }

    let err = rotation.tick().unwrap_err();
    assert!(matches!(err, Error::UnresolvableState { attempts: 5 }));
    // One listing at start-up plus one per reconciliation.
    assert_eq!(h.library.0.borrow().list_calls, 6);
    assert!(h.shown().is_empty());
}

#[test]
fn slow_presentation_shortens_or_skips_the_sleep() {
    let mut h = Harness::new(2);
    h.presenter.work = Duration::from_secs(20);
    let mut rotation = h.start(5).unwrap();
    rotation.tick().unwrap();
    assert_eq!(h.sleeps(), vec![Duration::from_secs(40)]);

    let mut h = Harness::new(2);
    h.presenter.work = Duration::from_secs(90);
    let mut rotation = h.start(5).unwrap();
    rotation.tick().unwrap();
    assert!(h.sleeps().is_empty());
}

#[test]
fn growth_between_passes_extends_the_order() {
    let h = Harness::new(5);
    let mut rotation = h.start(6).unwrap();
    for _ in 0..5 {
        rotation.tick().unwrap();
    }
    h.library.0.borrow_mut().listed.extend([wallpaper(5), wallpaper(6)]);

    match rotation.tick().unwrap() {
        Tick::PassCompleted(report) => {
            assert_eq!(report.previous_len, 5);
            assert_eq!(report.current_len, 7);
            assert_eq!(report.inserted_at.len(), 2);
        }
        other => panic!("expected end of pass, got {other:?}"),
    }
    assert_eq!(rotation.order().size(), 7);
    assert_eq!(rotation.order().cursor(), 0);
    assert!(is_bijection(rotation.order().as_slice()));

    let pass: HashSet<PathBuf> = (0..7).map(|_| presented(rotation.tick().unwrap())).collect();
    assert_eq!(pass.len(), 7);
}

#[test]
fn startup_reconciles_a_stale_record() {
    let h = Harness::new(3);
    drop(h.start(7).unwrap());
    h.library.0.borrow_mut().listed.extend([wallpaper(3), wallpaper(4)]);

    let rotation = h.start(7).unwrap();
    assert_eq!(rotation.order().size(), 5);
    assert!(is_bijection(rotation.order().as_slice()));
    assert_eq!(h.state.read_state(5).as_ref(), Some(rotation.order()));
}

#[test]
fn corrupt_record_starts_a_fresh_shuffle() {
    let h = Harness::new(4);
    fs::write(h.state.path(), [7u8; 10]).unwrap();

    let rotation = h.start(8).unwrap();
    assert_eq!(rotation.order().size(), 4);
    assert_eq!(rotation.order().cursor(), 0);
    assert_eq!(h.state.read_state(4).as_ref(), Some(rotation.order()));
}

#[test]
fn cursor_is_persisted_after_each_step() {
    let h = Harness::new(4);
    let mut rotation = h.start(9).unwrap();
    let slot = match rotation.tick().unwrap() {
        Tick::Presented { slot, .. } => slot,
        other => panic!("expected a presentation, got {other:?}"),
    };
    rotation.tick().unwrap();
    assert_eq!(h.state.read_state(4).unwrap().cursor(), slot + 1);
}

#[test]
fn presenter_rejection_is_fatal() {
    let mut h = Harness::new(2);
    h.presenter.reject = true;
    let mut rotation = h.start(10).unwrap();
    assert!(matches!(
        rotation.tick().unwrap_err(),
        Error::Presentation { .. }
    ));
}

#[test]
fn empty_library_waits_a_full_interval() {
    let h = Harness::new(0);
    let mut rotation = h.start(11).unwrap();
    assert_eq!(rotation.tick().unwrap(), Tick::Idle);
    assert_eq!(h.sleeps(), vec![INTERVAL]);

    h.library.0.borrow_mut().listed.push(wallpaper(0));
    assert!(matches!(rotation.tick().unwrap(), Tick::PassCompleted(_)));
    assert_eq!(presented(rotation.tick().unwrap()), wallpaper(0));
}
