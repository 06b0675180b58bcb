//! Progress reporting and cooperative cancellation.
//!
//! Long-running operations (extraction, folder rebuilds, saves) report
//! `(completed, total)` unit counts, where a unit is one archive entry, one
//! bundle chunk or one manifest line. Cancellation is checked before every
//! unit and surfaces as [`Error::Cancelled`](crate::Error::Cancelled).
//!
//! During a nested extraction `total` grows as nested containers are
//! discovered; `completed` only ever increases.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dsarc::progress::AtomicProgress;
//! use dsarc::{ExtractOptions, LoadedArchive};
//!
//! # fn main() -> dsarc::Result<()> {
//! let progress = AtomicProgress::shared();
//! let watcher = Arc::clone(&progress);
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     watcher.cancel();
//! });
//!
//! let archive = LoadedArchive::open_path("sound.dat")?;
//! let mut reporter = Arc::clone(&progress);
//! archive.extract_all("out", &ExtractOptions::new().nested(true), &mut reporter)?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::{Error, Result};

// Floating point versions for formatting calculations
const BYTES_KB: f64 = 1024.0;
const BYTES_MB: f64 = BYTES_KB * 1024.0;
const BYTES_GB: f64 = BYTES_MB * 1024.0;

/// Progress reporting trait for archive operations.
///
/// Every method has a no-op default. Returning `false` from
/// [`on_progress`](Self::on_progress) or `true` from
/// [`should_cancel`](Self::should_cancel) stops the operation at the next
/// checkpoint.
pub trait ProgressReporter: Send {
    /// Called whenever the number of units to process changes.
    fn on_total(&mut self, total: u64) {
        let _ = total;
    }

    /// Called after each unit.
    ///
    /// Returns `true` to continue or `false` to request cancellation.
    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        let _ = (completed, total);
        true
    }

    /// Called when starting to process an entry, chunk or manifest line.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when an entry finishes.
    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }

    /// Called on any tolerated anomaly.
    fn on_warning(&mut self, message: &str) {
        let _ = message;
    }

    /// Checks if cancellation has been requested.
    ///
    /// Called before every unit, so it should be cheap.
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Progress state with timing.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Units to process.
    pub total: u64,
    /// Units completed so far.
    pub completed: u64,
    /// Entry currently being processed.
    pub current_entry: Option<String>,
    /// Number of entries that finished successfully.
    pub entries_succeeded: usize,
    /// Number of entries that failed.
    pub entries_failed: usize,
    /// Processing start time.
    pub start_time: Instant,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            total: 0,
            completed: 0,
            current_entry: None,
            entries_succeeded: 0,
            entries_failed: 0,
            start_time: Instant::now(),
        }
    }
}

impl ProgressState {
    /// Creates a new progress state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Returns elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// A progress reporter that does nothing (null object pattern).
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A progress reporter that collects statistics.
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    /// The progress state.
    pub state: ProgressState,
    /// Every `(completed, total)` pair reported, in order.
    pub history: Vec<(u64, u64)>,
    /// Whether cancellation was requested.
    pub cancelled: bool,
    /// Warnings collected.
    pub warnings: Vec<String>,
}

impl StatisticsProgress {
    /// Creates a new statistics progress reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected state.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_total(&mut self, total: u64) {
        self.state.total = total;
    }

    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        self.state.completed = completed;
        self.state.total = total;
        self.history.push((completed, total));
        !self.cancelled
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        self.state.current_entry = Some(entry_name.to_string());
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        if success {
            self.state.entries_succeeded += 1;
        } else {
            self.state.entries_failed += 1;
        }
        self.state.current_entry = None;
    }

    fn on_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn should_cancel(&self) -> bool {
        self.cancelled
    }
}

/// A thread-safe progress reporter using atomics.
///
/// Share it through an `Arc` to watch progress or cancel from another
/// thread; `Arc<AtomicProgress>` is itself a [`ProgressReporter`].
#[derive(Debug)]
pub struct AtomicProgress {
    total: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicBool,
    start_time: Instant,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Creates a new atomic progress reporter.
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the units to process.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Returns the completed units.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.completed() as f64 / total as f64) * 100.0
        }
    }

    /// Returns elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn record(&self, completed: u64, total: u64) -> bool {
        self.completed.store(completed, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        !self.is_cancelled()
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_total(&mut self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        self.record(completed, total)
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// Progress reporter for shared `Arc<AtomicProgress>`.
impl ProgressReporter for Arc<AtomicProgress> {
    fn on_total(&mut self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        self.record(completed, total)
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    /// Creates a progress reporter from a closure.
    ///
    /// The closure receives `(completed, total)` and returns `true` to
    /// continue or `false` to cancel.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    fn on_progress(&mut self, completed: u64, total: u64) -> bool {
        (self.callback)(completed, total)
    }
}

/// Creates a closure-based progress reporter.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    ClosureProgress::new(f)
}

/// Session-wide progress bookkeeping.
///
/// Keeps one monotonic `(completed, total)` pair across a whole call tree
/// and turns cancellation requests into [`Error::Cancelled`].
pub(crate) struct Tracker<'a> {
    reporter: &'a mut dyn ProgressReporter,
    completed: u64,
    total: u64,
    stop_requested: bool,
    active_folders: Vec<PathBuf>,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(reporter: &'a mut dyn ProgressReporter) -> Self {
        Self {
            reporter,
            completed: 0,
            total: 0,
            stop_requested: false,
            active_folders: Vec::new(),
        }
    }

    /// Marks `folder` as being rebuilt.
    ///
    /// Fails with [`Error::ReferenceCycle`] if the folder (after resolving
    /// `..` and links) is already on the rebuild stack.
    pub(crate) fn enter_folder(&mut self, folder: &Path) -> Result<()> {
        let key = folder.canonicalize()?;
        if self.active_folders.contains(&key) {
            return Err(Error::ReferenceCycle {
                folder: folder.to_path_buf(),
            });
        }
        self.active_folders.push(key);
        Ok(())
    }

    /// Pops the folder pushed by the matching [`Tracker::enter_folder`].
    pub(crate) fn leave_folder(&mut self) {
        self.active_folders.pop();
    }

    /// Announces `units` more units of work.
    pub(crate) fn add_total(&mut self, units: u64) {
        self.total += units;
        self.reporter.on_total(self.total);
    }

    /// Fails with [`Error::Cancelled`] if cancellation was requested.
    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.stop_requested || self.reporter.should_cancel() {
            log::debug!("cancelled after {} of {} units", self.completed, self.total);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn start(&mut self, name: &str, size: u64) {
        self.reporter.on_entry_start(name, size);
    }

    /// Marks one unit done.
    pub(crate) fn finish(&mut self, name: &str) {
        self.reporter.on_entry_complete(name, true);
        self.advance();
    }

    /// Marks one unit processed without a usable result.
    pub(crate) fn fail(&mut self, name: &str) {
        self.reporter.on_entry_complete(name, false);
        self.advance();
    }

    fn advance(&mut self) {
        self.completed += 1;
        if self.completed > self.total {
            self.total = self.completed;
        }
        if !self.reporter.on_progress(self.completed, self.total) {
            self.stop_requested = true;
        }
    }

    pub(crate) fn warn(&mut self, message: &str) {
        log::warn!("{message}");
        self.reporter.on_warning(message);
    }
}

/// Formats bytes as a human-readable string using IEC units (KiB, MiB, GiB).
///
/// # Examples
///
/// ```rust
/// use dsarc::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(0), "0 B");
/// assert_eq!(format_bytes_iec(512), "512 B");
/// assert_eq!(format_bytes_iec(1024), "1.0 KiB");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// assert_eq!(format_bytes_iec(1048576), "1.0 MiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    let bytes_f64 = bytes as f64;
    if bytes_f64 < BYTES_KB {
        format!("{} B", bytes)
    } else if bytes_f64 < BYTES_MB {
        format!("{:.1} KiB", bytes_f64 / BYTES_KB)
    } else if bytes_f64 < BYTES_GB {
        format!("{:.1} MiB", bytes_f64 / BYTES_MB)
    } else {
        format!("{:.1} GiB", bytes_f64 / BYTES_GB)
    }
}
