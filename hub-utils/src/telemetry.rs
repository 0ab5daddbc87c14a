//! Scoped timing for the expensive steps of a prediction.
//!
//! A [`TimingGuard`] measures from creation to drop and emits one log line on
//! the [`TELEMETRY_TARGET`](crate::TELEMETRY_TARGET) target. Guards are inert unless telemetry was
//! switched on with [`configure`] *and* the logger accepts the guard's level, so leaving them
//! in hot paths costs an `Instant::now()` and two atomic loads.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

use crate::TELEMETRY_TARGET;

/// Highest level telemetry may log at, stored as `LevelFilter as usize` (0 = off).
static TELEMETRY_CEILING: AtomicUsize = AtomicUsize::new(0);

/// Logs the elapsed time of a scope when dropped.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    /// Returns `true` when the guard will emit a log entry on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Time since the guard was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the guard without logging and return the measured duration.
    pub fn finish(mut self) -> Duration {
        self.active = false;
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        let elapsed = self.start.elapsed();
        log!(
            target: TELEMETRY_TARGET,
            self.level,
            "{} took {:.2?}",
            self.label,
            elapsed
        );
    }
}

/// Start a guard that logs at `level` when telemetry allows it.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(label, level, true)
}

/// Like [`timing_guard`], with an extra caller-controlled switch.
pub fn timing_guard_if(
    label: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    let active =
        enabled && telemetry_allows(level) && log_enabled!(target: TELEMETRY_TARGET, level);
    TimingGuard {
        label: label.into(),
        level,
        start: Instant::now(),
        active,
    }
}

/// Set the global telemetry switch and level ceiling.
pub fn configure(enabled: bool, level: LevelFilter) {
    let ceiling = if enabled { level as usize } else { 0 };
    TELEMETRY_CEILING.store(ceiling, Ordering::Relaxed);
}

/// Whether any telemetry output is currently allowed.
pub fn telemetry_enabled() -> bool {
    TELEMETRY_CEILING.load(Ordering::Relaxed) > 0
}

/// The configured level ceiling (`Off` when disabled).
pub fn telemetry_level() -> LevelFilter {
    match TELEMETRY_CEILING.load(Ordering::Relaxed) {
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

/// Returns `true` when telemetry is on and `level` is within the ceiling.
pub fn telemetry_allows(level: Level) -> bool {
    level <= telemetry_level()
}
