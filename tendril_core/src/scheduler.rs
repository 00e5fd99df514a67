// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative time slicing for the work loop.
//!
//! The [`Engine`](crate::engine::Engine) walks a work-in-progress tree one
//! fiber at a time. After each unit it consults the slice's
//! [`IdleDeadline`]; once the reported time drops below
//! [`SchedulerConfig::yield_threshold_ms`] (or the optional unit cap is
//! reached) it suspends, keeping the next fiber as its continuation, and asks
//! the host for another slice. Commit never yields.
//!
//! [`Unbounded`] and [`CountdownDeadline`] are deadlines for hosts without a
//! real idle clock: synchronous rendering and deterministic tests.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::host::{IdleDeadline, IdleScheduler};
use crate::trace::CycleSummary;

/// Configuration for the work loop's time slicing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Yield once the deadline reports fewer milliseconds than this.
    pub yield_threshold_ms: f64,
    /// Hard cap on units per slice, regardless of reported idle time.
    pub max_units_per_slice: Option<u32>,
}

impl SchedulerConfig {
    /// Default configuration for browser-style idle callbacks: yield when
    /// less than one millisecond remains.
    #[must_use]
    pub const fn idle_callback() -> Self {
        Self {
            yield_threshold_ms: 1.0,
            max_units_per_slice: None,
        }
    }

    /// Never yields; every slice runs to commit.
    #[must_use]
    pub const fn synchronous() -> Self {
        Self {
            yield_threshold_ms: f64::NEG_INFINITY,
            max_units_per_slice: None,
        }
    }

    /// Returns whether a slice that has completed `units` units, with
    /// `time_remaining_ms` of idle time left, should suspend now.
    #[must_use]
    pub fn should_yield(&self, time_remaining_ms: f64, units: u32) -> bool {
        self.max_units_per_slice.is_some_and(|cap| units >= cap)
            || time_remaining_ms < self.yield_threshold_ms
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::idle_callback()
    }
}

/// Where the engine is between slices.
///
/// The walk-exhausted state is never observable: once the last unit
/// completes, commit runs before the slice returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkPhase {
    /// No work-in-progress tree.
    Idle,
    /// A work-in-progress tree is being walked.
    Walking,
}

/// Outcome of one [`Engine::work_loop`](crate::engine::Engine::work_loop)
/// slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// There was nothing to do.
    Idle,
    /// The slice ran out of time; another slice has been requested.
    Yielded,
    /// A cycle committed during this slice.
    Committed(CycleSummary),
}

/// A deadline that always reports plenty of time.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl IdleDeadline for Unbounded {
    fn time_remaining(&self) -> f64 {
        f64::INFINITY
    }
}

/// A deadline that lets a slice run a fixed number of units.
///
/// Each query consumes one unit of budget; the query that exhausts it (and
/// every later one) reports zero time left. A slice always completes at least
/// one unit before its first query.
#[derive(Debug)]
pub struct CountdownDeadline {
    remaining: Cell<u32>,
    slice_ms: f64,
}

impl CountdownDeadline {
    /// Milliseconds reported while budget remains.
    pub const DEFAULT_SLICE_MS: f64 = 16.0;

    /// Creates a deadline allowing `units` units of work.
    #[must_use]
    pub const fn new(units: u32) -> Self {
        Self {
            remaining: Cell::new(units),
            slice_ms: Self::DEFAULT_SLICE_MS,
        }
    }

    /// Returns the number of queries left before the deadline expires.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining.get()
    }
}

impl IdleDeadline for CountdownDeadline {
    fn time_remaining(&self) -> f64 {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        if left > 0 { self.slice_ms } else { 0.0 }
    }
}

/// Render request shared between the engine and every [`Setter`].
///
/// The first request since the last [`take`](Self::take) asks the host for a
/// slice; later ones coalesce.
///
/// [`Setter`]: crate::hooks::Setter
#[derive(Default)]
pub(crate) struct RenderSignal {
    requested: Cell<bool>,
    scheduler: RefCell<Option<Rc<dyn IdleScheduler>>>,
}

impl fmt::Debug for RenderSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSignal")
            .field("requested", &self.requested.get())
            .field("has_scheduler", &self.scheduler.borrow().is_some())
            .finish()
    }
}

impl RenderSignal {
    /// Marks a re-render as requested.
    pub(crate) fn request(&self) {
        if !self.requested.replace(true) {
            self.request_idle();
        }
    }

    /// Clears and returns the request flag.
    pub(crate) fn take(&self) -> bool {
        self.requested.replace(false)
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.get()
    }

    pub(crate) fn set_scheduler(&self, scheduler: Rc<dyn IdleScheduler>) {
        *self.scheduler.borrow_mut() = Some(scheduler);
    }

    /// Asks the host for another slice.
    pub(crate) fn request_idle(&self) {
        // Clone out so the scheduler may install a new one re-entrantly.
        let scheduler = self.scheduler.borrow().clone();
        if let Some(scheduler) = scheduler {
            scheduler.request_idle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_expires_after_budget() {
        let d = CountdownDeadline::new(3);
        assert!(d.time_remaining() > 0.0);
        assert!(d.time_remaining() > 0.0);
        assert_eq!(d.time_remaining(), 0.0);
        assert_eq!(d.time_remaining(), 0.0);
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn idle_callback_yields_below_one_ms() {
        let config = SchedulerConfig::idle_callback();
        assert!(config.should_yield(0.5, 1));
        assert!(!config.should_yield(1.0, 1));
        assert!(!SchedulerConfig::synchronous().should_yield(0.0, 1_000));
    }

    #[test]
    fn unit_cap_forces_yield() {
        let config = SchedulerConfig {
            max_units_per_slice: Some(2),
            ..SchedulerConfig::synchronous()
        };
        assert!(!config.should_yield(Unbounded.time_remaining(), 1));
        assert!(config.should_yield(Unbounded.time_remaining(), 2));
    }

    #[test]
    fn signal_coalesces_requests() {
        let hits = Rc::new(Cell::new(0_u32));
        let signal = RenderSignal::default();
        let counter = Rc::clone(&hits);
        signal.set_scheduler(Rc::new(move || counter.set(counter.get() + 1)));

        signal.request();
        signal.request();
        assert_eq!(hits.get(), 1, "second request coalesces");
        assert!(signal.take());
        assert!(!signal.is_requested());

        signal.request();
        assert_eq!(hits.get(), 2);
    }
}
