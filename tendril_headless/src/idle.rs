// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Idle scheduling without an event loop.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use tendril_core::engine::Engine;
use tendril_core::error::RenderError;
use tendril_core::host::{Host, IdleDeadline, IdleScheduler};
use tendril_core::scheduler::{Unbounded, WorkStatus};
use tendril_core::trace::{CycleSummary, Tracer};

/// Upper bound on slices run by one [`drive`] call.
pub const MAX_SLICES: u32 = 100_000;

/// Counts idle requests so a test or batch driver can honor them later.
#[derive(Clone, Debug, Default)]
pub struct IdleQueue {
    pending: Rc<Cell<u32>>,
}

impl IdleQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a scheduler that records requests in this queue.
    #[must_use]
    pub fn scheduler(&self) -> impl IdleScheduler + 'static {
        let pending = Rc::clone(&self.pending);
        move || pending.set(pending.get().saturating_add(1))
    }

    /// Returns the number of outstanding requests.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.pending.get()
    }

    /// Clears and returns the outstanding requests.
    pub fn take(&self) -> u32 {
        self.pending.replace(0)
    }
}

/// What a [`drive`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveReport {
    /// Slices run.
    pub slices: u32,
    /// Summaries of every cycle committed, in order.
    pub commits: Vec<CycleSummary>,
}

impl DriveReport {
    /// Returns the last committed cycle, if any.
    #[must_use]
    pub fn last_commit(&self) -> Option<&CycleSummary> {
        self.commits.last()
    }
}

/// Runs work-loop slices while `queue` holds requests, handing each slice a
/// fresh deadline from `next_deadline`.
///
/// # Errors
///
/// Returns the first render failure; slices already run stay applied.
///
/// # Panics
///
/// Panics after [`MAX_SLICES`] slices, which only happens when a component
/// requests a new render every time it renders.
pub fn drive<H, D>(
    engine: &mut Engine<H>,
    queue: &IdleQueue,
    mut next_deadline: impl FnMut() -> D,
    tracer: &mut Tracer<'_>,
) -> Result<DriveReport, RenderError<H::Error>>
where
    H: Host,
    D: IdleDeadline,
{
    let mut report = DriveReport::default();
    while queue.take() > 0 {
        assert!(
            report.slices < MAX_SLICES,
            "render loop did not settle after {MAX_SLICES} slices"
        );
        report.slices += 1;
        let deadline = next_deadline();
        if let WorkStatus::Committed(summary) = engine.work_loop(&deadline, tracer)? {
            report.commits.push(summary);
        }
    }
    Ok(report)
}

/// [`drive`] with [`Unbounded`] deadlines and no tracing.
///
/// # Errors
///
/// Returns the first render failure.
pub fn drive_unbounded<H: Host>(
    engine: &mut Engine<H>,
    queue: &IdleQueue,
) -> Result<DriveReport, RenderError<H::Error>> {
    drive(engine, queue, || Unbounded, &mut Tracer::none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_counts_requests() {
        let queue = IdleQueue::new();
        let scheduler = queue.scheduler();
        scheduler.request_idle();
        scheduler.request_idle();
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.take(), 2);
        assert_eq!(queue.pending(), 0);
    }
}
