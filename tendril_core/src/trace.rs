// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render cycles.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! engine calls at each stage of a cycle. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`EffectRecord`] batches emitted
//!   at commit plus the corresponding `TraceSink` method.

use crate::element::ElementKind;
use crate::fiber::{Effect, FiberId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What started a render cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleCause {
    /// An explicit [`Engine::render`](crate::engine::Engine::render) call.
    Render,
    /// One or more state setters fired.
    StateUpdate,
}

/// Coarse kind of the fiber a unit of work processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// The container wrapper.
    Root,
    /// A host element.
    Host,
    /// A text leaf.
    Text,
    /// A function component.
    Component,
}

impl From<&ElementKind> for UnitKind {
    fn from(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Root => Self::Root,
            ElementKind::Host(_) => Self::Host,
            ElementKind::Text => Self::Text,
            ElementKind::Component(_) => Self::Component,
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a fresh work-in-progress root is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleStartEvent {
    /// Monotonic cycle counter.
    pub cycle: u64,
    /// What triggered the cycle.
    pub cause: CycleCause,
}

/// Emitted after each completed unit of work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// The fiber that was processed.
    pub fiber: FiberId,
    /// Its kind.
    pub kind: UnitKind,
    /// The effect reconciliation assigned to it.
    pub effect: Effect,
}

/// Emitted when a slice suspends with work remaining.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YieldEvent {
    /// Cycle counter.
    pub cycle: u64,
    /// Units completed in this slice.
    pub units: u32,
    /// Idle time the deadline reported at the decision point.
    pub time_remaining_ms: f64,
}

/// Emitted when a trigger discards a walk that had not committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbandonEvent {
    /// The abandoned cycle.
    pub cycle: u64,
    /// Units it had completed.
    pub units: u32,
}

/// Per-cycle summary emitted after commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Cycle counter.
    pub cycle: u64,
    /// What triggered the cycle.
    pub cause: Option<CycleCause>,
    /// Total units of work across all slices.
    pub units: u32,
    /// Number of times the walk yielded.
    pub yields: u32,
    /// Fibers committed with [`Effect::Placement`].
    pub placements: u32,
    /// Host fibers committed with [`Effect::Update`].
    pub updates: u32,
    /// Updates that applied at least one host primitive.
    pub changed_updates: u32,
    /// Fibers in the deletion list.
    pub deletions: u32,
}

/// One committed effect (requires `trace-rich` feature).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectRecord {
    /// The committed fiber. Deleted fibers' handles are stale by the time the
    /// record is delivered.
    pub fiber: FiberId,
    /// What was applied.
    pub effect: Effect,
    /// Number of host primitives the effect issued.
    pub operations: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a cycle starts.
    fn on_cycle_start(&mut self, e: &CycleStartEvent) {
        _ = e;
    }

    /// Called after each unit of work.
    fn on_unit(&mut self, e: &UnitEvent) {
        _ = e;
    }

    /// Called when a slice yields.
    fn on_yield(&mut self, e: &YieldEvent) {
        _ = e;
    }

    /// Called when an uncommitted walk is discarded.
    fn on_abandon(&mut self, e: &AbandonEvent) {
        _ = e;
    }

    /// Called with the summary of a committed cycle.
    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        _ = s;
    }

    /// Called with every effect applied by a commit (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_effects(&mut self, cycle: u64, effects: &[EffectRecord]) {
        _ = (cycle, effects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`CycleStartEvent`].
    #[inline]
    pub fn cycle_start(&mut self, e: &CycleStartEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cycle_start(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`UnitEvent`].
    #[inline]
    pub fn unit(&mut self, e: &UnitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_unit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`YieldEvent`].
    #[inline]
    pub fn yielded(&mut self, e: &YieldEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_yield(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AbandonEvent`].
    #[inline]
    pub fn abandon(&mut self, e: &AbandonEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_abandon(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CycleSummary`].
    #[inline]
    pub fn cycle_summary(&mut self, s: &CycleSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_cycle_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits committed effects (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn effects(&mut self, cycle: u64, effects: &[EffectRecord]) {
        if let Some(s) = &mut self.sink {
            s.on_effects(cycle, effects);
        }
    }

    /// Returns whether a sink is attached.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
