// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Per-unit
//! lines are only written when the sink is built [`verbose`](PrettyPrintSink::verbose).

use std::io::Write;

use tendril_core::fiber::Effect;
use tendril_core::trace::{
    AbandonEvent, CycleCause, CycleStartEvent, CycleSummary, EffectRecord, TraceSink, UnitEvent,
    UnitKind, YieldEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            verbose: false,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also writes a line for every unit of work.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn cause_name(cause: CycleCause) -> &'static str {
    match cause {
        CycleCause::Render => "render",
        CycleCause::StateUpdate => "state",
    }
}

fn kind_name(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Root => "root",
        UnitKind::Host => "host",
        UnitKind::Text => "text",
        UnitKind::Component => "component",
    }
}

fn effect_name(effect: Effect) -> &'static str {
    match effect {
        Effect::None => "-",
        Effect::Placement => "place",
        Effect::Update => "update",
        Effect::Deletion => "delete",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_cycle_start(&mut self, e: &CycleStartEvent) {
        let _ = writeln!(
            self.writer,
            "[start] cycle={} cause={}",
            e.cycle,
            cause_name(e.cause),
        );
    }

    fn on_unit(&mut self, e: &UnitEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[unit] cycle={} fiber={} {} {}",
            e.cycle,
            e.fiber.index(),
            kind_name(e.kind),
            effect_name(e.effect),
        );
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        let _ = writeln!(
            self.writer,
            "[yield] cycle={} units={} remaining={:.2}ms",
            e.cycle, e.units, e.time_remaining_ms,
        );
    }

    fn on_abandon(&mut self, e: &AbandonEvent) {
        let _ = writeln!(
            self.writer,
            "[abandon] cycle={} units={}",
            e.cycle, e.units,
        );
    }

    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        let cause = s.cause.map_or("?", cause_name);
        let _ = writeln!(
            self.writer,
            "[commit] cycle={} cause={cause} units={} yields={} \
             place={} update={} (changed {}) delete={}",
            s.cycle,
            s.units,
            s.yields,
            s.placements,
            s.updates,
            s.changed_updates,
            s.deletions,
        );
    }

    fn on_effects(&mut self, cycle: u64, effects: &[EffectRecord]) {
        let operations: u32 = effects.iter().map(|r| r.operations).sum();
        let _ = writeln!(
            self.writer,
            "[effects] cycle={cycle} records={} ops={operations}",
            effects.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_cycle() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_cycle_start(&CycleStartEvent {
            cycle: 1,
            cause: CycleCause::Render,
        });
        sink.on_cycle_summary(&CycleSummary {
            cycle: 1,
            cause: Some(CycleCause::Render),
            units: 3,
            placements: 2,
            ..CycleSummary::default()
        });
        let output = output(sink);
        assert!(output.contains("[start] cycle=1 cause=render"), "got: {output}");
        assert!(output.contains("[commit] cycle=1"), "got: {output}");
        assert!(output.contains("place=2"), "got: {output}");
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn yield_reports_remaining_time() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_yield(&YieldEvent {
            cycle: 4,
            units: 7,
            time_remaining_ms: 0.25,
        });
        let output = output(sink);
        assert_eq!(output, "[yield] cycle=4 units=7 remaining=0.25ms\n");
    }
}
