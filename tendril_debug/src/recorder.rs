// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the
//! microseconds elapsed since the recorder was created. [`decode`] reads them
//! back as an iterator of [`Record`].
//!
//! [`on_effects`](TraceSink::on_effects) stores only the record count and the
//! total number of host operations.

use std::time::Instant;

use tendril_core::fiber::Effect;
use tendril_core::trace::{
    AbandonEvent, CycleCause, CycleStartEvent, CycleSummary, EffectRecord, TraceSink, UnitEvent,
    UnitKind, YieldEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_CYCLE_START: u8 = 1;
const TAG_UNIT: u8 = 2;
const TAG_YIELD: u8 = 3;
const TAG_ABANDON: u8 = 4;
const TAG_CYCLE_SUMMARY: u8 = 5;
const TAG_EFFECTS_COUNT: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    epoch: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose timestamps start now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            epoch: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let elapsed = u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(elapsed);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_cause(&mut self, cause: Option<CycleCause>) {
        self.write_u8(match cause {
            None => 0,
            Some(CycleCause::Render) => 1,
            Some(CycleCause::StateUpdate) => 2,
        });
    }

    fn write_kind(&mut self, kind: UnitKind) {
        self.write_u8(match kind {
            UnitKind::Root => 0,
            UnitKind::Host => 1,
            UnitKind::Text => 2,
            UnitKind::Component => 3,
        });
    }

    fn write_effect(&mut self, effect: Effect) {
        self.write_u8(match effect {
            Effect::None => 0,
            Effect::Placement => 1,
            Effect::Update => 2,
            Effect::Deletion => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_cycle_start(&mut self, e: &CycleStartEvent) {
        self.begin(TAG_CYCLE_START);
        self.write_u64(e.cycle);
        self.write_cause(Some(e.cause));
    }

    fn on_unit(&mut self, e: &UnitEvent) {
        self.begin(TAG_UNIT);
        self.write_u64(e.cycle);
        self.write_u32(e.fiber.index());
        self.write_u32(e.fiber.generation());
        self.write_kind(e.kind);
        self.write_effect(e.effect);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.begin(TAG_YIELD);
        self.write_u64(e.cycle);
        self.write_u32(e.units);
        self.write_f64(e.time_remaining_ms);
    }

    fn on_abandon(&mut self, e: &AbandonEvent) {
        self.begin(TAG_ABANDON);
        self.write_u64(e.cycle);
        self.write_u32(e.units);
    }

    fn on_cycle_summary(&mut self, s: &CycleSummary) {
        self.begin(TAG_CYCLE_SUMMARY);
        self.write_u64(s.cycle);
        self.write_cause(s.cause);
        self.write_u32(s.units);
        self.write_u32(s.yields);
        self.write_u32(s.placements);
        self.write_u32(s.updates);
        self.write_u32(s.changed_updates);
        self.write_u32(s.deletions);
    }

    fn on_effects(&mut self, cycle: u64, effects: &[EffectRecord]) {
        self.begin(TAG_EFFECTS_COUNT);
        self.write_u64(cycle);
        self.write_u32(u32::try_from(effects.len()).unwrap_or(u32::MAX));
        let operations = effects
            .iter()
            .fold(0_u32, |acc, r| acc.saturating_add(r.operations));
        self.write_u32(operations);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A unit of work as recorded. Fiber handles are kept as raw parts because
/// they are only meaningful inside the store that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedUnit {
    /// Cycle counter.
    pub cycle: u64,
    /// Slot index of the processed fiber.
    pub fiber_index: u32,
    /// Generation of the processed fiber.
    pub fiber_generation: u32,
    /// Its kind.
    pub kind: UnitKind,
    /// The effect reconciliation assigned to it.
    pub effect: Effect,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`CycleStartEvent`].
    CycleStart(CycleStartEvent),
    /// A [`UnitEvent`].
    Unit(RecordedUnit),
    /// A [`YieldEvent`].
    Yield(YieldEvent),
    /// An [`AbandonEvent`].
    Abandon(AbandonEvent),
    /// A [`CycleSummary`].
    CycleSummary(CycleSummary),
    /// Effect-record totals for a commit.
    EffectsCount {
        /// Cycle counter.
        cycle: u64,
        /// Number of effect records.
        count: u32,
        /// Host operations across all records.
        operations: u32,
    },
}

/// A decoded event with its timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Microseconds since the recorder was created.
    pub at_us: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_cause(&mut self) -> Option<Option<CycleCause>> {
        Some(match self.read_u8()? {
            0 => None,
            1 => Some(CycleCause::Render),
            _ => Some(CycleCause::StateUpdate),
        })
    }

    fn read_kind(&mut self) -> Option<UnitKind> {
        Some(match self.read_u8()? {
            0 => UnitKind::Root,
            1 => UnitKind::Host,
            2 => UnitKind::Text,
            _ => UnitKind::Component,
        })
    }

    fn read_effect(&mut self) -> Option<Effect> {
        Some(match self.read_u8()? {
            0 => Effect::None,
            1 => Effect::Placement,
            2 => Effect::Update,
            _ => Effect::Deletion,
        })
    }

    fn decode_cycle_start(&mut self) -> Option<RecordedEvent> {
        let cycle = self.read_u64()?;
        let cause = self.read_cause()?.unwrap_or(CycleCause::Render);
        Some(RecordedEvent::CycleStart(CycleStartEvent { cycle, cause }))
    }

    fn decode_unit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Unit(RecordedUnit {
            cycle: self.read_u64()?,
            fiber_index: self.read_u32()?,
            fiber_generation: self.read_u32()?,
            kind: self.read_kind()?,
            effect: self.read_effect()?,
        }))
    }

    fn decode_yield(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Yield(YieldEvent {
            cycle: self.read_u64()?,
            units: self.read_u32()?,
            time_remaining_ms: self.read_f64()?,
        }))
    }

    fn decode_abandon(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Abandon(AbandonEvent {
            cycle: self.read_u64()?,
            units: self.read_u32()?,
        }))
    }

    fn decode_cycle_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CycleSummary(CycleSummary {
            cycle: self.read_u64()?,
            cause: self.read_cause()?,
            units: self.read_u32()?,
            yields: self.read_u32()?,
            placements: self.read_u32()?,
            updates: self.read_u32()?,
            changed_updates: self.read_u32()?,
            deletions: self.read_u32()?,
        }))
    }

    fn decode_effects_count(&mut self) -> Option<RecordedEvent> {
        let cycle = self.read_u64()?;
        let count = self.read_u32()?;
        let operations = self.read_u32()?;
        Some(RecordedEvent::EffectsCount {
            cycle,
            count,
            operations,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_us = self.read_u64()?;
        let event = match tag {
            TAG_CYCLE_START => self.decode_cycle_start(),
            TAG_UNIT => self.decode_unit(),
            TAG_YIELD => self.decode_yield(),
            TAG_ABANDON => self.decode_abandon(),
            TAG_CYCLE_SUMMARY => self.decode_cycle_summary(),
            TAG_EFFECTS_COUNT => self.decode_effects_count(),
            _ => None,
        }?;
        Some(Record { at_us, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
