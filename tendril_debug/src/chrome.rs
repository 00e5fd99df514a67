// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//! Each render cycle becomes a duration slice that ends at its commit or at
//! the point it was abandoned; units, yields and effect totals are instants
//! inside it.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = record.at_us;
        match record.event {
            RecordedEvent::CycleStart(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("cycle {}", e.cycle),
                    "cat": "Cycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "cycle": e.cycle,
                        "cause": format!("{:?}", e.cause),
                    }
                }));
            }
            RecordedEvent::Unit(u) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", u.kind),
                    "cat": "Unit",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "cycle": u.cycle,
                        "fiber": u.fiber_index,
                        "effect": format!("{:?}", u.effect),
                    }
                }));
            }
            RecordedEvent::Yield(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Yield",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "cycle": e.cycle,
                        "units": e.units,
                        "time_remaining_ms": e.time_remaining_ms,
                    }
                }));
            }
            RecordedEvent::Abandon(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("cycle {}", e.cycle),
                    "cat": "Cycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "abandoned": true,
                        "units": e.units,
                    }
                }));
            }
            RecordedEvent::CycleSummary(s) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("cycle {}", s.cycle),
                    "cat": "Cycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "abandoned": false,
                        "units": s.units,
                        "yields": s.yields,
                        "placements": s.placements,
                        "updates": s.updates,
                        "changed_updates": s.changed_updates,
                        "deletions": s.deletions,
                    }
                }));
            }
            RecordedEvent::EffectsCount {
                cycle,
                count,
                operations,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Effects",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "cycle": cycle,
                        "count": count,
                        "operations": operations,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use tendril_core::trace::{
        AbandonEvent, CycleCause, CycleStartEvent, CycleSummary, TraceSink, YieldEvent,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_cycle_start(&CycleStartEvent {
            cycle: 1,
            cause: CycleCause::Render,
        });
        rec.on_yield(&YieldEvent {
            cycle: 1,
            units: 2,
            time_remaining_ms: 0.0,
        });
        rec.on_cycle_summary(&CycleSummary {
            cycle: 1,
            cause: Some(CycleCause::Render),
            units: 5,
            yields: 1,
            ..CycleSummary::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        // The cycle opens a slice.
        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "cycle 1");
        assert_eq!(parsed[0]["args"]["cause"], "Render");

        assert_eq!(parsed[1]["ph"], "i");
        assert_eq!(parsed[1]["name"], "Yield");

        // Commit closes it.
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["name"], "cycle 1");
        assert_eq!(parsed[2]["args"]["abandoned"], false);
        assert_eq!(parsed[2]["args"]["units"], 5);
    }

    #[test]
    fn abandoned_cycle_closes_its_slice() {
        let mut rec = RecorderSink::new();
        rec.on_cycle_start(&CycleStartEvent {
            cycle: 2,
            cause: CycleCause::Render,
        });
        rec.on_abandon(&AbandonEvent { cycle: 2, units: 1 });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["ph"], "E");
        assert_eq!(parsed[1]["name"], "cycle 2");
        assert_eq!(parsed[1]["args"]["abandoned"], true);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
