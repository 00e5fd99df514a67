// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental fiber reconciliation with cooperative idle-time scheduling.
//!
//! `tendril_core` turns immutable element trees into mutations of a live
//! presentation tree, doing the work in small units so the host's event loop
//! is never blocked for long. It is `no_std` compatible (with `alloc`) and
//! keeps every fiber in struct-of-arrays storage addressed by generational
//! handles.
//!
//! # Architecture
//!
//! ```text
//!   h("div").child(..)  ──► Element tree
//!                               │
//!   Engine::render() ───────────┤        Setter::update()
//!                               ▼               │
//!              work-in-progress root ◄──────────┘
//!                               │
//!   Engine::work_loop(deadline) │  one fiber per unit:
//!                               │  components render, hosts get nodes,
//!                               │  reconcile_children() classifies effects
//!                               ▼
//!              walk exhausted ──► commit: deletions, placements, updates
//!                                        │
//!                                        ▼
//!                               Host primitives (DOM, headless document)
//! ```
//!
//! **[`element`]** — Immutable descriptors and the builder (`h`, `text`,
//! `component`) that produces them.
//!
//! **[`fiber`]** — Struct-of-arrays fiber store holding the current and
//! work-in-progress trees side by side, linked through `alternate`.
//!
//! **[`reconcile`]** — Positional child diff assigning placement, update,
//! and deletion effects.
//!
//! **[`hooks`]** — Per-fiber ordered state cells reached through a
//! [`Hooks`](hooks::Hooks) cursor, with order validation.
//!
//! **[`engine`]** — The cycle state machine: unit of work, slicing, restart,
//! and commit.
//!
//! **[`commit`]** — Attribute diffing onto host nodes and the atomic commit
//! pass.
//!
//! **[`host`]** — The [`Host`](host::Host) trait that presentation backends
//! implement, plus the idle deadline and scheduling hooks.
//!
//! **[`scheduler`]** — Slice configuration and deadlines.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! cycle instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-fiber
//!   effect records emitted at commit.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod commit;
pub mod element;
pub mod engine;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod reconcile;
pub mod scheduler;
pub mod trace;
