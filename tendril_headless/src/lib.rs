// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless host for tendril.
//!
//! This crate provides a [`Document`], an in-memory presentation tree that
//! implements [`Host`](tendril_core::host::Host) with strict DOM-like checks
//! and a mutation log, plus an [`IdleQueue`] that stands in for a platform
//! idle callback. Together they run the engine deterministically: tests can
//! hand each slice a [`CountdownDeadline`](tendril_core::scheduler::CountdownDeadline)
//! to force yields at exact unit boundaries.
//!
//! ```rust,ignore
//! let mut app = Headless::new(SchedulerConfig::default());
//! app.render(h("div").attr("id", "foo").child("hello"));
//! app.run_until_idle()?;
//! assert_eq!(app.markup(), "<div id=\"foo\">hello</div>");
//! ```

#![no_std]

extern crate alloc;

mod document;
mod idle;


pub use document::{Document, HeadlessError, Mutation, NodeId, ROOT_TAG};
pub use idle::{DriveReport, IdleQueue, MAX_SLICES, drive, drive_unbounded};

use alloc::string::String;

use tendril_core::element::Element;
use tendril_core::engine::Engine;
use tendril_core::error::RenderError;
use tendril_core::host::IdleDeadline;
use tendril_core::scheduler::{SchedulerConfig, WorkStatus};
use tendril_core::trace::Tracer;

/// An engine over a [`Document`] with its idle queue already wired.
#[derive(Debug)]
pub struct Headless {
    engine: Engine<Document>,
    queue: IdleQueue,
}

impl Headless {
    /// Creates an empty document and engine.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let queue = IdleQueue::new();
        let mut engine = Engine::new(Document::new(), config);
        engine.set_idle_scheduler(queue.scheduler());
        Self { engine, queue }
    }

    /// Starts rendering `element` into the document root.
    pub fn render(&mut self, element: impl Into<Element>) {
        let root = self.engine.host().root();
        self.engine.render(element, root);
    }

    /// Runs one slice with `deadline` if a slice was requested.
    ///
    /// # Errors
    ///
    /// Returns the render failure of the slice.
    pub fn step(
        &mut self,
        deadline: &dyn IdleDeadline,
    ) -> Result<WorkStatus, RenderError<HeadlessError>> {
        if self.queue.take() == 0 {
            return Ok(WorkStatus::Idle);
        }
        self.engine.work_loop(deadline, &mut Tracer::none())
    }

    /// Runs slices until nothing is requested; see [`drive`].
    ///
    /// # Errors
    ///
    /// Returns the first render failure.
    pub fn drive<D: IdleDeadline>(
        &mut self,
        next_deadline: impl FnMut() -> D,
        tracer: &mut Tracer<'_>,
    ) -> Result<DriveReport, RenderError<HeadlessError>> {
        drive(&mut self.engine, &self.queue, next_deadline, tracer)
    }

    /// Runs slices with unbounded deadlines until nothing is requested.
    ///
    /// # Errors
    ///
    /// Returns the first render failure.
    pub fn run_until_idle(&mut self) -> Result<DriveReport, RenderError<HeadlessError>> {
        drive_unbounded(&mut self.engine, &self.queue)
    }

    /// Returns the markup of everything under the document root.
    #[must_use]
    pub fn markup(&self) -> String {
        let doc = self.document();
        doc.children(doc.root())
            .iter()
            .map(|&child| doc.to_markup(child))
            .collect()
    }

    /// Returns the document.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.engine.host()
    }

    /// Returns the document mutably (e.g. to drain its mutation log).
    pub fn document_mut(&mut self) -> &mut Document {
        self.engine.host_mut()
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &Engine<Document> {
        &self.engine
    }

    /// Returns the engine mutably.
    pub fn engine_mut(&mut self) -> &mut Engine<Document> {
        &mut self.engine
    }

    /// Returns the idle queue.
    #[must_use]
    pub fn queue(&self) -> &IdleQueue {
        &self.queue
    }
}
