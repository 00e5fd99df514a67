// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for presentation-tree integrations.
//!
//! The engine never touches a real presentation tree directly. A *host*
//! provides three pieces:
//!
//! - **Mutation primitives**: the [`Host`] trait. Create nodes, set and clear
//!   properties, bind and unbind listeners, append and remove children.
//!   Implemented by the in-memory document in `tendril_headless` and the DOM
//!   adapter in `tendril_backend_web`.
//!
//! - **Idle budget**: an [`IdleDeadline`] handed to each
//!   [`Engine::work_loop`](crate::engine::Engine::work_loop) slice, queried
//!   once per completed unit of work.
//!
//! - **Idle scheduling**: an [`IdleScheduler`] the engine calls whenever it
//!   needs another slice (a new render, a yield, or a state update). The host
//!   answers by calling `work_loop` again when it is next idle.
//!
//! # Loop pseudocode
//!
//! ```rust,ignore
//! engine.set_idle_scheduler(move || request_idle_callback(on_idle));
//! engine.render(app(), container)?;
//!
//! fn on_idle(deadline: &dyn IdleDeadline) {
//!     match engine.work_loop(deadline, &mut Tracer::none()) {
//!         Ok(WorkStatus::Committed(summary)) => { /* tree is on screen */ }
//!         Ok(_) => { /* engine already asked for another slice if needed */ }
//!         Err(e) => report(e),
//!     }
//! }
//! ```

use crate::element::{AttrValue, Handler};

/// What kind of node [`Host::create_node`] should create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// An element with the given tag name.
    Element(&'a str),
    /// A text node; its content arrives through a
    /// [`TEXT_VALUE_KEY`](crate::element::TEXT_VALUE_KEY) property.
    Text,
}

/// Imperative primitives over a real presentation tree.
///
/// Every primitive may fail; the engine propagates the first failure to its
/// caller as [`RenderError::Host`](crate::error::RenderError::Host) and does
/// not retry.
pub trait Host {
    /// Handle to a node in the presentation tree.
    type Node: Clone;
    /// Error reported by a failed primitive.
    type Error;

    /// Creates a detached node.
    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<Self::Node, Self::Error>;

    /// Sets property `key` to `value`.
    fn set_property(
        &mut self,
        node: &Self::Node,
        key: &str,
        value: &AttrValue,
    ) -> Result<(), Self::Error>;

    /// Resets property `key` to empty.
    fn clear_property(&mut self, node: &Self::Node, key: &str) -> Result<(), Self::Error>;

    /// Binds `handler` to `event` on `node`.
    fn add_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), Self::Error>;

    /// Unbinds a handler previously bound with [`add_listener`](Self::add_listener).
    fn remove_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), Self::Error>;

    /// Appends `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;

    /// Detaches `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;
}

/// The idle budget of one work-loop slice.
pub trait IdleDeadline {
    /// Milliseconds of idle time left in this slice. Informative only; need
    /// not be precise, but should not increase within a slice.
    fn time_remaining(&self) -> f64;
}

/// Asks the host to run another work-loop slice when it is next idle.
///
/// Implemented for any `Fn()`, so a closure calling the platform's idle
/// callback primitive is enough.
pub trait IdleScheduler {
    /// Requests one future [`Engine::work_loop`](crate::engine::Engine::work_loop)
    /// call. Must not call into the engine synchronously.
    fn request_idle(&self);
}

impl<F: Fn()> IdleScheduler for F {
    fn request_idle(&self) {
        self();
    }
}
