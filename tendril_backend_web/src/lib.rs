// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for tendril.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`DomHost`]: the [`Host`] implementation over `web_sys`
//! - [`IdleLoop`]: `requestIdleCallback` slice source
//! - [`mount`]: wires both to an engine and starts the first render
//!
//! Render failures surfaced by idle slices have no caller to return to, so
//! [`mount`] reports them with `console.error`.

#![no_std]

extern crate alloc;

mod dom;
mod idle;

pub use dom::{DomError, DomHost};
pub use idle::{BrowserDeadline, IdleLoop};
pub use tendril_core::host::Host;

use alloc::format;
use alloc::rc::Rc;
use core::cell::RefCell;

use tendril_core::element::Element;
use tendril_core::engine::Engine;
use tendril_core::scheduler::SchedulerConfig;
use tendril_core::trace::Tracer;

/// A tree mounted into a DOM container.
///
/// Dropping the handle cancels any outstanding idle callback; the DOM nodes
/// already committed stay in place.
pub struct Mount {
    engine: Rc<RefCell<Engine<DomHost>>>,
    container: web_sys::Node,
    idle: IdleLoop,
}

impl core::fmt::Debug for Mount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mount")
            .field("engine", &self.engine)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

impl Mount {
    /// Replaces the mounted tree with `element`.
    pub fn render(&self, element: impl Into<Element>) {
        self.engine
            .borrow_mut()
            .render(element, self.container.clone());
    }

    /// Returns `true` while a cycle is started but not committed.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.engine.borrow().has_pending_work()
    }

    /// Returns the idle loop driving this mount.
    #[must_use]
    pub fn idle_loop(&self) -> &IdleLoop {
        &self.idle
    }
}

/// Renders `element` into `container`, one idle slice at a time.
///
/// # Errors
///
/// Returns [`DomError::NoDocument`] outside a browser window.
pub fn mount(
    element: impl Into<Element>,
    container: &web_sys::Element,
) -> Result<Mount, DomError> {
    mount_with(element, container, SchedulerConfig::idle_callback())
}

/// [`mount`] with an explicit [`SchedulerConfig`].
///
/// # Errors
///
/// Returns [`DomError::NoDocument`] outside a browser window.
pub fn mount_with(
    element: impl Into<Element>,
    container: &web_sys::Element,
    config: SchedulerConfig,
) -> Result<Mount, DomError> {
    let engine = Rc::new(RefCell::new(Engine::new(DomHost::new()?, config)));

    let weak = Rc::downgrade(&engine);
    let idle = IdleLoop::new(move |deadline| {
        let Some(engine) = weak.upgrade() else {
            return;
        };
        let result = engine
            .borrow_mut()
            .work_loop(deadline, &mut Tracer::none());
        if let Err(error) = result {
            web_sys::console::error_1(&format!("tendril: render failed: {error}").into());
        }
    });

    let container: web_sys::Node = container.clone().into();
    {
        let mut engine = engine.borrow_mut();
        engine.set_idle_scheduler(idle.scheduler());
        engine.render(element, container.clone());
    }

    Ok(Mount {
        engine,
        container,
        idle,
    })
}
