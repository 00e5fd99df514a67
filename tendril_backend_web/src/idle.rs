// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestIdleCallback` slice source.
//!
//! [`IdleLoop`] runs a callback the next time the browser is idle. Unlike an
//! animation loop it does not re-register itself: every slice is one explicit
//! [`request`](IdleLoop::request), and requests made while one is already
//! outstanding are coalesced. The engine asks for slices through the
//! [`IdleScheduler`] returned by [`IdleLoop::scheduler`].
//!
//! The callback receives a [`BrowserDeadline`] wrapping the browser's
//! [`IdleDeadline`][mdn].
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/IdleDeadline

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use tendril_core::host::{IdleDeadline, IdleScheduler};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "requestIdleCallback")]
    fn request_idle_callback(callback: &JsValue) -> u32;

    #[wasm_bindgen(js_name = "cancelIdleCallback")]
    fn cancel_idle_callback(handle: u32);

    type RawIdleDeadline;

    #[wasm_bindgen(method, js_name = "timeRemaining")]
    fn time_remaining(this: &RawIdleDeadline) -> f64;
}

/// The browser's idle budget for one callback.
pub struct BrowserDeadline {
    raw: RawIdleDeadline,
}

impl IdleDeadline for BrowserDeadline {
    fn time_remaining(&self) -> f64 {
        self.raw.time_remaining()
    }
}

impl core::fmt::Debug for BrowserDeadline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BrowserDeadline")
            .field("time_remaining", &self.raw.time_remaining())
            .finish()
    }
}

type IdleClosure = Closure<dyn FnMut(JsValue)>;

struct IdleInner {
    /// The JS closure registered with `requestIdleCallback`.
    closure: RefCell<Option<IdleClosure>>,

    /// Runs one slice.
    callback: RefCell<Box<dyn FnMut(&BrowserDeadline)>>,

    /// Handle of the outstanding request.
    pending: Cell<Option<u32>>,
}

impl IdleInner {
    fn request(&self) {
        if self.pending.get().is_some() {
            return;
        }
        if let Some(ref closure) = *self.closure.borrow() {
            let id = request_idle_callback(closure.as_ref().unchecked_ref());
            self.pending.set(Some(id));
        }
    }
}

/// A one-shot, coalescing `requestIdleCallback` registration.
pub struct IdleLoop {
    inner: Rc<IdleInner>,
}

impl IdleLoop {
    /// Creates a loop with nothing requested.
    ///
    /// `callback` runs once per honored [`request`](Self::request). It may
    /// request again (directly or through the engine's scheduler).
    pub fn new(callback: impl FnMut(&BrowserDeadline) + 'static) -> Self {
        let inner = Rc::new(IdleInner {
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |raw: JsValue| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending.set(None);
            let deadline = BrowserDeadline {
                raw: raw.unchecked_into(),
            };
            inner.callback.borrow_mut()(&deadline);
        }) as Box<dyn FnMut(JsValue)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Asks for one callback when the browser is next idle. A no-op while a
    /// request is outstanding.
    pub fn request(&self) {
        self.inner.request();
    }

    /// Cancels the outstanding request, if any.
    pub fn cancel(&self) {
        if let Some(id) = self.inner.pending.take() {
            cancel_idle_callback(id);
        }
    }

    /// Returns `true` while a request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Returns a scheduler that requests callbacks from this loop.
    ///
    /// It holds the loop weakly and does nothing once the loop is dropped.
    #[must_use]
    pub fn scheduler(&self) -> impl IdleScheduler + 'static {
        let weak: Weak<IdleInner> = Rc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                inner.request();
            }
        }
    }
}

impl Drop for IdleLoop {
    fn drop(&mut self) {
        self.cancel();
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for IdleLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleLoop")
            .field("pending", &self.inner.pending.get())
            .finish_non_exhaustive()
    }
}
