// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-fiber hook storage.
//!
//! Every function-component fiber carries an ordered list of hook cells. A
//! component reaches its cells through the [`Hooks`] cursor it is handed on
//! each invocation; the cursor position is the cell's identity, so the
//! sequence of hook calls must not change between renders. The cursor checks
//! this and reports [`HookError`] instead of silently misattributing state.
//!
//! # State updates
//!
//! [`Setter::update`] pushes an update function into the cell's queue and
//! requests a new render cycle. The queue is shared by every generation of the
//! cell. A render folds all pending updates over the last committed state
//! without consuming them; the updates are dropped from the queue only when
//! the fiber that applied them commits. An abandoned walk therefore never
//! loses an update, and setters captured by older renders keep working.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use crate::error::HookError;
use crate::scheduler::RenderSignal;

type Update = Rc<dyn Fn(&dyn Any) -> Option<Rc<dyn Any>>>;

/// Pending updates of one hook cell.
#[derive(Default)]
pub(crate) struct UpdateQueue {
    pending: RefCell<Vec<Update>>,
}

impl UpdateQueue {
    fn push(&self, update: Update) {
        self.pending.borrow_mut().push(update);
    }

    fn snapshot(&self) -> Vec<Update> {
        self.pending.borrow().clone()
    }

    fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Drops the `n` oldest updates.
    pub(crate) fn consume(&self, n: usize) {
        let mut pending = self.pending.borrow_mut();
        let n = n.min(pending.len());
        pending.drain(..n);
    }
}

/// One state slot.
#[derive(Clone)]
pub(crate) struct HookCell {
    pub(crate) state: Rc<dyn Any>,
    pub(crate) queue: Rc<UpdateQueue>,
    /// Number of queued updates folded into `state` by this render.
    pub(crate) applied: usize,
}

impl HookCell {
    /// Drops the updates this cell folded in. Called once the owning fiber
    /// has committed.
    pub(crate) fn settle(&mut self) {
        self.queue.consume(self.applied);
        self.applied = 0;
    }
}

impl fmt::Debug for HookCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCell")
            .field("pending", &self.queue.len())
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

/// Hook cursor handed to a component while it renders.
///
/// Cells are matched to the previous render's cells by call position.
pub struct Hooks<'a> {
    component: &'static str,
    previous: &'a [HookCell],
    mounted: bool,
    cells: Vec<HookCell>,
    signal: &'a Rc<RenderSignal>,
}

impl fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("component", &self.component)
            .field("position", &self.cells.len())
            .field("previous", &self.previous.len())
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl<'a> Hooks<'a> {
    /// `previous` holds the alternate fiber's cells; `mounted` is whether the
    /// fiber has an alternate at all (a fiber that rendered zero hooks last
    /// time must render zero again).
    pub(crate) fn new(
        component: &'static str,
        previous: &'a [HookCell],
        mounted: bool,
        signal: &'a Rc<RenderSignal>,
    ) -> Self {
        Self {
            component,
            previous,
            mounted,
            cells: Vec::new(),
            signal,
        }
    }

    /// Returns the current cursor position (number of hooks called so far).
    #[must_use]
    pub fn position(&self) -> usize {
        self.cells.len()
    }

    /// Returns the state at this position and a setter for it.
    ///
    /// On the first render the state is `initial`. On later renders it is the
    /// last committed state with all pending updates applied in order.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when this call does not line up with the previous
    /// render's calls.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        initial: T,
    ) -> Result<(T, Setter<T>), HookError> {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state), but computes the initial state
    /// only on the first render.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] when this call does not line up with the previous
    /// render's calls.
    pub fn use_state_with<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, Setter<T>), HookError> {
        let index = self.cells.len();
        let cell = self.state_cell(index, init)?;
        let value = cell
            .state
            .downcast_ref::<T>()
            .cloned()
            .ok_or(self.type_changed(index))?;
        let setter = Setter {
            queue: Rc::clone(&cell.queue),
            signal: Rc::clone(self.signal),
            _marker: PhantomData,
        };
        self.cells.push(cell);
        Ok((value, setter))
    }

    fn state_cell<T: 'static>(
        &self,
        index: usize,
        init: impl FnOnce() -> T,
    ) -> Result<HookCell, HookError> {
        let Some(prev) = self.previous.get(index) else {
            if self.mounted {
                return Err(HookError::UnstableOrder {
                    component: self.component,
                    previous: self.previous.len(),
                    current: index + 1,
                });
            }
            return Ok(HookCell {
                state: Rc::new(init()),
                queue: Rc::default(),
                applied: 0,
            });
        };

        if !prev.state.is::<T>() {
            return Err(self.type_changed(index));
        }
        let pending = prev.queue.snapshot();
        let mut state = Rc::clone(&prev.state);
        for update in &pending {
            state = (**update)(&*state).ok_or(self.type_changed(index))?;
        }
        Ok(HookCell {
            state,
            queue: Rc::clone(&prev.queue),
            applied: pending.len(),
        })
    }

    fn type_changed(&self, index: usize) -> HookError {
        HookError::StateTypeChanged {
            component: self.component,
            index,
        }
    }

    /// Ends the render and returns the new cell list.
    pub(crate) fn finish(self) -> Result<Vec<HookCell>, HookError> {
        if self.mounted && self.cells.len() != self.previous.len() {
            return Err(HookError::UnstableOrder {
                component: self.component,
                previous: self.previous.len(),
                current: self.cells.len(),
            });
        }
        Ok(self.cells)
    }
}

/// Updater returned by [`Hooks::use_state`].
///
/// Calling it queues an update and asks the engine for a new render cycle
/// rooted at the current committed tree.
pub struct Setter<T> {
    queue: Rc<UpdateQueue>,
    signal: Rc<RenderSignal>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            signal: Rc::clone(&self.signal),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Setter<T> {
    /// Queues `f` to compute the next state from the current one.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.queue.push(Rc::new(move |state: &dyn Any| {
            state
                .downcast_ref::<T>()
                .map(|value| Rc::new(f(value)) as Rc<dyn Any>)
        }));
        self.signal.request();
    }

    /// Queues a replacement of the state with `value`.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(move |_| value.clone());
    }

    /// Returns the number of updates not yet committed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
