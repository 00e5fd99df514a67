// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{FiberId, INVALID};
use super::store::FiberStore;

/// An iterator over the direct children of a fiber.
///
/// Created by [`FiberStore::children`].
#[derive(Debug)]
pub struct Children<'a, N> {
    store: &'a FiberStore<N>,
    current: u32,
}

impl<'a, N> Children<'a, N> {
    pub(crate) fn new(store: &'a FiberStore<N>, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl<N> Iterator for Children<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.handle(idx))
    }
}

/// Pre-order walk over a subtree, in the same order the work loop visits
/// fibers. Yields raw slot indices, starting with the root itself.
#[derive(Debug)]
pub(crate) struct Descendants<'a, N> {
    store: &'a FiberStore<N>,
    root: u32,
    current: u32,
}

impl<'a, N> Descendants<'a, N> {
    pub(crate) fn new(store: &'a FiberStore<N>, root: u32) -> Self {
        Self {
            store,
            root,
            current: root,
        }
    }
}

impl<N> Iterator for Descendants<'_, N> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_in_walk(idx, self.root);
        Some(idx)
    }
}
