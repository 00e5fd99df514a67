// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Positional child reconciliation.
//!
//! The new child descriptors of a fiber are matched against the old child
//! chain (the children of the fiber's alternate) strictly by position; there
//! are no keys. At each position:
//!
//! | old fiber | descriptor | outcome |
//! |---|---|---|
//! | same kind | present | new fiber, [`Effect::Update`], reuses the host node |
//! | absent | present | new fiber, [`Effect::Placement`] |
//! | present | absent | old fiber marked [`Effect::Deletion`] |
//! | other kind | present | both a placement and a deletion |
//!
//! Deleted fibers are not linked into the new tree; they are appended to the
//! caller's deletion list and removed from the host at commit.

use alloc::vec::Vec;

use crate::element::Element;
use crate::fiber::{Effect, FiberId, FiberStore, INVALID};

/// Builds the child chain of `parent` from `elements`.
///
/// Any existing child links of `parent` are replaced.
///
/// # Panics
///
/// Panics if `parent` is a stale handle.
pub fn reconcile_children<N: Clone>(
    store: &mut FiberStore<N>,
    parent: FiberId,
    elements: &[Element],
    deletions: &mut Vec<FiberId>,
) {
    assert!(store.is_alive(parent), "stale fiber handle {parent:?}");
    let p = parent.idx as usize;
    let alt = store.alternate[p];
    let mut old = if alt == INVALID {
        INVALID
    } else {
        store.first_child[alt as usize]
    };
    store.first_child[p] = INVALID;

    let mut prev = INVALID;
    let mut elements = elements.iter();
    loop {
        let element = elements.next();
        if element.is_none() && old == INVALID {
            break;
        }

        let same_kind = match element {
            Some(e) if old != INVALID => store.element_at(old).kind() == e.kind(),
            _ => false,
        };

        if let Some(e) = element {
            let alternate = same_kind.then(|| store.handle(old));
            let fresh = store.create_child(e.clone(), parent, alternate).idx;
            if prev == INVALID {
                store.first_child[p] = fresh;
            } else {
                store.next_sibling[prev as usize] = fresh;
            }
            prev = fresh;
        }

        if old != INVALID {
            if !same_kind {
                store.effect[old as usize] = Effect::Deletion;
                deletions.push(store.handle(old));
            }
            old = store.next_sibling[old as usize];
        }
    }
}
