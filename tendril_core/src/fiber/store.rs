// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays fiber storage with allocation, topology, and walk order.

use alloc::vec::Vec;
use core::fmt;

use crate::element::{Element, ElementKind};
use crate::hooks::HookCell;

use super::effect::Effect;
use super::id::{FiberId, INVALID};
use super::traverse::{Children, Descendants};

/// Struct-of-arrays storage for every live fiber of the current and
/// work-in-progress trees.
///
/// Fibers are addressed by [`FiberId`] handles. `first_child` and
/// `next_sibling` form the owning structure of each tree; `parent` and
/// `alternate` are back references. Freed slots are recycled through a free
/// list and generation counters reject stale handles.
pub struct FiberStore<N> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,

    // -- Diffing --
    pub(crate) alternate: Vec<u32>,
    pub(crate) effect: Vec<Effect>,

    // -- Payload --
    pub(crate) element: Vec<Option<Element>>,
    pub(crate) host_node: Vec<Option<N>>,
    pub(crate) hooks: Vec<Vec<HookCell>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl<N> fmt::Debug for FiberStore<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberStore")
            .field("slots", &self.len)
            .field("live", &self.live_count())
            .finish_non_exhaustive()
    }
}

impl<N> Default for FiberStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FiberStore<N> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            alternate: Vec::new(),
            effect: Vec::new(),
            element: Vec::new(),
            host_node: Vec::new(),
            hooks: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation --

    pub(crate) fn alloc(
        &mut self,
        element: Element,
        parent: u32,
        alternate: u32,
        host_node: Option<N>,
        effect: Effect,
    ) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = parent;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.alternate[i] = alternate;
            self.effect[i] = effect;
            self.element[i] = Some(element);
            self.host_node[i] = host_node;
            self.hooks[i] = Vec::new();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(parent);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.alternate.push(alternate);
            self.effect.push(effect);
            self.element.push(Some(element));
            self.host_node.push(host_node);
            self.hooks.push(Vec::new());
            self.generation.push(0);
            idx
        }
    }

    pub(crate) fn free(&mut self, idx: u32) {
        let i = idx as usize;
        debug_assert!(self.element[i].is_some(), "double free of fiber slot {idx}");
        self.element[i] = None;
        self.host_node[i] = None;
        self.hooks[i] = Vec::new();
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.alternate[i] = INVALID;
        self.effect[i] = Effect::None;
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.free_list.push(idx);
    }

    /// Frees `root` and every fiber reachable from it through child/sibling
    /// links. Returns the number of freed fibers.
    pub(crate) fn free_subtree(&mut self, root: u32) -> usize {
        let doomed: Vec<u32> = Descendants::new(self, root).collect();
        for &idx in &doomed {
            self.free(idx);
        }
        doomed.len()
    }

    /// Drops every `alternate` link in the tree under `root`.
    pub(crate) fn clear_alternates(&mut self, root: u32) {
        let mut idx = root;
        while idx != INVALID {
            self.alternate[idx as usize] = INVALID;
            idx = self.next_in_walk(idx, root);
        }
    }

    pub(crate) fn handle(&self, idx: u32) -> FiberId {
        FiberId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn handle_or_none(&self, idx: u32) -> Option<FiberId> {
        (idx != INVALID).then(|| self.handle(idx))
    }

    /// Returns whether the given handle refers to a live fiber.
    #[must_use]
    pub fn is_alive(&self, id: FiberId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.element[id.idx as usize].is_some()
    }

    /// Returns the number of live fibers across all trees.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    fn validate(&self, id: FiberId) {
        assert!(self.is_alive(id), "stale fiber handle {id:?}");
    }

    // -- Walk order --

    /// Returns the fiber visited after `idx` in a depth-first walk bounded by
    /// `root`: the first child, else the nearest next sibling found walking
    /// up through parents, else [`INVALID`] once the walk climbs back to
    /// `root`.
    pub(crate) fn next_in_walk(&self, idx: u32, root: u32) -> u32 {
        let child = self.first_child[idx as usize];
        if child != INVALID {
            return child;
        }
        let mut cur = idx;
        while cur != root && cur != INVALID {
            let sibling = self.next_sibling[cur as usize];
            if sibling != INVALID {
                return sibling;
            }
            cur = self.parent[cur as usize];
        }
        INVALID
    }

    /// Walks parents from `idx` (exclusive) to the nearest fiber owning a host
    /// node and returns that node.
    pub(crate) fn host_parent_of(&self, idx: u32) -> Option<&N> {
        let mut cur = self.parent[idx as usize];
        while cur != INVALID {
            if let Some(node) = &self.host_node[cur as usize] {
                return Some(node);
            }
            cur = self.parent[cur as usize];
        }
        None
    }

    pub(crate) fn element_at(&self, idx: u32) -> &Element {
        match &self.element[idx as usize] {
            Some(element) => element,
            None => panic!("fiber slot {idx} is free"),
        }
    }

    // -- Queries --

    /// Returns the parent of a fiber, if any.
    #[must_use]
    pub fn parent(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.handle_or_none(self.parent[id.idx as usize])
    }

    /// Returns the first child of a fiber, if any.
    #[must_use]
    pub fn child(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.handle_or_none(self.first_child[id.idx as usize])
    }

    /// Returns the next sibling of a fiber, if any.
    #[must_use]
    pub fn sibling(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.handle_or_none(self.next_sibling[id.idx as usize])
    }

    /// Returns the fiber occupying the same position in the other tree, if
    /// this fiber is part of a tree that has not been committed yet.
    #[must_use]
    pub fn alternate(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.handle_or_none(self.alternate[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a fiber.
    #[must_use]
    pub fn children(&self, id: FiberId) -> Children<'_, N> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the element this fiber was built from.
    #[must_use]
    pub fn element(&self, id: FiberId) -> &Element {
        self.validate(id);
        self.element_at(id.idx)
    }

    /// Returns the element kind of a fiber.
    #[must_use]
    pub fn kind(&self, id: FiberId) -> &ElementKind {
        self.element(id).kind()
    }

    /// Returns the host node owned by this fiber (absent for components).
    #[must_use]
    pub fn host_node(&self, id: FiberId) -> Option<&N> {
        self.validate(id);
        self.host_node[id.idx as usize].as_ref()
    }

    /// Returns the last effect recorded for this fiber.
    #[must_use]
    pub fn effect(&self, id: FiberId) -> Effect {
        self.validate(id);
        self.effect[id.idx as usize]
    }

    /// Returns the number of hook cells attached to this fiber.
    #[must_use]
    pub fn hook_count(&self, id: FiberId) -> usize {
        self.validate(id);
        self.hooks[id.idx as usize].len()
    }
}

impl<N: Clone> FiberStore<N> {
    /// Creates a root fiber wrapping `container` whose only child descriptor
    /// is `child`.
    ///
    /// `alternate` is the root of the previously committed tree, if any.
    ///
    /// # Panics
    ///
    /// Panics if `alternate` is a stale handle.
    pub fn create_root(
        &mut self,
        container: N,
        child: Element,
        alternate: Option<FiberId>,
    ) -> FiberId {
        let alt = alternate.map_or(INVALID, |id| {
            self.validate(id);
            id.idx
        });
        let idx = self.alloc(
            Element::root(child),
            INVALID,
            alt,
            Some(container),
            Effect::None,
        );
        self.handle(idx)
    }

    /// Creates an unlinked child fiber for `element` under `parent`.
    ///
    /// With an `alternate` the fiber reuses that fiber's host node and is
    /// classified [`Effect::Update`]; without one it is a fresh
    /// [`Effect::Placement`]. Linking it into the parent's child chain is the
    /// reconciler's job.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn create_child(
        &mut self,
        element: Element,
        parent: FiberId,
        alternate: Option<FiberId>,
    ) -> FiberId {
        self.validate(parent);
        let idx = match alternate {
            Some(alt) => {
                self.validate(alt);
                let host = self.host_node[alt.idx as usize].clone();
                self.alloc(element, parent.idx, alt.idx, host, Effect::Update)
            }
            None => self.alloc(element, parent.idx, INVALID, None, Effect::Placement),
        };
        self.handle(idx)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::element::{h, text};

    fn chain(store: &mut FiberStore<u32>, parent: FiberId, kids: &[FiberId]) {
        let mut prev = INVALID;
        for kid in kids {
            if prev == INVALID {
                store.first_child[parent.idx as usize] = kid.idx;
            } else {
                store.next_sibling[prev as usize] = kid.idx;
            }
            prev = kid.idx;
        }
    }

    #[test]
    fn root_owns_container() {
        let mut store = FiberStore::new();
        let root = store.create_root(7_u32, text("x"), None);
        assert_eq!(store.host_node(root), Some(&7));
        assert_eq!(store.kind(root), &ElementKind::Root);
        assert_eq!(store.parent(root), None);
        assert_eq!(store.alternate(root), None);
        assert_eq!(store.element(root).props().children().len(), 1);
    }

    #[test]
    fn child_with_alternate_reuses_host_node() {
        let mut store = FiberStore::new();
        let old_root = store.create_root(1_u32, text("x"), None);
        let old = store.create_child(text("x"), old_root, None);
        store.host_node[old.idx as usize] = Some(42);
        assert_eq!(store.effect(old), Effect::Placement);

        let new_root = store.create_root(1_u32, text("x"), Some(old_root));
        let new = store.create_child(text("y"), new_root, Some(old));
        assert_eq!(store.effect(new), Effect::Update);
        assert_eq!(store.host_node(new), Some(&42));
        assert_eq!(store.alternate(new), Some(old));
        assert_eq!(store.parent(new), Some(new_root));
    }

    #[test]
    fn walk_is_depth_first_and_bounded_by_root() {
        let mut store = FiberStore::new();
        let root = store.create_root(0_u32, h("a").build(), None);
        let a = store.create_child(h("a").build(), root, None);
        let b = store.create_child(h("b").build(), a, None);
        let c = store.create_child(h("c").build(), a, None);
        let d = store.create_child(h("d").build(), c, None);
        chain(&mut store, root, &[a]);
        chain(&mut store, a, &[b, c]);
        chain(&mut store, c, &[d]);

        let order: Vec<_> = Descendants::new(&store, root.idx).collect();
        assert_eq!(order, vec![root.idx, a.idx, b.idx, c.idx, d.idx]);

        // A walk bounded by `c` never escapes to `c`'s siblings or parent.
        assert_eq!(store.next_in_walk(d.idx, c.idx), INVALID);
    }

    #[test]
    fn free_subtree_recycles_slots() {
        let mut store = FiberStore::new();
        let root = store.create_root(0_u32, h("a").build(), None);
        let a = store.create_child(h("a").build(), root, None);
        chain(&mut store, root, &[a]);
        assert_eq!(store.live_count(), 2);

        assert_eq!(store.free_subtree(root.idx), 2);
        assert_eq!(store.live_count(), 0);
        assert!(!store.is_alive(a));

        let again = store.create_root(0_u32, h("a").build(), None);
        assert!(store.is_alive(again));
        assert!(!store.is_alive(root), "old handle must stay stale");
    }

    #[test]
    fn host_parent_skips_nodeless_fibers() {
        let mut store = FiberStore::new();
        let root = store.create_root(9_u32, h("a").build(), None);
        let comp = store.create_child(h("a").build(), root, None);
        let leaf = store.create_child(h("b").build(), comp, None);
        assert_eq!(store.host_parent_of(leaf.idx), Some(&9));
        store.host_node[comp.idx as usize] = Some(3);
        assert_eq!(store.host_parent_of(leaf.idx), Some(&3));
    }

    #[test]
    #[should_panic(expected = "stale fiber handle")]
    fn stale_handle_panics() {
        let mut store = FiberStore::new();
        let root = store.create_root(0_u32, h("a").build(), None);
        store.free_subtree(root.idx);
        let _ = store.parent(root);
    }
}
