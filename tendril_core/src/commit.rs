// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit pass: flushing a fully walked tree to the host.
//!
//! Commit runs in one uninterruptible pass. Queued deletions go first, then
//! the new tree's placements and updates in depth-first order. Nothing reaches
//! the host before the walk has finished, so a host never observes a
//! half-reconciled tree.

#[cfg(feature = "trace-rich")]
use alloc::vec::Vec;

use crate::element::{Props, event_name};
use crate::fiber::{Effect, FiberId, FiberStore, INVALID};
use crate::host::Host;
#[cfg(feature = "trace-rich")]
use crate::trace::EffectRecord;
use crate::trace::CycleSummary;

/// Diffs `prev` against `next` onto `node` and returns the number of host
/// primitives issued.
///
/// Order: removed properties are cleared, changed or added properties are
/// set, removed listeners are unbound, then changed or added listeners have
/// their old handler (if any) unbound before the new one is bound. The
/// reserved children key is never a property.
///
/// # Errors
///
/// Stops at and returns the first host failure.
pub fn update_props<H: Host>(
    host: &mut H,
    node: &H::Node,
    prev: &Props,
    next: &Props,
) -> Result<u32, H::Error> {
    let mut ops = 0;

    for (key, _) in prev.properties() {
        if next.property(key).is_none() {
            host.clear_property(node, key)?;
            ops += 1;
        }
    }
    for (key, value) in next.properties() {
        if prev.property(key) != Some(value) {
            host.set_property(node, key, value)?;
            ops += 1;
        }
    }

    for (key, handler) in prev.listeners() {
        if next.listener(key).is_none() {
            host.remove_listener(node, &event_name(key), handler)?;
            ops += 1;
        }
    }
    for (key, handler) in next.listeners() {
        let old = prev.listener(key);
        if old == Some(handler) {
            continue;
        }
        let event = event_name(key);
        if let Some(old) = old {
            host.remove_listener(node, &event, old)?;
            ops += 1;
        }
        host.add_listener(node, &event, handler)?;
        ops += 1;
    }

    Ok(ops)
}

/// Tally of one commit.
#[derive(Debug, Default)]
pub(crate) struct CommitLog {
    pub(crate) placements: u32,
    pub(crate) updates: u32,
    pub(crate) changed_updates: u32,
    pub(crate) deletions: u32,
    #[cfg(feature = "trace-rich")]
    pub(crate) records: Vec<EffectRecord>,
}

impl CommitLog {
    fn record(&mut self, fiber: FiberId, effect: Effect, host_node: bool, operations: u32) {
        match effect {
            Effect::Placement => self.placements += 1,
            Effect::Update if host_node => {
                self.updates += 1;
                if operations > 0 {
                    self.changed_updates += 1;
                }
            }
            Effect::Deletion => self.deletions += 1,
            Effect::Update | Effect::None => {}
        }
        #[cfg(feature = "trace-rich")]
        self.records.push(EffectRecord {
            fiber,
            effect,
            operations,
        });
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = fiber;
        }
    }

    pub(crate) fn fill(&self, summary: &mut CycleSummary) {
        summary.placements = self.placements;
        summary.updates = self.updates;
        summary.changed_updates = self.changed_updates;
        summary.deletions = self.deletions;
    }
}

/// Applies `deletions`, then every effect in the tree under `root`.
///
/// Hook cells are left untouched; see [`settle_hooks`].
///
/// # Panics
///
/// Panics if a fiber with an effect has no ancestor owning a host node. Every
/// tree is rooted at a container fiber, so this only happens if the store was
/// corrupted.
pub(crate) fn commit_root<H: Host>(
    host: &mut H,
    store: &mut FiberStore<H::Node>,
    root: u32,
    deletions: &[FiberId],
    log: &mut CommitLog,
) -> Result<(), H::Error> {
    for &fiber in deletions {
        let removed = commit_deletion(host, store, fiber.idx)?;
        log.record(fiber, Effect::Deletion, false, removed);
    }

    let mut idx = store.first_child[root as usize];
    while idx != INVALID {
        let i = idx as usize;
        let effect = store.effect[i];
        let has_node = store.host_node[i].is_some();
        let ops = match (effect, &store.host_node[i]) {
            (Effect::Placement, Some(node)) => {
                host.append_child(host_parent(store, idx), node)?;
                1
            }
            (Effect::Update, Some(node)) => {
                let alt = store.alternate[i];
                let prev = store.element_at(alt).props();
                let next = store.element_at(idx).props();
                update_props(host, node, prev, next)?
            }
            _ => 0,
        };
        log.record(store.handle(idx), effect, has_node, ops);
        idx = store.next_in_walk(idx, root);
    }
    Ok(())
}

/// Drops the updates folded in by every component fiber under `root`.
///
/// Only called once [`commit_root`] has succeeded, so a failed commit leaves
/// every queued update in place for the next cycle.
pub(crate) fn settle_hooks<N>(store: &mut FiberStore<N>, root: u32) {
    let mut idx = root;
    while idx != INVALID {
        for cell in &mut store.hooks[idx as usize] {
            cell.settle();
        }
        idx = store.next_in_walk(idx, root);
    }
}

fn commit_deletion<H: Host>(
    host: &mut H,
    store: &FiberStore<H::Node>,
    idx: u32,
) -> Result<u32, H::Error> {
    remove_host_nodes(host, store, idx, host_parent(store, idx))
}

/// Removes the host node of `idx` from `parent`, or, for a fiber without a
/// node, the top-most host nodes of its subtree.
fn remove_host_nodes<H: Host>(
    host: &mut H,
    store: &FiberStore<H::Node>,
    idx: u32,
    parent: &H::Node,
) -> Result<u32, H::Error> {
    if let Some(node) = &store.host_node[idx as usize] {
        host.remove_child(parent, node)?;
        return Ok(1);
    }
    let mut removed = 0;
    let mut child = store.first_child[idx as usize];
    while child != INVALID {
        removed += remove_host_nodes(host, store, child, parent)?;
        child = store.next_sibling[child as usize];
    }
    Ok(removed)
}

fn host_parent<N>(store: &FiberStore<N>, idx: u32) -> &N {
    match store.host_parent_of(idx) {
        Some(node) => node,
        None => panic!(
            "fiber slot {idx} has no host-node ancestor; trees must be rooted at a container"
        ),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::element::{AttrValue, Handler, h};
    use crate::host::NodeKind;

    #[derive(Debug, PartialEq)]
    enum Op {
        Set(String, AttrValue),
        Clear(String),
        Add(String, usize),
        Remove(String, usize),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Host for Recorder {
        type Node = u32;
        type Error = ();

        fn create_node(&mut self, _: NodeKind<'_>) -> Result<u32, ()> {
            Ok(0)
        }
        fn set_property(&mut self, _: &u32, key: &str, value: &AttrValue) -> Result<(), ()> {
            self.ops.push(Op::Set(key.into(), value.clone()));
            Ok(())
        }
        fn clear_property(&mut self, _: &u32, key: &str) -> Result<(), ()> {
            self.ops.push(Op::Clear(key.into()));
            Ok(())
        }
        fn add_listener(&mut self, _: &u32, event: &str, handler: &Handler) -> Result<(), ()> {
            self.ops.push(Op::Add(event.into(), handler.addr()));
            Ok(())
        }
        fn remove_listener(&mut self, _: &u32, event: &str, handler: &Handler) -> Result<(), ()> {
            self.ops.push(Op::Remove(event.into(), handler.addr()));
            Ok(())
        }
        fn append_child(&mut self, _: &u32, _: &u32) -> Result<(), ()> {
            Ok(())
        }
        fn remove_child(&mut self, _: &u32, _: &u32) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn attribute_round_trip() {
        let f = Handler::new(|| {});
        let prev = h("div").attr("a", 1).on("click", f.clone()).build();
        let next = h("div").attr("a", 2).build();
        let mut host = Recorder::default();
        let ops = update_props(&mut host, &0, prev.props(), next.props()).unwrap();
        assert_eq!(ops, 2);
        assert_eq!(
            host.ops,
            vec![
                Op::Set("a".into(), AttrValue::Int(2)),
                Op::Remove("click".into(), f.addr()),
            ]
        );
    }

    #[test]
    fn identical_props_issue_nothing() {
        let f = Handler::new(|| {});
        let prev = h("p").attr("id", "x").on("click", f.clone()).build();
        let next = h("p").attr("id", "x").on("click", f).build();
        let mut host = Recorder::default();
        assert_eq!(update_props(&mut host, &0, prev.props(), next.props()), Ok(0));
        assert!(host.ops.is_empty());
    }

    #[test]
    fn unchanged_nan_property_is_not_reset() {
        let prev = h("meter").attr("value", f64::NAN).build();
        let next = h("meter").attr("value", f64::NAN).build();
        let mut host = Recorder::default();
        assert_eq!(update_props(&mut host, &0, prev.props(), next.props()), Ok(0));
        assert!(host.ops.is_empty(), "{:?}", host.ops);
    }

    #[test]
    fn changed_listener_unbinds_old_first() {
        let f = Handler::new(|| {});
        let g = Handler::new(|| {});
        let prev = h("p").attr("gone", true).on("click", f.clone()).build();
        let next = h("p").on("click", g.clone()).build();
        let mut host = Recorder::default();
        update_props(&mut host, &0, prev.props(), next.props()).unwrap();
        assert_eq!(
            host.ops,
            vec![
                Op::Clear("gone".into()),
                Op::Remove("click".into(), f.addr()),
                Op::Add("click".into(), g.addr()),
            ]
        );
    }

    #[test]
    fn listener_turned_plain_value_is_cleared_and_set() {
        let f = Handler::new(|| {});
        let prev = h("p").on("click", f.clone()).build();
        let next = h("p").attr("onClick", "text").build();
        let mut host = Recorder::default();
        update_props(&mut host, &0, prev.props(), next.props()).unwrap();
        assert_eq!(
            host.ops,
            vec![
                Op::Set("onClick".into(), AttrValue::from("text")),
                Op::Remove("click".into(), f.addr()),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "no host-node ancestor")]
    fn orphan_placement_panics() {
        let mut store: FiberStore<u32> = FiberStore::new();
        let root = store.create_root(0, h("a").build(), None);
        let kid = store.create_child(h("a").build(), root, None);
        store.first_child[root.idx as usize] = kid.idx;
        store.host_node[kid.idx as usize] = Some(1);
        // Detach the container so the placement has nowhere to go.
        store.host_node[root.idx as usize] = None;
        let mut log = CommitLog::default();
        let _ = commit_root(&mut Recorder::default(), &mut store, root.idx, &[], &mut log);
    }
}
