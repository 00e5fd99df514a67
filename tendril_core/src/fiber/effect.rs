// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit effect classification.

/// The action a fiber requires when its tree is committed.
///
/// Decided by [`reconcile_children`](crate::reconcile::reconcile_children)
/// and consumed by the commit pass. The value left on a fiber after commit is
/// kept for diagnostics only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Nothing to do (root fibers).
    #[default]
    None,
    /// New fiber; its host node is appended to the nearest host ancestor.
    Placement,
    /// Same kind at the same position; attributes are diffed onto the reused
    /// host node.
    Update,
    /// Old fiber with no counterpart; its host node is removed.
    Deletion,
}
