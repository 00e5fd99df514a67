// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber tree data model.
//!
//! A *fiber* is the mutable work record for one rendered element instance.
//! Each fiber has:
//!
//! - An identity ([`FiberId`]), a generational handle that becomes stale when
//!   the fiber's tree is superseded and its slot recycled.
//! - Topology: a parent back reference plus first-child and next-sibling
//!   links that own the tree shape.
//! - An `alternate` link to the fiber at the same position in the other tree
//!   (current vs work-in-progress), used only while diffing.
//! - The [`Element`](crate::element::Element) it was built from, an optional
//!   host node, the [`Effect`] decided by reconciliation, and, for function
//!   components, an ordered list of hook cells.
//!
//! Fibers of both trees live side by side in one struct-of-arrays
//! [`FiberStore`] with index-based handles, so back references never form
//! ownership cycles.

mod effect;
mod id;
mod store;
mod traverse;

pub use effect::Effect;
pub use id::{FiberId, INVALID};
pub use store::FiberStore;
pub use traverse::Children;
pub(crate) use traverse::Descendants;
