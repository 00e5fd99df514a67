// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Two kinds of failure surface from a render cycle:
//!
//! - [`HookError`]: a component used hooks inconsistently between renders.
//!   Calling a hook outside a render cannot be expressed at all, since the
//!   [`Hooks`](crate::hooks::Hooks) cursor only exists inside a component
//!   invocation.
//! - A host primitive failed; the host's own error is wrapped in
//!   [`RenderError::Host`].
//!
//! Neither is retried. A missing host ancestor during commit is an engine
//! invariant violation and panics instead.

use core::fmt;

/// Inconsistent hook usage detected while rendering a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookError {
    /// The component called a different number of hooks than on its previous
    /// render.
    UnstableOrder {
        /// Diagnostic name of the component.
        component: &'static str,
        /// Hook count on the previous render.
        previous: usize,
        /// Hook count reached on this render.
        current: usize,
    },
    /// The hook cell at `index` holds a different state type than the one
    /// requested, which means calls were reordered.
    StateTypeChanged {
        /// Diagnostic name of the component.
        component: &'static str,
        /// Call-order position of the mismatched hook.
        index: usize,
    },
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnstableOrder {
                component,
                previous,
                current,
            } => write!(
                f,
                "unstable hook order in `{component}`: {previous} hook(s) on the previous render, {current} now"
            ),
            Self::StateTypeChanged { component, index } => write!(
                f,
                "unstable hook order in `{component}`: hook #{index} changed state type"
            ),
        }
    }
}

impl core::error::Error for HookError {}

/// Failure of a render cycle.
///
/// Returned by [`Engine::work_loop`](crate::engine::Engine::work_loop). When
/// it is returned the in-progress cycle has been abandoned and the last
/// committed tree is still current.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderError<E> {
    /// A host primitive failed.
    Host(E),
    /// A component misused hooks.
    Hook(HookError),
}

impl<E> From<HookError> for RenderError<E> {
    fn from(e: HookError) -> Self {
        Self::Hook(e)
    }
}

impl<E: fmt::Display> fmt::Display for RenderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(e) => write!(f, "host operation failed: {e}"),
            Self::Hook(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl<E: core::error::Error + 'static> core::error::Error for RenderError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Host(e) => Some(e),
            Self::Hook(e) => Some(e),
        }
    }
}
