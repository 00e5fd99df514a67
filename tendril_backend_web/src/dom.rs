// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM host.
//!
//! [`DomHost`] applies engine primitives to a live `web_sys::Document`.
//! Properties are assigned as JavaScript properties (not attributes), so
//! `nodeValue` on a text node and `value` on an input behave like direct
//! assignment. Listeners are bound through retained closures that are
//! released when unbound.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use tendril_core::element::{AttrValue, Handler};
use tendril_core::host::{Host, NodeKind};

/// A failed DOM primitive.
#[derive(Clone, Debug)]
pub enum DomError {
    /// There is no global `window.document`.
    NoDocument,
    /// A DOM call threw.
    Js(JsValue),
    /// An unbind named a handler that is not bound there.
    ListenerNotBound {
        /// The event name.
        event: String,
    },
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDocument => write!(f, "no global document"),
            Self::Js(value) => match value.as_string() {
                Some(message) => write!(f, "DOM call failed: {message}"),
                None => write!(f, "DOM call failed: {value:?}"),
            },
            Self::ListenerNotBound { event } => {
                write!(f, "no matching `{event}` listener is bound")
            }
        }
    }
}

impl core::error::Error for DomError {}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        Self::Js(value)
    }
}

type ListenerClosure = Closure<dyn FnMut(web_sys::Event)>;

struct Binding {
    node: web_sys::Node,
    event: String,
    handler: Handler,
    closure: ListenerClosure,
}

/// [`Host`] over a browser document.
pub struct DomHost {
    document: web_sys::Document,
    bindings: Vec<Binding>,
}

impl fmt::Debug for DomHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomHost")
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

impl DomHost {
    /// Creates a host over the global `window.document`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::NoDocument`] outside a browser window.
    pub fn new() -> Result<Self, DomError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(DomError::NoDocument)?;
        Ok(Self::with_document(document))
    }

    /// Creates a host over `document`.
    #[must_use]
    pub fn with_document(document: web_sys::Document) -> Self {
        Self {
            document,
            bindings: Vec::new(),
        }
    }

    /// Returns the document.
    #[must_use]
    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }

    /// Returns the number of listeners currently bound.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

fn to_js(value: &AttrValue) -> JsValue {
    match value {
        AttrValue::Str(s) => JsValue::from_str(s),
        // Beyond 2^53 this rounds exactly as JS would.
        AttrValue::Int(i) => JsValue::from_f64(*i as f64),
        AttrValue::Float(x) => JsValue::from_f64(*x),
        AttrValue::Bool(b) => JsValue::from_bool(*b),
        AttrValue::Handler(_) => JsValue::from_str(""),
    }
}

impl Host for DomHost {
    type Node = web_sys::Node;
    type Error = DomError;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<web_sys::Node, DomError> {
        Ok(match kind {
            NodeKind::Element(tag) => self.document.create_element(tag)?.into(),
            NodeKind::Text => self.document.create_text_node("").into(),
        })
    }

    fn set_property(
        &mut self,
        node: &web_sys::Node,
        key: &str,
        value: &AttrValue,
    ) -> Result<(), DomError> {
        js_sys::Reflect::set(node, &JsValue::from_str(key), &to_js(value))?;
        Ok(())
    }

    fn clear_property(&mut self, node: &web_sys::Node, key: &str) -> Result<(), DomError> {
        js_sys::Reflect::set(node, &JsValue::from_str(key), &JsValue::from_str(""))?;
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: &web_sys::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let target = handler.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            target.call();
        }) as Box<dyn FnMut(web_sys::Event)>);
        node.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.bindings.push(Binding {
            node: node.clone(),
            event: event.to_string(),
            handler: handler.clone(),
            closure,
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &web_sys::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let Some(pos) = self.bindings.iter().position(|b| {
            b.event == event && b.handler.ptr_eq(handler) && b.node.is_same_node(Some(node))
        }) else {
            return Err(DomError::ListenerNotBound {
                event: event.to_string(),
            });
        };
        let binding = self.bindings.swap_remove(pos);
        node.remove_event_listener_with_callback(event, binding.closure.as_ref().unchecked_ref())?;
        Ok(())
    }

    fn append_child(
        &mut self,
        parent: &web_sys::Node,
        child: &web_sys::Node,
    ) -> Result<(), DomError> {
        parent.append_child(child)?;
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: &web_sys::Node,
        child: &web_sys::Node,
    ) -> Result<(), DomError> {
        parent.remove_child(child)?;
        Ok(())
    }
}
