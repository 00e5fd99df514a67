// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable element descriptors and the builder that produces them.
//!
//! An [`Element`] describes one node of the desired tree: its
//! [`ElementKind`], its attributes, and its ordered children. Descriptors are
//! built fresh on every render and are never mutated afterwards; cloning one
//! is a reference-count bump.
//!
//! ```rust,ignore
//! let tree = h("div")
//!     .attr("id", "foo")
//!     .child("hello")
//!     .child(h("button").on("click", on_click).child(count));
//! ```
//!
//! Primitive children (strings, numbers, booleans) are normalized into
//! [`ElementKind::Text`] elements that carry their content under
//! [`TEXT_VALUE_KEY`].

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use crate::error::HookError;
use crate::hooks::Hooks;

/// Attribute-key prefix that marks an event-listener binding.
pub const EVENT_PREFIX: &str = "on";

/// Reserved attribute key under which children are carried. Never treated as
/// a plain property.
pub const CHILDREN_KEY: &str = "children";

/// Attribute key holding the content of a text element.
pub const TEXT_VALUE_KEY: &str = "nodeValue";

/// An event handler bound through an `on*` attribute.
///
/// Handlers compare by identity: two handlers are equal only if they are
/// clones of the same allocation. A fresh closure each render is therefore a
/// changed listener.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn()>);

impl Handler {
    /// Wraps a closure as a handler.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the handler.
    #[inline]
    pub fn call(&self) {
        (self.0)();
    }

    /// Returns whether both handlers share the same allocation.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns an address usable as an identity key (for diagnostics and
    /// listener bookkeeping in hosts).
    #[inline]
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:#x})", self.addr())
    }
}

/// A single attribute value.
///
/// Floats compare by bit pattern, so `NaN` equals itself and `-0.0` differs
/// from `0.0`; handlers compare by identity.
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// A string.
    Str(Rc<str>),
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An event handler.
    Handler(Handler),
}

impl AttrValue {
    /// Returns the handler, if this value is one.
    #[must_use]
    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Self::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// Renders the value as text, the way a host would stringify it.
    ///
    /// Handlers render as an empty string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Handler(_) => String::new(),
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Handler(a), Self::Handler(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<Rc<str>> for AttrValue {
    fn from(s: Rc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<u32> for AttrValue {
    fn from(i: u32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Handler> for AttrValue {
    fn from(h: Handler) -> Self {
        Self::Handler(h)
    }
}

type RenderFn = dyn Fn(&Props, &mut Hooks<'_>) -> Result<Element, HookError>;

/// A plain function pointer usable as a render function.
pub type RenderPtr = fn(&Props, &mut Hooks<'_>) -> Result<Element, HookError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Identity {
    /// The render function's own type: fn items and closures.
    Type(TypeId),
    /// Address of a [`RenderPtr`].
    Address(usize),
    /// Type-erased render; only clones of the same `Component` match.
    Instance,
    /// Caller-chosen key.
    Key(&'static str),
}

impl Identity {
    fn of<F: 'static>(render: &F) -> Self {
        let any: &dyn Any = render;
        if let Some(f) = any.downcast_ref::<RenderPtr>() {
            return Self::Address((*f as *const ()).addr());
        }
        if any.is::<Box<RenderFn>>() || any.is::<&'static RenderFn>() {
            return Self::Instance;
        }
        Self::Type(TypeId::of::<F>())
    }
}

/// A function component.
///
/// Two components are the same kind when they render with the same function:
///
/// - fn items and closures match by type, so a component created inline on
///   every render of its parent keeps its identity (and its hook state);
/// - [`RenderPtr`] function pointers match by address;
/// - boxed `dyn Fn` renders only match clones of the same `Component`;
/// - [`Component::keyed`] components match by key.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    identity: Identity,
    render: Rc<RenderFn>,
}

impl Component {
    /// Wraps a render function. `name` is used in diagnostics only.
    pub fn new<F>(name: &'static str, render: F) -> Self
    where
        F: Fn(&Props, &mut Hooks<'_>) -> Result<Element, HookError> + 'static,
    {
        Self {
            name,
            identity: Identity::of(&render),
            render: Rc::new(render),
        }
    }

    /// Wraps a render function whose identity is `key`, whatever its type.
    ///
    /// Components with equal keys share hook state at the same position.
    pub fn keyed<F>(name: &'static str, key: &'static str, render: F) -> Self
    where
        F: Fn(&Props, &mut Hooks<'_>) -> Result<Element, HookError> + 'static,
    {
        Self {
            name,
            identity: Identity::Key(key),
            render: Rc::new(render),
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, props: &Props, hooks: &mut Hooks<'_>) -> Result<Element, HookError> {
        (self.render)(props, hooks)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        match (self.identity, other.identity) {
            (Identity::Instance, Identity::Instance) => Rc::ptr_eq(&self.render, &other.render),
            (a, b) => a == b,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// What kind of node an element describes.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    /// A host element with the given tag name.
    Host(Rc<str>),
    /// A text leaf; content is the [`TEXT_VALUE_KEY`] attribute.
    Text,
    /// A function component.
    Component(Component),
    /// The container wrapper of a root fiber. Only produced by the engine.
    Root,
}

impl ElementKind {
    /// Returns whether this is a function component.
    #[must_use]
    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component(_))
    }
}

/// Attributes plus ordered children of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attributes: BTreeMap<String, AttrValue>,
    children: Vec<Element>,
}

impl Props {
    /// Returns the attribute stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Returns the ordered child descriptors.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Iterates all attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the plain-property value under `key`, if `key` names one.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&AttrValue> {
        self.attributes
            .get(key)
            .filter(|value| is_property(key, value))
    }

    /// Iterates plain properties: every attribute that is neither the
    /// children key nor a listener binding.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes()
            .filter(|(key, value)| is_property(key, value))
    }

    /// Returns the handler bound under `key`, if `key` is a listener binding.
    #[must_use]
    pub fn listener(&self, key: &str) -> Option<&Handler> {
        self.attributes
            .get(key)
            .filter(|value| is_listener(key, value))
            .and_then(AttrValue::as_handler)
    }

    /// Iterates listener bindings as `(attribute key, handler)`.
    pub fn listeners(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.attributes().filter_map(|(key, value)| {
            if is_listener(key, value) {
                value.as_handler().map(|h| (key, h))
            } else {
                None
            }
        })
    }
}

fn is_listener(key: &str, value: &AttrValue) -> bool {
    key.starts_with(EVENT_PREFIX) && matches!(value, AttrValue::Handler(_))
}

fn is_property(key: &str, value: &AttrValue) -> bool {
    key != CHILDREN_KEY && !is_listener(key, value)
}

/// Derives the event name from a listener attribute key: the key minus
/// [`EVENT_PREFIX`], lower-cased (`"onClick"` → `"click"`).
#[must_use]
pub fn event_name(key: &str) -> String {
    key.strip_prefix(EVENT_PREFIX)
        .unwrap_or(key)
        .to_ascii_lowercase()
}

#[derive(Debug, PartialEq)]
struct ElementData {
    kind: ElementKind,
    props: Props,
}

/// An immutable node descriptor.
#[derive(Clone, PartialEq)]
pub struct Element(Rc<ElementData>);

impl Element {
    fn from_parts(kind: ElementKind, props: Props) -> Self {
        Self(Rc::new(ElementData { kind, props }))
    }

    /// Starts building a host element with the given tag.
    #[must_use]
    pub fn host(tag: &str) -> ElementBuilder {
        ElementBuilder {
            kind: ElementKind::Host(tag.into()),
            props: Props::default(),
        }
    }

    /// Creates a text element.
    pub fn text(value: impl Into<AttrValue>) -> Self {
        let mut props = Props::default();
        let text = match value.into() {
            AttrValue::Str(s) => AttrValue::Str(s),
            other => AttrValue::Str(other.to_text().into()),
        };
        props.attributes.insert(TEXT_VALUE_KEY.to_owned(), text);
        Self::from_parts(ElementKind::Text, props)
    }

    /// Starts building a component element.
    #[must_use]
    pub fn component(component: Component) -> ElementBuilder {
        ElementBuilder {
            kind: ElementKind::Component(component),
            props: Props::default(),
        }
    }

    /// Creates the container wrapper for a root fiber.
    pub(crate) fn root(child: Self) -> Self {
        let props = Props {
            attributes: BTreeMap::new(),
            children: alloc::vec![child],
        };
        Self::from_parts(ElementKind::Root, props)
    }

    /// Returns the element kind.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.0.kind
    }

    /// Returns attributes and children.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Returns the text content if this is a text element.
    #[must_use]
    pub fn text_value(&self) -> Option<&AttrValue> {
        match self.0.kind {
            ElementKind::Text => self.0.props.get(TEXT_VALUE_KEY),
            _ => None,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Element");
        s.field("kind", &self.0.kind);
        if !self.0.props.attributes.is_empty() {
            s.field("attributes", &self.0.props.attributes);
        }
        if !self.0.props.children.is_empty() {
            s.field("children", &self.0.props.children);
        }
        s.finish()
    }
}

/// Builder for host and component elements.
#[derive(Debug)]
#[must_use = "call `build` (or pass the builder as a child) to produce an element"]
pub struct ElementBuilder {
    kind: ElementKind,
    props: Props,
}

impl ElementBuilder {
    /// Sets an attribute. Setting the same key twice keeps the last value.
    pub fn attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.props.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// Binds a listener for `event` (e.g. `"click"` is stored as `onClick`).
    pub fn on(self, event: &str, handler: Handler) -> Self {
        let mut key = String::from(EVENT_PREFIX);
        let mut chars = event.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }
        self.attr(&key, handler)
    }

    /// Appends one child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.props.children.push(child.into().0);
        self
    }

    /// Appends several children.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.props
            .children
            .extend(children.into_iter().map(|c| c.into().0));
        self
    }

    /// Finishes the element.
    #[must_use]
    pub fn build(self) -> Element {
        Element::from_parts(self.kind, self.props)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

/// Anything usable as a child: an element, a builder, or a primitive that
/// becomes a text element.
#[derive(Debug)]
pub struct Child(Element);

impl From<Element> for Child {
    fn from(e: Element) -> Self {
        Self(e)
    }
}

impl From<ElementBuilder> for Child {
    fn from(b: ElementBuilder) -> Self {
        Self(b.build())
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Self(Element::text(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Self(Element::text(s))
    }
}

impl From<i64> for Child {
    fn from(i: i64) -> Self {
        Self(Element::text(i))
    }
}

impl From<i32> for Child {
    fn from(i: i32) -> Self {
        Self(Element::text(i))
    }
}

impl From<u32> for Child {
    fn from(i: u32) -> Self {
        Self(Element::text(i))
    }
}

impl From<f64> for Child {
    fn from(x: f64) -> Self {
        Self(Element::text(x))
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Self(Element::text(b))
    }
}

/// Shorthand for [`Element::host`].
#[must_use]
pub fn h(tag: &str) -> ElementBuilder {
    Element::host(tag)
}

/// Shorthand for [`Element::text`].
pub fn text(value: impl Into<AttrValue>) -> Element {
    Element::text(value)
}

/// Shorthand for a component element with no attributes.
///
/// The render function's type name is used as the diagnostic name.
pub fn component<F>(render: F) -> ElementBuilder
where
    F: Fn(&Props, &mut Hooks<'_>) -> Result<Element, HookError> + 'static,
{
    Element::component(Component::new(short_type_name::<F>(), render))
}

fn short_type_name<T>() -> &'static str {
    let full = core::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn primitive_children_become_text() {
        let e = h("p").child("hi").child(3).build();
        let kids = e.props().children();
        assert_eq!(kids.len(), 2, "two children");
        assert_eq!(kids[0].kind(), &ElementKind::Text);
        assert_eq!(kids[0].text_value(), Some(&AttrValue::from("hi")));
        assert_eq!(kids[1].text_value(), Some(&AttrValue::from("3")));
    }

    #[test]
    fn on_capitalizes_event_key() {
        let handler = Handler::new(|| {});
        let e = h("button").on("click", handler.clone()).build();
        assert_eq!(e.props().listener("onClick"), Some(&handler));
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onMouseDown"), "mousedown");
    }

    #[test]
    fn properties_skip_listeners_and_children_key() {
        let e = h("div")
            .attr("id", "a")
            .attr(CHILDREN_KEY, "nope")
            .attr("onion", "not a handler")
            .on("click", Handler::new(|| {}))
            .build();
        let keys: Vec<_> = e.props().properties().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "onion"]);
        let listeners: Vec<_> = e.props().listeners().map(|(k, _)| k).collect();
        assert_eq!(listeners, vec!["onClick"]);
    }

    #[test]
    fn handlers_compare_by_identity() {
        let a = Handler::new(|| {});
        let b = Handler::new(|| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    fn first(_: &Props, _: &mut Hooks<'_>) -> Result<Element, HookError> {
        Ok(text("first"))
    }

    fn second(_: &Props, _: &mut Hooks<'_>) -> Result<Element, HookError> {
        Ok(text("second"))
    }

    #[test]
    fn fn_pointer_components_match_by_address() {
        let a = component(first as RenderPtr).build();
        let a_again = component(first as RenderPtr).build();
        let b = component(second as RenderPtr).build();
        assert_eq!(a.kind(), a_again.kind());
        assert_ne!(a.kind(), b.kind(), "distinct functions behind one pointer type");
    }

    #[test]
    fn boxed_components_match_only_their_clones() {
        let boxed: Box<RenderFn> = Box::new(first);
        let a = Component::new("Boxed", boxed);
        let other: Box<RenderFn> = Box::new(second);
        let b = Component::new("Boxed", other);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn keyed_components_match_by_key() {
        let a = Component::keyed("A", "slot", first);
        let b = Component::keyed("B", "slot", second);
        let c = Component::keyed("C", "other", first);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Component::new("A", first));
    }

    #[test]
    fn nan_property_equals_itself() {
        assert_eq!(AttrValue::Float(f64::NAN), AttrValue::Float(f64::NAN));
        assert_ne!(AttrValue::Float(0.0), AttrValue::Float(-0.0));
        assert_ne!(AttrValue::Int(1), AttrValue::Float(1.0));
    }

    #[test]
    fn component_identity_follows_render_fn() {
        let a1 = component(first).build();
        let a2 = component(first).build();
        let b = component(second).build();
        assert_eq!(a1.kind(), a2.kind());
        assert_ne!(a1.kind(), b.kind());
        assert!(a1.kind().is_component());
    }

    #[test]
    fn host_kinds_compare_by_tag() {
        assert_eq!(h("div").build().kind(), h("div").build().kind());
        assert_ne!(h("div").build().kind(), h("span").build().kind());
        assert_ne!(h("div").build().kind(), text("div").kind());
    }
}
