// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory document tree.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use tendril_core::element::{AttrValue, Handler, TEXT_VALUE_KEY};
use tendril_core::host::{Host, NodeKind};

/// Tag of the container node every [`Document`] starts with.
pub const ROOT_TAG: &str = "#root";

/// Handle to a node of a [`Document`]. Nodes are never freed, so handles
/// never go stale.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A host primitive the document refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadlessError {
    /// The node id does not belong to this document.
    UnknownNode(NodeId),
    /// `remove_child` named a node that is not a child of `parent`.
    NotAChild {
        /// The supposed parent.
        parent: NodeId,
        /// The node that was to be removed.
        child: NodeId,
    },
    /// Text nodes only carry [`TEXT_VALUE_KEY`].
    TextProperty {
        /// The text node.
        node: NodeId,
        /// The rejected key.
        key: String,
    },
    /// Text nodes have no children.
    TextParent(NodeId),
    /// Appending would make a node its own ancestor.
    Cycle {
        /// The would-be parent.
        parent: NodeId,
        /// The node being appended.
        child: NodeId,
    },
    /// `remove_listener` named a handler that is not bound.
    ListenerNotBound {
        /// The node.
        node: NodeId,
        /// The event name.
        event: String,
    },
    /// The node arena cannot address another node.
    Full,
}

impl fmt::Display for HeadlessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(n) => write!(f, "unknown node {n:?}"),
            Self::NotAChild { parent, child } => {
                write!(f, "{child:?} is not a child of {parent:?}")
            }
            Self::TextProperty { node, key } => {
                write!(f, "text node {node:?} has no property `{key}`")
            }
            Self::TextParent(n) => write!(f, "text node {n:?} cannot have children"),
            Self::Cycle { parent, child } => {
                write!(f, "appending {child:?} under {parent:?} would create a cycle")
            }
            Self::ListenerNotBound { node, event } => {
                write!(f, "no matching `{event}` listener bound on {node:?}")
            }
            Self::Full => f.write_str("document node arena is full"),
        }
    }
}

impl core::error::Error for HeadlessError {}

/// One applied host primitive, as recorded in the mutation log.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// An element was created.
    CreateElement {
        /// The new node.
        node: NodeId,
        /// Its tag.
        tag: String,
    },
    /// A text node was created.
    CreateText {
        /// The new node.
        node: NodeId,
    },
    /// A property was set.
    SetProperty {
        /// Target node.
        node: NodeId,
        /// Property name.
        key: String,
        /// New value.
        value: AttrValue,
    },
    /// A property was cleared.
    ClearProperty {
        /// Target node.
        node: NodeId,
        /// Property name.
        key: String,
    },
    /// A listener was bound.
    AddListener {
        /// Target node.
        node: NodeId,
        /// Event name.
        event: String,
    },
    /// A listener was unbound.
    RemoveListener {
        /// Target node.
        node: NodeId,
        /// Event name.
        event: String,
    },
    /// A node was appended.
    Append {
        /// New parent.
        parent: NodeId,
        /// Appended node.
        child: NodeId,
    },
    /// A node was detached.
    Remove {
        /// Old parent.
        parent: NodeId,
        /// Detached node.
        child: NodeId,
    },
}

#[derive(Debug)]
enum Content {
    Element(String),
    Text,
}

#[derive(Debug)]
struct NodeData {
    content: Content,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: BTreeMap<String, AttrValue>,
    listeners: Vec<(String, Handler)>,
}

impl NodeData {
    fn new(content: Content) -> Self {
        Self {
            content,
            parent: None,
            children: Vec::new(),
            properties: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    fn is_text(&self) -> bool {
        matches!(self.content, Content::Text)
    }
}

/// An in-memory presentation tree implementing [`Host`].
///
/// Every primitive is checked the way a strict DOM would check it and every
/// successful one is appended to a mutation log.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    log: Vec<Mutation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding only the [`ROOT_TAG`] container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: alloc::vec![NodeData::new(Content::Element(ROOT_TAG.to_owned()))],
            log: Vec::new(),
        }
    }

    /// Returns the container node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the number of nodes ever created, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; the root always exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        core::mem::take(&mut self.log)
    }

    /// Returns the mutation log without draining it.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    fn get(&self, id: NodeId) -> Result<&NodeData, HeadlessError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(HeadlessError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData, HeadlessError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(HeadlessError::UnknownNode(id))
    }

    // -- Queries --

    /// Returns the children of `id` in order (empty for unknown nodes).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Ok(node) => &node.children,
            Err(_) => &[],
        }
    }

    /// Returns the parent of `id`, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).ok().and_then(|n| n.parent)
    }

    /// Returns the tag of an element node (`None` for text nodes).
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.get(id).ok()?.content {
            Content::Element(tag) => Some(tag.as_str()),
            Content::Text => None,
        }
    }

    /// Returns whether `id` is a text node.
    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_ok_and(NodeData::is_text)
    }

    /// Returns the value of property `key` on `id`.
    #[must_use]
    pub fn property(&self, id: NodeId, key: &str) -> Option<&AttrValue> {
        self.get(id).ok()?.properties.get(key)
    }

    /// Returns the number of handlers bound to `event` on `id`.
    #[must_use]
    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.get(id)
            .map_or(0, |n| n.listeners.iter().filter(|(e, _)| e == event).count())
    }

    /// Concatenated content of every text node under `id`, in document
    /// order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.get(id) else {
            return;
        };
        if node.is_text() {
            if let Some(value) = node.properties.get(TEXT_VALUE_KEY) {
                out.push_str(&value.to_text());
            }
            return;
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Serializes the subtree under `id` as markup. Properties appear in key
    /// order; listeners are omitted.
    #[must_use]
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.get(id) else {
            return;
        };
        let tag = match &node.content {
            Content::Text => {
                if let Some(value) = node.properties.get(TEXT_VALUE_KEY) {
                    escape_into(&value.to_text(), false, out);
                }
                return;
            }
            Content::Element(tag) => tag,
        };
        out.push('<');
        out.push_str(tag);
        for (key, value) in &node.properties {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(&value.to_text(), true, out);
            out.push('"');
        }
        out.push('>');
        for &child in &node.children {
            self.write_markup(child, out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    /// Returns the first element with tag `tag` under `from` (inclusive), in
    /// document order.
    #[must_use]
    pub fn find(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(from) == Some(tag) {
            return Some(from);
        }
        self.children(from)
            .iter()
            .find_map(|&child| self.find(child, tag))
    }

    /// Invokes every handler bound to `event` on `id`, in binding order, and
    /// returns how many ran.
    pub fn dispatch(&self, id: NodeId, event: &str) -> usize {
        let handlers: Vec<Handler> = match self.get(id) {
            Ok(node) => node
                .listeners
                .iter()
                .filter(|(e, _)| e == event)
                .map(|(_, h)| h.clone())
                .collect(),
            Err(_) => return 0,
        };
        for handler in &handlers {
            handler.call();
        }
        handlers.len()
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Ok(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Ok(c) = self.get_mut(child) {
            c.parent = None;
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl Host for Document {
    type Node = NodeId;
    type Error = HeadlessError;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, HeadlessError> {
        let id = u32::try_from(self.nodes.len())
            .map(NodeId)
            .map_err(|_| HeadlessError::Full)?;
        let mutation = match kind {
            NodeKind::Element(tag) => {
                self.nodes.push(NodeData::new(Content::Element(tag.to_owned())));
                Mutation::CreateElement {
                    node: id,
                    tag: tag.to_owned(),
                }
            }
            NodeKind::Text => {
                self.nodes.push(NodeData::new(Content::Text));
                Mutation::CreateText { node: id }
            }
        };
        self.log.push(mutation);
        Ok(id)
    }

    fn set_property(
        &mut self,
        node: &NodeId,
        key: &str,
        value: &AttrValue,
    ) -> Result<(), HeadlessError> {
        let data = self.get_mut(*node)?;
        if data.is_text() && key != TEXT_VALUE_KEY {
            return Err(HeadlessError::TextProperty {
                node: *node,
                key: key.to_owned(),
            });
        }
        data.properties.insert(key.to_owned(), value.clone());
        self.log.push(Mutation::SetProperty {
            node: *node,
            key: key.to_owned(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_property(&mut self, node: &NodeId, key: &str) -> Result<(), HeadlessError> {
        let data = self.get_mut(*node)?;
        if data.is_text() && key != TEXT_VALUE_KEY {
            return Err(HeadlessError::TextProperty {
                node: *node,
                key: key.to_owned(),
            });
        }
        data.properties.remove(key);
        self.log.push(Mutation::ClearProperty {
            node: *node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), HeadlessError> {
        self.get_mut(*node)?
            .listeners
            .push((event.to_owned(), handler.clone()));
        self.log.push(Mutation::AddListener {
            node: *node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), HeadlessError> {
        let data = self.get_mut(*node)?;
        let Some(pos) = data
            .listeners
            .iter()
            .position(|(e, h)| e == event && h.ptr_eq(handler))
        else {
            return Err(HeadlessError::ListenerNotBound {
                node: *node,
                event: event.to_owned(),
            });
        };
        data.listeners.remove(pos);
        self.log.push(Mutation::RemoveListener {
            node: *node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HeadlessError> {
        if self.get(*parent)?.is_text() {
            return Err(HeadlessError::TextParent(*parent));
        }
        self.get(*child)?;
        if self.is_ancestor(*child, *parent) {
            return Err(HeadlessError::Cycle {
                parent: *parent,
                child: *child,
            });
        }
        self.detach(*child);
        self.get_mut(*parent)?.children.push(*child);
        self.get_mut(*child)?.parent = Some(*parent);
        self.log.push(Mutation::Append {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HeadlessError> {
        self.get(*parent)?;
        if self.get(*child)?.parent != Some(*parent) {
            return Err(HeadlessError::NotAChild {
                parent: *parent,
                child: *child,
            });
        }
        self.detach(*child);
        self.log.push(Mutation::Remove {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn el(doc: &mut Document, tag: &str) -> NodeId {
        doc.create_node(NodeKind::Element(tag)).unwrap()
    }

    fn txt(doc: &mut Document, value: &str) -> NodeId {
        let t = doc.create_node(NodeKind::Text).unwrap();
        doc.set_property(&t, TEXT_VALUE_KEY, &value.into()).unwrap();
        t
    }

    #[test]
    fn builds_markup() {
        let mut doc = Document::new();
        let div = el(&mut doc, "div");
        doc.set_property(&div, "id", &"foo".into()).unwrap();
        let t = txt(&mut doc, "a<b");
        doc.append_child(&div, &t).unwrap();
        doc.append_child(&doc.root(), &div).unwrap();
        assert_eq!(doc.to_markup(div), "<div id=\"foo\">a&lt;b</div>");
        assert_eq!(doc.text_content(doc.root()), "a<b");
        assert_eq!(doc.find(doc.root(), "div"), Some(div));
    }

    #[test]
    fn append_moves_attached_node() {
        let mut doc = Document::new();
        let a = el(&mut doc, "a");
        let b = el(&mut doc, "b");
        let c = el(&mut doc, "c");
        doc.append_child(&a, &c).unwrap();
        doc.append_child(&b, &c).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[c]);
        assert_eq!(doc.parent(c), Some(b));
    }

    #[test]
    fn strict_checks() {
        let mut doc = Document::new();
        let a = el(&mut doc, "a");
        let b = el(&mut doc, "b");
        let t = txt(&mut doc, "x");
        assert_eq!(
            doc.remove_child(&a, &b),
            Err(HeadlessError::NotAChild { parent: a, child: b })
        );
        assert!(matches!(
            doc.set_property(&t, "id", &"x".into()),
            Err(HeadlessError::TextProperty { .. })
        ));
        assert_eq!(doc.append_child(&t, &a), Err(HeadlessError::TextParent(t)));
        doc.append_child(&a, &b).unwrap();
        assert_eq!(
            doc.append_child(&b, &a),
            Err(HeadlessError::Cycle { parent: b, child: a })
        );
        assert_eq!(
            doc.append_child(&a, &NodeId(99)),
            Err(HeadlessError::UnknownNode(NodeId(99)))
        );
        let h = Handler::new(|| {});
        assert!(matches!(
            doc.remove_listener(&a, "click", &h),
            Err(HeadlessError::ListenerNotBound { .. })
        ));
    }

    #[test]
    fn dispatch_runs_bound_handlers() {
        use alloc::rc::Rc;
        use core::cell::Cell;

        let hits = Rc::new(Cell::new(0));
        let mut doc = Document::new();
        let button = el(&mut doc, "button");
        let counter = Rc::clone(&hits);
        let handler = Handler::new(move || counter.set(counter.get() + 1));
        doc.add_listener(&button, "click", &handler).unwrap();
        assert_eq!(doc.dispatch(button, "click"), 1);
        assert_eq!(doc.dispatch(button, "keydown"), 0);
        assert_eq!(hits.get(), 1);

        doc.remove_listener(&button, "click", &handler).unwrap();
        assert_eq!(doc.listener_count(button, "click"), 0);
    }

    #[test]
    fn mutation_log_drains() {
        let mut doc = Document::new();
        let a = el(&mut doc, "a");
        doc.append_child(&doc.root(), &a).unwrap();
        assert_eq!(
            doc.take_mutations(),
            vec![
                Mutation::CreateElement {
                    node: a,
                    tag: "a".into(),
                },
                Mutation::Append {
                    parent: NodeId(0),
                    child: a,
                },
            ]
        );
        assert!(doc.mutations().is_empty());
    }
}
