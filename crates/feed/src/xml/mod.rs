// ABOUTME: Owned XML document tree with namespace-aware, copyable node handles.
// ABOUTME: Nodes live in an index arena owned by Document and are freed together with it.

mod builder;

use std::fmt::Write as _;

use quick_xml::escape::escape;
use url::Url;

use crate::namespaces::XML_URI;

/// Maximum element nesting accepted before the builder stops reading.
pub const MAX_DEPTH: usize = 256;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// An attribute with its namespace already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug)]
struct ElementData {
    name: String,
    prefix: Option<String>,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    /// `xmlns` / `xmlns:p` declarations made on this element.
    declarations: Vec<(Option<String>, String)>,
}

#[derive(Debug)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// A parsed XML document.
///
/// The document exclusively owns every node; [`Node`] handles borrow it, so no
/// node can outlive the tree it came from.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    encoding: Option<String>,
    url: String,
}

impl Document {
    /// Builds a tree from canonical (already decoded) text, recovering from
    /// malformed markup where the structure is still unambiguous.
    ///
    /// `url` is the logical base identifier; it is only used for diagnostics and
    /// relative `xml:base` resolution.
    pub fn parse(text: &str, url: &str) -> Document {
        builder::build(text, url)
    }

    fn empty(url: &str) -> Document {
        Document {
            nodes: Vec::new(),
            root: None,
            encoding: None,
            url: url.to_string(),
        }
    }

    /// The root element, if the input contained one.
    pub fn root(&self) -> Option<Node<'_>> {
        self.root.map(|id| self.node(id))
    }

    /// Encoding named in the XML declaration, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Base identifier the document was parsed with.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of nodes (elements and text) in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle for a node id obtained from this document.
    ///
    /// # Panics
    /// Panics if `id` belongs to another document with more nodes.
    pub fn node(&self, id: NodeId) -> Node<'_> {
        assert!(id.0 < self.nodes.len(), "node id out of range");
        Node { doc: self, id }
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Appends text under `parent`, merging with a trailing text sibling.
    fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }
        self.push(Some(parent), NodeKind::Text(text.to_string()));
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Resolves a namespace prefix as seen from element `id`.
    fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_URI.to_string());
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(el) = self.element(node_id) {
                if let Some((_, uri)) = el
                    .declarations
                    .iter()
                    .find(|(p, _)| p.as_deref() == prefix)
                {
                    return if uri.is_empty() { None } else { Some(uri.clone()) };
                }
            }
            current = self.nodes[node_id.0].parent;
        }
        None
    }
}

/// Borrowed handle to a node of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    /// The document this node belongs to.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &'a NodeData {
        &self.doc.nodes[self.id.0]
    }

    fn element_data(&self) -> Option<&'a ElementData> {
        self.doc.element(self.id)
    }

    pub fn is_element(&self) -> bool {
        self.element_data().is_some()
    }

    pub fn is_text(&self) -> bool {
        !self.is_element()
    }

    /// Local name of an element; empty for text nodes.
    pub fn name(&self) -> &'a str {
        self.element_data().map(|el| el.name.as_str()).unwrap_or("")
    }

    pub fn prefix(&self) -> Option<&'a str> {
        self.element_data().and_then(|el| el.prefix.as_deref())
    }

    /// Namespace URI of an element, if it is in one.
    pub fn namespace(&self) -> Option<&'a str> {
        self.element_data().and_then(|el| el.namespace.as_deref())
    }

    /// True for an element with the given local name and namespace.
    pub fn has_name(&self, name: &str, namespace: Option<&str>) -> bool {
        self.is_element() && self.name() == name && self.namespace() == namespace
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        self.element_data()
            .map(|el| el.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Value of an attribute that carries no namespace.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespaced attribute such as `rdf:about` or `xml:lang`.
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.doc.node(id))
    }

    /// All child nodes, text included, in document order.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| doc.node(id))
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.children().filter(|n| n.is_element())
    }

    /// First child element with the given local name and namespace.
    pub fn child(&self, name: &str, namespace: Option<&str>) -> Option<Node<'a>> {
        self.elements().find(|n| n.has_name(name, namespace))
    }

    /// Text of the first matching child element, trimmed; `None` if absent.
    pub fn child_text(&self, name: &str, namespace: Option<&str>) -> Option<String> {
        self.child(name, namespace).map(|n| n.text().trim().to_string())
    }

    /// Concatenated text of this node and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            let data = &self.doc.nodes[id.0];
            match &data.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(_) => stack.extend(data.children.iter().rev()),
            }
        }
        out
    }

    /// Markup of all children, re-serialized.
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            child.write_xml(&mut out);
        }
        out
    }

    fn write_xml(&self, out: &mut String) {
        let el = match &self.data().kind {
            NodeKind::Text(text) => {
                out.push_str(&escape(text.as_str()));
                return;
            }
            NodeKind::Element(el) => el,
        };
        let qname = match &el.prefix {
            Some(prefix) => format!("{}:{}", prefix, el.name),
            None => el.name.clone(),
        };
        out.push('<');
        out.push_str(&qname);
        for (prefix, uri) in &el.declarations {
            match prefix {
                Some(p) => {
                    let _ = write!(out, " xmlns:{}=\"{}\"", p, escape(uri.as_str()));
                }
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape(uri.as_str()));
                }
            }
        }
        for attr in &el.attributes {
            match &attr.prefix {
                Some(p) => {
                    let _ = write!(out, " {}:{}=\"{}\"", p, attr.name, escape(attr.value.as_str()));
                }
                None => {
                    let _ = write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()));
                }
            }
        }
        if self.data().children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in self.children() {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&qname);
        out.push('>');
    }

    /// Effective `xml:base` for this node, resolved against enclosing bases and
    /// the document URL where possible.
    pub fn xml_base(&self) -> Option<String> {
        let mut bases = Vec::new();
        let mut current = Some(*self);
        while let Some(node) = current {
            if let Some(base) = node.attribute_ns(XML_URI, "base") {
                bases.push(base.trim());
            }
            current = node.parent();
        }
        if bases.is_empty() {
            return None;
        }
        let mut resolved = Url::parse(self.doc.url()).ok();
        let mut last_raw = None;
        for base in bases.into_iter().rev() {
            resolved = match &resolved {
                Some(url) => url.join(base).ok(),
                None => Url::parse(base).ok(),
            };
            last_raw = Some(base);
        }
        resolved
            .map(|u| u.to_string())
            .or_else(|| last_raw.map(String::from))
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data().kind {
            NodeKind::Element(el) => f
                .debug_struct("Element")
                .field("name", &el.name)
                .field("namespace", &el.namespace)
                .finish(),
            NodeKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}
