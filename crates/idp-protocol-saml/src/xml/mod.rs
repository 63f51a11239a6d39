//! Namespace-aware XML element tree.
//!
//! SAML documents are parsed into and built as [`Element`] trees. Every
//! element and attribute carries its resolved namespace URI, so lookups are
//! by `(namespace, local name)` and never by prefix text.
//!
//! Trees are serialized once by [`Element::to_xml`] (escaping all character
//! data) and canonicalized by [`c14n::canonicalize`] for signatures.

pub mod c14n;
mod reader;
mod writer;

pub use reader::parse;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix as written, `None` for unprefixed names.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Namespace declarations written on this element.
    pub declarations: Vec<NamespaceDecl>,
    /// Attributes in document order, excluding namespace declarations.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

/// An `xmlns` or `xmlns:prefix` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace URI; empty undeclares the default namespace.
    pub uri: String,
}

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix as written.
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    /// Resolved namespace URI; unprefixed attributes have none.
    pub namespace: Option<String>,
    /// Unescaped value.
    pub value: String,
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Unescaped character data.
    Text(String),
}

impl Element {
    /// Creates a prefixed element in `namespace`.
    pub fn new(prefix: &str, name: &str, namespace: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Declares `prefix` for `uri` on this element.
    #[must_use]
    pub fn declare(mut self, prefix: &str, uri: &str) -> Self {
        self.declarations.push(NamespaceDecl {
            prefix: Some(prefix.to_string()),
            uri: uri.to_string(),
        });
        self
    }

    /// Adds an unqualified attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds an unqualified attribute when `value` is present.
    #[must_use]
    pub fn opt_attr(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    /// Adds a namespace-qualified attribute.
    #[must_use]
    pub fn attr_ns(mut self, prefix: &str, name: &str, namespace: &str, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            prefix: Some(prefix.to_string()),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            value: value.into(),
        });
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends character data.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Sets or replaces an unqualified attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.namespace.is_none() && a.name == name)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                prefix: None,
                name: name.to_string(),
                namespace: None,
                value,
            }),
        }
    }

    /// Returns the value of an unqualified attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns whether this element is `{namespace}name`.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Name as written, with prefix.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.name)
    }

    /// Child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element named `{namespace}name`.
    #[must_use]
    pub fn find_child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(namespace, name))
    }

    /// First element named `{namespace}name` in document order, including
    /// this one.
    #[must_use]
    pub fn find_descendant(&self, namespace: &str, name: &str) -> Option<&Element> {
        if self.is(namespace, name) {
            return Some(self);
        }
        self.child_elements()
            .find_map(|e| e.find_descendant(namespace, name))
    }

    /// All elements, including this one, whose `ID` attribute equals `id`.
    #[must_use]
    pub fn elements_with_id(&self, id: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_ids(id, &mut found);
        found
    }

    fn collect_ids<'a>(&'a self, id: &str, found: &mut Vec<&'a Element>) {
        if self.attribute("ID") == Some(id) {
            found.push(self);
        }
        for child in self.child_elements() {
            child.collect_ids(id, found);
        }
    }

    /// Concatenated character data of this element and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Index in `children` of the first child element named
    /// `{namespace}name`.
    #[must_use]
    pub fn child_position(&self, namespace: &str, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.is(namespace, name)))
    }

    /// Inserts `child` at `index` among `children`.
    pub fn insert_child(&mut self, index: usize, child: Element) {
        self.children.insert(index, Node::Element(child));
    }

    /// Removes and returns the first child element named `{namespace}name`.
    pub fn remove_child(&mut self, namespace: &str, name: &str) -> Option<Element> {
        let index = self.child_position(namespace, name)?;
        match self.children.remove(index) {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }
}

pub(crate) fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    fn sample() -> Element {
        Element::new("t", "Root", NS)
            .declare("t", NS)
            .attr("ID", "_root")
            .child(Element::new("t", "A", NS).text("one"))
            .child(
                Element::new("t", "B", NS)
                    .attr("ID", "_b")
                    .child(Element::new("t", "C", NS).text("two")),
            )
    }

    #[test]
    fn navigation_by_namespace_and_name() {
        let root = sample();
        assert!(root.find_child(NS, "A").is_some());
        assert!(root.find_child("urn:other", "A").is_none());
        assert!(root.find_child(NS, "C").is_none());
        assert_eq!(root.find_descendant(NS, "C").unwrap().text_content(), "two");
        assert_eq!(root.text_content(), "onetwo");
    }

    #[test]
    fn id_lookup_covers_whole_tree() {
        let root = sample();
        assert_eq!(root.elements_with_id("_root").len(), 1);
        assert_eq!(root.elements_with_id("_b")[0].name, "B");
        assert!(root.elements_with_id("_missing").is_empty());
    }

    #[test]
    fn insert_and_remove_children() {
        let mut root = sample();
        let pos = root.child_position(NS, "A").unwrap();
        root.insert_child(pos + 1, Element::new("t", "Inserted", NS));
        let names: Vec<&str> = root.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "Inserted", "B"]);

        assert!(root.remove_child(NS, "Inserted").is_some());
        assert!(root.remove_child(NS, "Inserted").is_none());
    }

    #[test]
    fn set_attribute_replaces() {
        let mut e = Element::new("t", "X", NS).attr("a", "1");
        e.set_attribute("a", "2");
        assert_eq!(e.attribute("a"), Some("2"));
        assert_eq!(e.attributes.len(), 1);
        assert_eq!(e.opt_attr("b", None).attributes.len(), 1);
    }
}
