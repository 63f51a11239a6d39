//! Serialization of element trees.

use super::{Element, Node, XML_NS};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

impl Element {
    /// Serializes this element and its subtree.
    ///
    /// Declarations present on the tree are written as given; any prefix
    /// used without an in-scope binding is declared where it is first used,
    /// so the output always re-parses to the same namespaces.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        let mut scope = Vec::new();
        write_element(self, &mut scope, &mut out);
        out
    }

    /// Serializes this element as a standalone document with an XML
    /// declaration.
    #[must_use]
    pub fn to_document(&self) -> String {
        format!("{XML_DECLARATION}{}", self.to_xml())
    }
}

type Scope = Vec<(Option<String>, String)>;

fn write_element(element: &Element, scope: &mut Scope, out: &mut String) {
    let mark = scope.len();
    let name = element.qualified_name();

    out.push('<');
    out.push_str(&name);

    for decl in &element.declarations {
        write_declaration(decl.prefix.as_deref(), &decl.uri, out);
        scope.push((decl.prefix.clone(), decl.uri.clone()));
    }

    match (element.prefix.as_deref(), element.namespace.as_deref()) {
        (None, namespace) => ensure_bound(None, namespace.unwrap_or(""), scope, out),
        (Some(prefix), Some(namespace)) => ensure_bound(Some(prefix), namespace, scope, out),
        (Some(_), None) => {}
    }
    for attr in &element.attributes {
        if let (Some(prefix), Some(namespace)) = (attr.prefix.as_deref(), attr.namespace.as_deref()) {
            ensure_bound(Some(prefix), namespace, scope, out);
        }
    }

    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&super::qualified(attr.prefix.as_deref(), &attr.name));
        out.push_str("=\"");
        escape_attribute(&attr.value, out);
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        for node in &element.children {
            match node {
                Node::Element(child) => write_element(child, scope, out),
                Node::Text(text) => escape_text(text, out),
            }
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }

    scope.truncate(mark);
}

fn ensure_bound(prefix: Option<&str>, uri: &str, scope: &mut Scope, out: &mut String) {
    if prefix == Some("xml") || uri == XML_NS {
        return;
    }
    let current = scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map_or("", |(_, u)| u.as_str());
    if current != uri {
        write_declaration(prefix, uri, out);
        scope.push((prefix.map(str::to_string), uri.to_string()));
    }
}

fn write_declaration(prefix: Option<&str>, uri: &str, out: &mut String) {
    match prefix {
        Some(p) => {
            out.push_str(" xmlns:");
            out.push_str(p);
        }
        None => out.push_str(" xmlns"),
    }
    out.push_str("=\"");
    escape_attribute(uri, out);
    out.push('"');
}

/// Escapes an attribute value so that it re-parses to exactly `value`.
pub(crate) fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

/// Escapes character data.
pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}
