//! Exclusive XML Canonicalization 1.0, without comments and with an empty
//! inclusive prefix list (`http://www.w3.org/2001/10/xml-exc-c14n#`).
//!
//! Operates on a subtree as if it were the whole document subset:
//!
//! - a namespace declaration is output on an element only when the element
//!   or one of its attributes visibly uses that prefix and the nearest
//!   output ancestor did not already render the same binding
//! - declarations are sorted by prefix (default first), attributes by
//!   namespace URI then local name
//! - empty elements are written as start/end tag pairs
//! - text and attribute values use the canonical escapes

use super::writer::{escape_attribute, escape_text};
use super::{Element, Node, XML_NS};

/// Canonicalizes `element` and its subtree.
#[must_use]
pub fn canonicalize(element: &Element) -> String {
    let mut out = String::new();
    let mut rendered: Vec<(String, String)> = Vec::new();
    write_element(element, &mut rendered, &mut out);
    out
}

fn write_element(element: &Element, rendered: &mut Vec<(String, String)>, out: &mut String) {
    let mark = rendered.len();

    let mut needed: Vec<(String, String)> = Vec::new();
    let mut utilize = |prefix: Option<&str>, uri: Option<&str>| {
        let prefix = prefix.unwrap_or("");
        if prefix == "xml" {
            return;
        }
        let uri = uri.unwrap_or("");
        if needed.iter().any(|(p, _)| p == prefix) {
            return;
        }
        let current = rendered
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map_or("", |(_, u)| u.as_str());
        if current != uri {
            needed.push((prefix.to_string(), uri.to_string()));
        }
    };

    utilize(element.prefix.as_deref(), element.namespace.as_deref());
    for attr in &element.attributes {
        if attr.prefix.is_some() && attr.namespace.as_deref() != Some(XML_NS) {
            utilize(attr.prefix.as_deref(), attr.namespace.as_deref());
        }
    }
    needed.sort();

    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);

    for (prefix, uri) in &needed {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    rendered.extend(needed);

    let mut attributes: Vec<_> = element.attributes.iter().collect();
    attributes.sort_by(|a, b| {
        (a.namespace.as_deref().unwrap_or(""), a.name.as_str())
            .cmp(&(b.namespace.as_deref().unwrap_or(""), b.name.as_str()))
    });
    for attr in attributes {
        out.push(' ');
        out.push_str(&super::qualified(attr.prefix.as_deref(), &attr.name));
        out.push_str("=\"");
        escape_attribute(&attr.value, out);
        out.push('"');
    }
    out.push('>');

    for node in &element.children {
        match node {
            Node::Element(child) => write_element(child, rendered, out),
            Node::Text(text) => escape_text(text, out),
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');

    rendered.truncate(mark);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    fn c14n(xml: &str) -> String {
        canonicalize(&parse(xml).unwrap())
    }

    #[test]
    fn sorts_attributes_and_expands_empty_elements() {
        assert_eq!(
            c14n(r#"<r b="2" a="1"><e/></r>"#),
            r#"<r a="1" b="2"><e></e></r>"#
        );
    }

    #[test]
    fn namespaced_attributes_sort_after_unqualified() {
        assert_eq!(
            c14n(r#"<r xmlns:z="urn:a" xmlns:y="urn:b" y:k="1" z:k="2" k="0"/>"#),
            r#"<r xmlns:y="urn:b" xmlns:z="urn:a" k="0" z:k="2" y:k="1"></r>"#
        );
    }

    #[test]
    fn omits_unused_declarations() {
        assert_eq!(
            c14n(r#"<p:r xmlns:p="urn:p" xmlns:unused="urn:u"><p:c/></p:r>"#),
            r#"<p:r xmlns:p="urn:p"><p:c></p:c></p:r>"#
        );
    }

    #[test]
    fn renders_declarations_where_first_used() {
        assert_eq!(
            c14n(r#"<p:r xmlns:p="urn:p" xmlns:q="urn:q"><q:c/><q:d/></p:r>"#),
            r#"<p:r xmlns:p="urn:p"><q:c xmlns:q="urn:q"></q:c><q:d xmlns:q="urn:q"></q:d></p:r>"#
        );
    }

    #[test]
    fn subtree_carries_inherited_namespace() {
        let root = parse(r#"<p:r xmlns:p="urn:p"><p:c a="1"/></p:r>"#).unwrap();
        let child = root.find_child("urn:p", "c").unwrap();
        assert_eq!(canonicalize(child), r#"<p:c xmlns:p="urn:p" a="1"></p:c>"#);
    }

    #[test]
    fn undeclares_default_namespace_when_needed() {
        assert_eq!(
            c14n(r#"<r xmlns="urn:d"><c xmlns=""/></r>"#),
            r#"<r xmlns="urn:d"><c xmlns=""></c></r>"#
        );
    }

    #[test]
    fn canonical_escaping() {
        assert_eq!(
            c14n("<r a=\"&lt;&gt;&quot;&#x9;&#xA;&#xD;\">&lt;&gt;&amp;&#xD;\"</r>"),
            "<r a=\"&lt;>&quot;&#x9;&#xA;&#xD;\">&lt;&gt;&amp;&#xD;\"</r>"
        );
    }

    #[test]
    fn prefix_spelling_is_preserved() {
        let a = c14n(r#"<a:r xmlns:a="urn:x"/>"#);
        let b = c14n(r#"<b:r xmlns:b="urn:x"/>"#);
        assert_ne!(a, b);
    }

    #[test]
    fn whitespace_and_quote_style_do_not_matter() {
        assert_eq!(
            c14n("<r  a='v' ><c\n/></r>"),
            c14n(r#"<r a="v"><c></c></r>"#)
        );
    }
}
