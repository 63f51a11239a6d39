//! Parsing XML text into element trees.
//!
//! Built on quick-xml's event reader with a namespace scope stack. Comments
//! and processing instructions are dropped. DTDs are refused outright, so no
//! entity beyond the five predefined ones is ever expanded.

use std::borrow::Cow;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Attribute, Element, NamespaceDecl, Node, XML_NS};
use crate::{SamlError, SamlResult};

type Scope = Vec<(Option<String>, String)>;

/// Parses a complete document into its root element.
///
/// # Errors
///
/// Returns [`SamlError::Parse`] for malformed XML, a `DOCTYPE`, unbound
/// prefixes, content outside the root element, or a missing root.
pub fn parse(xml: &str) -> SamlResult<Element> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<Element> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open_element(&start, &mut scopes)?;
                open.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start, &mut scopes)?;
                scopes.pop();
                attach(element, &mut open, &mut root)?;
            }
            Event::End(_) => {
                scopes.pop();
                let element = open
                    .pop()
                    .ok_or_else(|| SamlError::Parse("unexpected end tag".to_string()))?;
                attach(element, &mut open, &mut root)?;
            }
            Event::Text(text) => {
                let raw = utf8(&text)?;
                let value = unescape(&normalize_line_endings(raw))
                    .map_err(|e| SamlError::Parse(format!("invalid character data: {e}")))?
                    .into_owned();
                push_text(value, &mut open)?;
            }
            Event::CData(data) => {
                let raw = utf8(&data)?;
                push_text(normalize_line_endings(raw).into_owned(), &mut open)?;
            }
            Event::DocType(_) => {
                return Err(SamlError::Parse("DOCTYPE is not allowed".to_string()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(SamlError::Parse(format!(
            "unclosed element <{}>",
            unclosed.qualified_name()
        )));
    }
    root.ok_or_else(|| SamlError::Parse("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>, scopes: &mut Vec<Scope>) -> SamlResult<Element> {
    let qname = utf8(start.name().as_ref())?.to_string();
    let (prefix, name) = split_qname(&qname)?;

    let mut declarations = Vec::new();
    let mut plain = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attribute_value(&attr.value)?;

        if key == "xmlns" {
            declarations.push(NamespaceDecl { prefix: None, uri: value });
        } else if let Some(p) = key.strip_prefix("xmlns:") {
            if value.is_empty() {
                return Err(SamlError::Parse(format!("prefix `{p}` bound to empty namespace")));
            }
            declarations.push(NamespaceDecl {
                prefix: Some(p.to_string()),
                uri: value,
            });
        } else {
            plain.push((key, value));
        }
    }

    scopes.push(
        declarations
            .iter()
            .map(|d| (d.prefix.clone(), d.uri.clone()))
            .collect(),
    );

    let namespace = resolve(prefix, scopes)?;

    let mut attributes: Vec<Attribute> = Vec::with_capacity(plain.len());
    for (key, value) in plain {
        let (attr_prefix, attr_name) = split_qname(&key)?;
        let attr_namespace = match attr_prefix {
            Some(_) => resolve(attr_prefix, scopes)?,
            None => None,
        };
        if attributes
            .iter()
            .any(|a| a.name == attr_name && a.namespace == attr_namespace)
        {
            return Err(SamlError::Parse(format!("duplicate attribute `{key}`")));
        }
        attributes.push(Attribute {
            prefix: attr_prefix.map(str::to_string),
            name: attr_name.to_string(),
            namespace: attr_namespace,
            value,
        });
    }

    Ok(Element {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
        namespace,
        declarations,
        attributes,
        children: Vec::new(),
    })
}

fn resolve(prefix: Option<&str>, scopes: &[Scope]) -> SamlResult<Option<String>> {
    if prefix == Some("xml") {
        return Ok(Some(XML_NS.to_string()));
    }

    let bound = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str());

    match (prefix, bound) {
        (_, Some("")) | (None, None) => Ok(None),
        (_, Some(uri)) => Ok(Some(uri.to_string())),
        (Some(p), None) => Err(SamlError::Parse(format!("unbound namespace prefix `{p}`"))),
    }
}

fn attach(element: Element, open: &mut [Element], root: &mut Option<Element>) -> SamlResult<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(SamlError::Parse("multiple root elements".to_string()))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn push_text(text: String, open: &mut [Element]) -> SamlResult<()> {
    match open.last_mut() {
        Some(parent) => {
            if !text.is_empty() {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SamlError::Parse("text outside the root element".to_string())),
    }
}

fn split_qname(qname: &str) -> SamlResult<(Option<&str>, &str)> {
    match qname.split_once(':') {
        None => Ok((None, qname)),
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() && !local.contains(':') => {
            Ok((Some(prefix), local))
        }
        Some(_) => Err(SamlError::Parse(format!("invalid qualified name `{qname}`"))),
    }
}

/// Applies XML line-end normalization and attribute-value normalization
/// before resolving references.
fn attribute_value(raw: &[u8]) -> SamlResult<String> {
    let normalized: String = normalize_line_endings(utf8(raw)?)
        .chars()
        .map(|c| if c == '\t' || c == '\n' { ' ' } else { c })
        .collect();
    unescape(&normalized)
        .map(Cow::into_owned)
        .map_err(|e| SamlError::Parse(format!("invalid attribute value: {e}")))
}

fn normalize_line_endings(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::Parse(format!("invalid UTF-8: {e}")))
}
