//! Tolerant XML parsing for package, container and NCX documents.
//!
//! Real-world EPUBs ship mismatched end tags, undeclared prefixes and
//! unknown entities. [`XmlDocument::parse`] never fails: it builds as much of
//! the element tree as the reader can produce, closes whatever is still open
//! when it stops, and records the fault that stopped it.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// One way of finding elements by name.
///
/// Lookups are tried in order and the first strategy that matches anything
/// wins, so `[Qualified { .. }, Local(..)]` prefers namespaced elements and
/// falls back to matching on the local name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Local name in a specific namespace.
    Qualified { namespace: &'a str, local: &'a str },
    /// Local name in any namespace, or none.
    Local(&'a str),
}

impl Lookup<'_> {
    pub fn matches(&self, element: &XmlElement) -> bool {
        match *self {
            Lookup::Qualified { namespace, local } => {
                element.local == local && element.namespace.as_deref() == Some(namespace)
            }
            Lookup::Local(local) => element.local == local,
        }
    }
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub prefix: Option<String>,
    pub local: String,
    /// Resolved namespace URI, if the prefix (or default) was declared.
    pub namespace: Option<String>,
    attrs: Vec<(String, String)>,
    declared: Vec<(Option<String>, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Attribute value by qualified name as written (`href`, `xml:lang`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Namespaces declared on this element, in document order.
    /// The default namespace has no prefix.
    pub fn declared_namespaces(&self) -> &[(Option<String>, String)] {
        &self.declared
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.declared
            .iter()
            .find(|(prefix, _)| prefix.is_none())
            .map(|(_, uri)| uri.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct children matched by the first successful lookup.
    pub fn children(&self, lookups: &[Lookup<'_>]) -> Vec<&XmlElement> {
        first_success(lookups, |lookup| {
            self.child_elements().filter(|el| lookup.matches(el)).collect()
        })
    }

    /// First direct child matched by the first successful lookup.
    pub fn child(&self, lookups: &[Lookup<'_>]) -> Option<&XmlElement> {
        self.children(lookups).into_iter().next()
    }

    /// Descendants (excluding `self`) in document order, matched by the
    /// first successful lookup.
    pub fn descendants(&self, lookups: &[Lookup<'_>]) -> Vec<&XmlElement> {
        first_success(lookups, |lookup| {
            let mut found = Vec::new();
            self.collect_descendants(lookup, &mut found);
            found
        })
    }

    /// First descendant in document order.
    pub fn first_descendant(&self, lookups: &[Lookup<'_>]) -> Option<&XmlElement> {
        self.descendants(lookups).into_iter().next()
    }

    fn collect_descendants<'s>(&'s self, lookup: &Lookup<'_>, found: &mut Vec<&'s XmlElement>) {
        for child in self.child_elements() {
            if lookup.matches(child) {
                found.push(child);
            }
            child.collect_descendants(lookup, found);
        }
    }

    /// Text before the first child element.
    pub fn leading_text(&self) -> Option<&str> {
        match self.children.first() {
            Some(XmlNode::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// All descendant text concatenated.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.push_text(out),
            }
        }
    }

    fn push_text_node(&mut self, text: &str) {
        if let Some(XmlNode::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

fn first_success<'e, F>(lookups: &[Lookup<'_>], mut run: F) -> Vec<&'e XmlElement>
where
    F: FnMut(&Lookup<'_>) -> Vec<&'e XmlElement>,
{
    for lookup in lookups {
        let found = run(lookup);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// A parsed, possibly partial, XML document.
#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    root: Option<XmlElement>,
    fault: Option<String>,
}

impl XmlDocument {
    /// Parse with recovery. Never fails.
    pub fn parse(content: &str) -> Self {
        let mut reader = Reader::from_str(content);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.expand_empty_elements = true;

        let mut builder = TreeBuilder::default();
        let mut fault = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => builder.open(&e),
                Ok(Event::Empty(e)) => {
                    builder.open(&e);
                    builder.close_top();
                }
                Ok(Event::End(e)) => builder.close(e.name().as_ref()),
                Ok(Event::Text(e)) => builder.text(&String::from_utf8_lossy(e.as_ref())),
                Ok(Event::CData(e)) => builder.text(&String::from_utf8_lossy(e.as_ref())),
                Ok(Event::GeneralRef(e)) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        builder.text(&resolved);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    warn!(
                        position = reader.buffer_position(),
                        "recovering from XML error: {e}"
                    );
                    fault = Some(e.to_string());
                    break;
                }
                _ => {}
            }
        }

        Self {
            root: builder.finish(),
            fault,
        }
    }

    pub fn root(&self) -> Option<&XmlElement> {
        self.root.as_ref()
    }

    /// The error that stopped parsing early, if any.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<(Vec<u8>, XmlElement)>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    fn open(&mut self, start: &BytesStart<'_>) {
        let qname = start.name();
        let raw = qname.as_ref();
        let (prefix, local) = split_qname(raw);

        let mut element = XmlElement {
            prefix: prefix.map(|p| String::from_utf8_lossy(p).into_owned()),
            local: String::from_utf8_lossy(local).into_owned(),
            ..Default::default()
        };

        let mut attributes = start.attributes();
        attributes.with_checks(false);
        for attr in attributes.flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = unescape_value(&String::from_utf8_lossy(&attr.value)).into_owned();
            if key == "xmlns" {
                element.declared.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                element.declared.push((Some(prefix.to_string()), value));
            } else {
                element.attrs.push((key, value));
            }
        }

        element.namespace = self.resolve_prefix(&element, element.prefix.as_deref());
        self.stack.push((raw.to_vec(), element));
    }

    fn resolve_prefix(&self, element: &XmlElement, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        let scopes = std::iter::once(element).chain(self.stack.iter().rev().map(|(_, el)| el));
        for scope in scopes {
            if let Some((_, uri)) = scope
                .declared
                .iter()
                .find(|(declared, _)| declared.as_deref() == prefix)
            {
                return (!uri.is_empty()).then(|| uri.clone());
            }
        }
        None
    }

    /// Close up to and including the innermost element named `name`.
    /// Stray end tags are ignored.
    fn close(&mut self, name: &[u8]) {
        if !self.stack.iter().any(|(raw, _)| raw == name) {
            return;
        }
        while let Some((raw, _)) = self.stack.last() {
            let done = raw == name;
            self.close_top();
            if done {
                break;
            }
        }
    }

    fn close_top(&mut self) {
        let Some((_, element)) = self.stack.pop() else {
            return;
        };
        match self.stack.last_mut() {
            Some((_, parent)) => parent.children.push(XmlNode::Element(element)),
            None => {
                if self.root.is_none() {
                    self.root = Some(element);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, element)) = self.stack.last_mut() {
            element.push_text_node(text);
        }
    }

    fn finish(mut self) -> Option<XmlElement> {
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.root
    }
}

fn split_qname(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match name.iter().position(|&b| b == b':') {
        Some(i) => (Some(&name[..i]), &name[i + 1..]),
        None => (None, name),
    }
}

fn unescape_value(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX_NS: &str = "http://www.daisy.org/z3986/2005/ncx/";

    #[test]
    fn test_namespaces_are_resolved() {
        let doc = XmlDocument::parse(
            r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
                 <opf:metadata><dc:title>T</dc:title></opf:metadata>
               </opf:package>"#,
        );
        let root = doc.root().unwrap();
        assert_eq!(root.local, "package");
        assert_eq!(root.namespace.as_deref(), Some("http://www.idpf.org/2007/opf"));
        assert_eq!(root.declared_namespaces().len(), 2);

        let title = root.first_descendant(&[Lookup::Local("title")]).unwrap();
        assert_eq!(title.namespace.as_deref(), Some("http://purl.org/dc/elements/1.1/"));
        assert_eq!(title.text_content(), "T");
    }

    #[test]
    fn test_lookup_falls_back_to_local_name() {
        let doc = XmlDocument::parse("<ncx><navMap><navPoint/><navPoint/></navMap></ncx>");
        let root = doc.root().unwrap();
        let lookups = [
            Lookup::Qualified {
                namespace: NCX_NS,
                local: "navPoint",
            },
            Lookup::Local("navPoint"),
        ];
        assert_eq!(root.descendants(&lookups).len(), 2);
    }

    #[test]
    fn test_qualified_lookup_wins_when_present() {
        let doc = XmlDocument::parse(&format!(
            r#"<ncx xmlns="{NCX_NS}"><a/><x:a xmlns:x="urn:other"/></ncx>"#
        ));
        let root = doc.root().unwrap();
        let lookups = [
            Lookup::Qualified {
                namespace: NCX_NS,
                local: "a",
            },
            Lookup::Local("a"),
        ];
        assert_eq!(root.children(&lookups).len(), 1);
        assert_eq!(root.children(&[Lookup::Local("a")]).len(), 2);
    }

    #[test]
    fn test_mismatched_end_tags_recover() {
        let doc = XmlDocument::parse("<root><a><b>text</a><c/></root>");
        let root = doc.root().unwrap();
        assert!(root.first_descendant(&[Lookup::Local("b")]).is_some());
        assert!(root.first_descendant(&[Lookup::Local("c")]).is_some());
    }

    #[test]
    fn test_truncated_document_keeps_parsed_prefix() {
        let doc = XmlDocument::parse(r#"<manifest><item id="a" href="a.xhtml"/><item id="b" hre"#);
        let root = doc.root().unwrap();
        let items = root.children(&[Lookup::Local("item")]);
        assert!(!items.is_empty());
        assert_eq!(items[0].attr("href"), Some("a.xhtml"));
    }

    #[test]
    fn test_garbage_has_no_root() {
        let doc = XmlDocument::parse("this is not xml");
        assert!(doc.root().is_none());
    }

    #[test]
    fn test_entities_in_text_and_attributes() {
        let doc = XmlDocument::parse(r#"<t a="x &amp; y">Don&apos;t &#x41;&#66;</t>"#);
        let root = doc.root().unwrap();
        assert_eq!(root.attr("a"), Some("x & y"));
        assert_eq!(root.text_content(), "Don't AB");
    }

    #[test]
    fn test_leading_text() {
        let doc = XmlDocument::parse("<text>Chapter 1<span>x</span>tail</text>");
        assert_eq!(doc.root().unwrap().leading_text(), Some("Chapter 1"));
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("#8217"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("bogus"), None);
    }
}
