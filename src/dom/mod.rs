//! Tolerant HTML parsing for navigation documents and content pages.
//!
//! Documents are parsed with html5ever (the HTML5 algorithm never rejects
//! input) into an arena DOM. XHTML served as HTML loses namespace prefixes on
//! attributes, so helpers here accept both `epub:type` spellings.

mod arena;
mod tree_sink;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, Lookup};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::ArenaSink;

/// IDPF operations namespace, home of `epub:type`.
pub const OPS_NAMESPACE: &str = "http://www.idpf.org/2007/ops";

/// A parsed HTML document.
pub struct HtmlDocument {
    dom: ArenaDom,
    recovered_errors: usize,
}

/// Parse HTML or XHTML text.
pub fn parse_html(html: &str) -> HtmlDocument {
    let sink = ArenaSink::new();
    let (dom, recovered_errors) = parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_parts();
    HtmlDocument {
        dom,
        recovered_errors,
    }
}

impl HtmlDocument {
    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    pub fn root(&self) -> ArenaNodeId {
        self.dom.document()
    }

    /// Parse errors html5ever recovered from.
    pub fn recovered_errors(&self) -> usize {
        self.recovered_errors
    }

    /// Text of `<body>`, or of the whole document when there is no body.
    pub fn body_text(&self) -> String {
        let body = self
            .dom
            .find_first(self.root(), &[Lookup::Xhtml("body"), Lookup::Local("body")]);
        self.dom.text_content(body.unwrap_or(self.root()))
    }

    /// Anchors under `root`, in document order.
    pub fn anchors(&self, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        self.dom
            .find_all(root, &[Lookup::Xhtml("a"), Lookup::Local("a")])
    }

    /// Trimmed text of an element.
    pub fn text(&self, id: ArenaNodeId) -> String {
        self.dom.text_content(id).trim().to_string()
    }

    /// Value of the EPUB structural-semantics `type` attribute.
    ///
    /// Matches `epub:type` whether it survived parsing as a namespaced
    /// attribute or as a plain attribute with a colon in its name.
    pub fn epub_type(&self, id: ArenaNodeId) -> Option<&str> {
        self.dom
            .attrs(id)
            .iter()
            .find(|a| {
                let local = a.name.local.as_ref();
                local == "epub:type"
                    || (local == "type"
                        && (a.name.prefix.as_ref().is_some_and(|p| p.as_ref() == "epub")
                            || a.name.ns.as_ref() == OPS_NAMESPACE))
            })
            .map(|a| a.value.as_str())
    }
}
