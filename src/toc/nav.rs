//! EPUB 3 navigation document.

use std::io::{Read, Seek};

use tracing::debug;

use super::{Extraction, TocEntry, TocSourceKind, Unavailable};
use crate::archive::EpubArchive;
use crate::dom::{ArenaNodeId, HtmlDocument, Lookup, parse_html};
use crate::href::ResolvedPath;
use crate::opf::Package;

const NAV: &[Lookup<'static>] = &[Lookup::Xhtml("nav"), Lookup::Local("nav")];
const LIST_ITEM: &[Lookup<'static>] = &[Lookup::Xhtml("li"), Lookup::Local("li")];

/// Extract entries from the first readable navigation document.
///
/// Every manifest item with the `nav` property is tried in manifest order.
pub fn extract<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> Extraction {
    let mut last_failure = Unavailable::NotDeclared(TocSourceKind::Nav);

    for item in package.manifest.iter().filter(|i| i.has_property("nav")) {
        let path = package.resolve(&item.href);
        if !archive.contains(&path) {
            debug!(%path, "navigation document not in archive");
            last_failure = Unavailable::Missing(TocSourceKind::Nav, path);
            continue;
        }
        match archive.read_text(&path) {
            Ok(text) => {
                let entries = entries_from_document(&parse_html(&text), &path);
                debug!(%path, entries = entries.len(), "parsed navigation document");
                return Extraction::Parsed(entries);
            }
            Err(e) => {
                debug!(%path, error = %e, "navigation document unreadable");
                last_failure = Unavailable::Parse(TocSourceKind::Nav, e.to_string());
            }
        }
    }

    Extraction::Unavailable(last_failure)
}

/// Entries of a parsed navigation document located at `source`.
///
/// The first `<nav>` typed `toc` (or with `toc` in its id) is used, and only
/// its top-level list items count: nested sub-lists are not collected.
/// Without such a nav, every list item of the document is considered.
pub fn entries_from_document(doc: &HtmlDocument, source: &ResolvedPath) -> Vec<TocEntry> {
    let dom = doc.dom();
    let toc_nav = dom.find_all(doc.root(), NAV).into_iter().find(|&nav| {
        let typed = doc.epub_type(nav).is_some_and(|t| t.contains("toc"));
        let named = dom
            .get_attr(nav, "id")
            .is_some_and(|id| id.to_lowercase().contains("toc"));
        typed || named
    });

    match toc_nav {
        Some(nav) => {
            let top_level = dom
                .find_all(nav, LIST_ITEM)
                .into_iter()
                .filter(|&li| dom.ancestor_named(li, "li", nav).is_none());
            list_entries(doc, top_level, source)
        }
        None => list_entries(doc, dom.find_all(doc.root(), LIST_ITEM), source),
    }
}

/// First anchor of each list item.
fn list_entries(
    doc: &HtmlDocument,
    items: impl IntoIterator<Item = ArenaNodeId>,
    source: &ResolvedPath,
) -> Vec<TocEntry> {
    let dom = doc.dom();
    items
        .into_iter()
        .filter_map(|li| {
            let anchor = *doc.anchors(li).first()?;
            let href = dom.get_attr(anchor, "href").filter(|h| !h.is_empty())?;
            Some(TocEntry {
                href: href.to_string(),
                text: doc.text(anchor),
                source: source.clone(),
                kind: TocSourceKind::Nav,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(html: &str) -> Vec<(String, String)> {
        let source = ResolvedPath::new("OEBPS/nav.xhtml");
        entries_from_document(&parse_html(html), &source)
            .into_iter()
            .map(|e| (e.href, e.text))
            .collect()
    }

    #[test]
    fn test_toc_nav_preferred_over_landmarks() {
        let html = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<nav epub:type="toc"><ol>
  <li><a href="ch1.xhtml">  Chapter
  One </a></li>
  <li><a href="ch2.xhtml#s1">Chapter Two</a></li>
</ol></nav>
</body></html>"#;
        assert_eq!(
            entries(html),
            vec![
                ("ch1.xhtml".to_string(), "Chapter\n  One".to_string()),
                ("ch2.xhtml#s1".to_string(), "Chapter Two".to_string()),
            ]
        );
    }

    #[test]
    fn test_nav_found_by_id() {
        let html = r#"<html><body>
<nav id="other"><ul><li><a href="x.xhtml">X</a></li></ul></nav>
<nav id="TOC-main"><ul><li><a href="a.xhtml">A</a></li></ul></nav>
</body></html>"#;
        assert_eq!(entries(html), vec![("a.xhtml".to_string(), "A".to_string())]);
    }

    #[test]
    fn test_top_level_items_take_first_anchor_each() {
        let html = r#"<html><body><nav epub:type="toc"><ol>
<li><a href="p1.xhtml">Part 1</a><a href="ignored.xhtml">x</a>
  <ol><li><a href="c1.xhtml">Chapter 1</a></li></ol>
</li>
<li><span>No link</span></li>
<li><a>No href</a></li>
<li><a href="p2.xhtml">Part 2</a></li>
</ol></nav></body></html>"#;
        let hrefs: Vec<_> = entries(html).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hrefs, vec!["p1.xhtml", "p2.xhtml"]);
    }

    #[test]
    fn test_sub_lists_are_not_collected() {
        let html = r#"<html><body><nav epub:type="toc"><ol>
<li><a href="Text/chapter1.xhtml">Part One</a>
  <ol>
    <li><a href="Text/chapter2.xhtml">Chapter 2</a></li>
    <li><a href="Text/chapter3.xhtml">Chapter 3</a></li>
  </ol>
</li>
</ol></nav></body></html>"#;
        let hrefs: Vec<_> = entries(html).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hrefs, vec!["Text/chapter1.xhtml"]);
    }

    #[test]
    fn test_untyped_document_collects_nested_items() {
        let html = r#"<html><body><ul>
<li><a href="p1.xhtml">Part 1</a><ul><li><a href="c1.xhtml">Chapter 1</a></li></ul></li>
</ul></body></html>"#;
        let hrefs: Vec<_> = entries(html).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hrefs, vec!["p1.xhtml", "c1.xhtml"]);
    }

    #[test]
    fn test_untyped_document_falls_back_to_all_list_items() {
        let html = r#"<html><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<div><ul><li><a href="ch1.xhtml">One</a></li></ul></div>
</body></html>"#;
        let hrefs: Vec<_> = entries(html).into_iter().map(|(h, _)| h).collect();
        assert_eq!(hrefs, vec!["cover.xhtml", "ch1.xhtml"]);
    }

    #[test]
    fn test_entries_carry_source() {
        let source = ResolvedPath::new("OEBPS/nav.xhtml");
        let doc = parse_html(r#"<nav epub:type="toc"><ol><li><a href="a.xhtml">A</a></li></ol></nav>"#);
        let found = entries_from_document(&doc, &source);
        assert_eq!(found[0].source, source);
        assert_eq!(found[0].kind, TocSourceKind::Nav);
    }
}
