//! Hand-written table-of-contents pages.
//!
//! Many EPUBs carry a "Contents" XHTML page in the spine in addition to (or
//! instead of) machine-readable navigation. Links on such pages count as TOC
//! reachability for the copyright check.

use std::io::{Read, Seek};

use tracing::debug;

use super::{TocEntry, TocSourceKind};
use crate::archive::EpubArchive;
use crate::dom::{HtmlDocument, parse_html};
use crate::href::ResolvedPath;
use crate::opf::Package;

/// File-name fragments of a human TOC page.
pub const TOC_PAGE_KEYWORDS: &[&str] = &["toc", "contents"];

pub fn is_toc_page_name(name: &str) -> bool {
    let name = name.to_lowercase();
    TOC_PAGE_KEYWORDS.iter().any(|k| name.contains(k))
}

/// Every anchor of every TOC-named spine page.
///
/// Pages that are missing or unreadable are skipped.
pub fn extract<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    for item in package.spine_items() {
        let path = package.resolve(&item.href);
        if !is_toc_page_name(path.file_name()) || !archive.contains(&path) {
            continue;
        }
        match archive.read_text(&path) {
            Ok(text) => entries.extend(page_entries(&parse_html(&text), &path)),
            Err(e) => debug!(%path, error = %e, "skipping unreadable TOC page"),
        }
    }
    entries
}

/// Anchors with an href on one page.
pub fn page_entries(doc: &HtmlDocument, source: &ResolvedPath) -> Vec<TocEntry> {
    let dom = doc.dom();
    doc.anchors(doc.root())
        .into_iter()
        .filter_map(|a| {
            let href = dom.get_attr(a, "href").filter(|h| !h.is_empty())?;
            Some(TocEntry {
                href: href.to_string(),
                text: doc.text(a),
                source: source.clone(),
                kind: TocSourceKind::HumanPage,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_page_names() {
        assert!(is_toc_page_name("TOC.xhtml"));
        assert!(is_toc_page_name("Contents01.html"));
        assert!(!is_toc_page_name("chapter1.xhtml"));
    }

    #[test]
    fn test_page_entries() {
        let doc = parse_html(
            r#"<html><body><h1>Contents</h1>
<p><a href="../Text/copyright.xhtml">Copyright</a></p>
<p><a href="ch1.xhtml#c1">One</a> <a name="anchor-only">x</a></p>
</body></html>"#,
        );
        let source = ResolvedPath::new("OEBPS/Misc/contents.xhtml");
        let entries = page_entries(&doc, &source);
        let hrefs: Vec<_> = entries.iter().map(|e| e.href.as_str()).collect();
        assert_eq!(hrefs, vec!["../Text/copyright.xhtml", "ch1.xhtml#c1"]);
        assert!(entries.iter().all(|e| e.kind == TocSourceKind::HumanPage));
    }
}
