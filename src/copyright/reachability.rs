//! Whether a located copyright page is linked from a table of contents.

use std::fmt;

use serde::Serialize;

use crate::href::{HrefResolver, ResolvedPath};
use crate::toc::TocEntry;

/// A table of contents that links the copyright page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Reachability {
    #[serde(rename = "in ncx")]
    InNcx,
    #[serde(rename = "in human toc page")]
    InHumanTocPage,
}

impl Reachability {
    pub fn label(self) -> &'static str {
        match self {
            Reachability::InNcx => "in ncx",
            Reachability::InHumanTocPage => "in human toc page",
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether any entry, fragment stripped, resolves to `target`.
pub fn links_to(entries: &[TocEntry], target: &ResolvedPath, resolver: &HrefResolver<'_>) -> bool {
    entries.iter().any(|entry| entry.target(resolver) == *target)
}

/// Tables of contents that reach `target`. Empty means unreachable.
pub fn check_reachability(
    ncx: &[TocEntry],
    human: &[TocEntry],
    target: &ResolvedPath,
    resolver: &HrefResolver<'_>,
) -> Vec<Reachability> {
    let mut hits = Vec::new();
    if links_to(ncx, target, resolver) {
        hits.push(Reachability::InNcx);
    }
    if links_to(human, target, resolver) {
        hits.push(Reachability::InHumanTocPage);
    }
    hits
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::toc::TocSourceKind;

    fn entry(href: &str, source: &str, kind: TocSourceKind) -> TocEntry {
        TocEntry {
            href: href.to_string(),
            text: String::new(),
            source: ResolvedPath::new(source),
            kind,
        }
    }

    #[test]
    fn test_ncx_hit_with_fragment() {
        let ncx = vec![
            entry("content/intro.xhtml", "OEBPS/toc.ncx", TocSourceKind::Ncx),
            entry("content/chapter1.xhtml#top", "OEBPS/toc.ncx", TocSourceKind::Ncx),
        ];
        let target = ResolvedPath::new("OEBPS/content/chapter1.xhtml");
        let hits = check_reachability(&ncx, &[], &target, &HrefResolver::new());
        assert_eq!(hits, vec![Reachability::InNcx]);
    }

    #[test]
    fn test_human_page_relative_link() {
        let human = vec![entry(
            "../Text/copy%20right.xhtml",
            "OEBPS/Misc/contents.xhtml",
            TocSourceKind::HumanPage,
        )];
        let target = ResolvedPath::new("OEBPS/Text/copy right.xhtml");
        let hits = check_reachability(&[], &human, &target, &HrefResolver::new());
        assert_eq!(hits, vec![Reachability::InHumanTocPage]);
        assert_eq!(hits[0].to_string(), "in human toc page");
    }

    #[test]
    fn test_archive_entry_short_circuit() {
        let entries: HashSet<String> = ["OEBPS/Text/legal.xhtml".to_string()].into();
        let ncx = vec![entry("OEBPS/Text/legal.xhtml", "OEBPS/toc.ncx", TocSourceKind::Ncx)];
        let target = ResolvedPath::new("OEBPS/Text/legal.xhtml");

        assert!(!links_to(&ncx, &target, &HrefResolver::new()));
        assert!(links_to(&ncx, &target, &HrefResolver::with_entries(&entries)));
    }

    #[test]
    fn test_unreachable() {
        let ncx = vec![entry("chapter1.xhtml", "OEBPS/toc.ncx", TocSourceKind::Ncx)];
        let target = ResolvedPath::new("OEBPS/copyright.xhtml");
        assert!(check_reachability(&ncx, &ncx, &target, &HrefResolver::new()).is_empty());
    }

    #[test]
    fn test_serialized_labels() {
        let json = serde_json::to_string(&[Reachability::InNcx, Reachability::InHumanTocPage]).unwrap();
        assert_eq!(json, r#"["in ncx","in human toc page"]"#);
    }
}
