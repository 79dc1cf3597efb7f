//! Structural classification of a table of contents.
//!
//! A TOC is healthy when its content entries reach at least two distinct
//! content documents. Entries for front matter (cover, title page,
//! copyright, the TOC itself) are discounted by label and by target name.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::content::{ContentFileSet, is_boilerplate_file_name};
use crate::href::{HrefResolver, ResolvedPath};
use crate::toc::TocEntry;

/// Labels that mark a TOC entry as boilerplate when matched exactly.
pub const BOILERPLATE_LABELS: &[&str] = &[
    "cover",
    "title",
    "title page",
    "copyright",
    "table of contents",
    "toc",
    "contents",
    "frontmatter",
    "front matter",
    "titlepage",
    "dedication",
    "epigraph",
    "about the author",
    "also by",
    "books by",
    "acknowledgments",
    "acknowledgements",
];

/// Labels that mark a TOC entry as boilerplate anywhere in the text.
pub const BOILERPLATE_LABEL_FRAGMENTS: &[&str] = &["cover", "title page", "copyright"];

/// A reason an EPUB is flagged by the single-chapter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    NoToc,
    TocHasNoContentEntries,
    SingleTocEntry,
    NoOpf,
    NoContentFiles,
    ErrorParsingEpub,
}

impl Issue {
    pub fn code(self) -> &'static str {
        match self {
            Issue::NoToc => "no_toc",
            Issue::TocHasNoContentEntries => "toc_has_no_content_entries",
            Issue::SingleTocEntry => "single_toc_entry",
            Issue::NoOpf => "no_opf",
            Issue::NoContentFiles => "no_content_files",
            Issue::ErrorParsingEpub => "error_parsing_epub",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Summary of how a TOC relates to the content documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TocAnalysis {
    pub has_toc: bool,
    /// Entries that survive boilerplate filtering and point at content.
    pub content_entries: usize,
    /// Distinct content documents reached by those entries.
    pub unique_targets: usize,
    /// The only target, when exactly one is reached.
    pub single_file_target: Option<ResolvedPath>,
}

/// Whether a TOC label names front or back matter.
pub fn is_boilerplate_label(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    BOILERPLATE_LABELS.contains(&text.as_str())
        || BOILERPLATE_LABEL_FRAGMENTS.iter().any(|k| text.contains(k))
}

/// Measure `entries` against the content documents.
pub fn analyze_toc(
    entries: &[TocEntry],
    content: &ContentFileSet,
    resolver: &HrefResolver<'_>,
) -> TocAnalysis {
    if entries.is_empty() {
        return TocAnalysis::default();
    }

    let mut content_entries = 0;
    let mut targets: Vec<ResolvedPath> = Vec::new();
    let mut seen = HashSet::new();
    for entry in entries {
        let target = entry.target(resolver);
        if is_boilerplate_label(&entry.text)
            || is_boilerplate_file_name(target.file_name())
            || !content.contains(&target)
        {
            continue;
        }
        content_entries += 1;
        if seen.insert(target.clone()) {
            targets.push(target);
        }
    }

    let single_file_target = match targets.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    };
    TocAnalysis {
        has_toc: true,
        content_entries,
        unique_targets: targets.len(),
        single_file_target,
    }
}

/// Issues implied by an analysis. Empty means the TOC looks healthy.
pub fn classify(analysis: &TocAnalysis) -> Vec<Issue> {
    if !analysis.has_toc {
        return vec![Issue::NoToc];
    }
    match (analysis.content_entries, analysis.unique_targets) {
        (0, _) => vec![Issue::TocHasNoContentEntries],
        (1, _) | (_, 1) => vec![Issue::SingleTocEntry],
        _ => Vec::new(),
    }
}
