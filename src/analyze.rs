//! Per-file analysis drivers.
//!
//! Each driver owns one EPUB for the duration of a check. Anything that
//! goes wrong inside is folded into the report at this boundary, so a batch
//! never stops on a bad file.

use std::io::{Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::archive::EpubArchive;
use crate::classify::{Issue, TocAnalysis, analyze_toc, classify};
use crate::content::select_content_files;
use crate::copyright::{CopyrightLocator, CopyrightScorer, Reachability, check_reachability};
use crate::error::Result;
use crate::href::{HrefResolver, ResolvedPath};
use crate::opf::Package;
use crate::toc::{self, TocEntry, human, ncx};

const SAMPLE_ENTRIES: usize = 3;

/// Counts gathered on the way to a single-chapter verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TocStats {
    pub nav_entries: usize,
    pub ncx_entries: usize,
    pub content_files: usize,
    /// The first few entries of the TOC that was analyzed.
    pub sample: Vec<TocEntry>,
    pub analysis: TocAnalysis,
}

/// Result of the single-chapter check for one EPUB.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SingleChapterReport {
    /// Empty when the TOC looks healthy.
    pub issues: Vec<Issue>,
    /// Present once the package and its content files were found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TocStats>,
}

impl SingleChapterReport {
    fn issue(issue: Issue) -> Self {
        Self {
            issues: vec![issue],
            stats: None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Result of the copyright reachability check for one EPUB.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyrightReport {
    pub warnings: Vec<String>,
    /// The trusted copyright page, if one was found.
    pub copyright_page: Option<ResolvedPath>,
    /// TOCs linking the copyright page.
    pub hits: Vec<Reachability>,
}

impl CopyrightReport {
    fn warning(message: String) -> Self {
        Self {
            warnings: vec![message],
            ..Default::default()
        }
    }
}

/// Run the single-chapter check on an opened archive.
pub fn single_chapter<R: Read + Seek>(archive: &mut EpubArchive<R>) -> Result<SingleChapterReport> {
    let Some(package) = Package::load(archive)? else {
        return Ok(SingleChapterReport::issue(Issue::NoOpf));
    };

    let content = select_content_files(&package);
    if content.is_empty() {
        return Ok(SingleChapterReport::issue(Issue::NoContentFiles));
    }

    let sources = toc::extract_toc(archive, &package);
    let entries = sources.preferred();
    let resolver = HrefResolver::with_entries(archive.entries());
    let analysis = analyze_toc(entries, &content, &resolver);
    let issues = classify(&analysis);

    let stats = TocStats {
        nav_entries: sources.nav.entries().len(),
        ncx_entries: sources.ncx.entries().len(),
        content_files: content.len(),
        sample: entries.iter().take(SAMPLE_ENTRIES).cloned().collect(),
        analysis,
    };
    debug!(
        nav = stats.nav_entries,
        ncx = stats.ncx_entries,
        content = stats.content_files,
        ?issues,
        "single-chapter check"
    );

    Ok(SingleChapterReport {
        issues,
        stats: Some(stats),
    })
}

/// Run the single-chapter check on an EPUB file.
///
/// Unreadable or corrupt files report [`Issue::ErrorParsingEpub`].
pub fn check_single_chapter(path: &Path) -> SingleChapterReport {
    let result = EpubArchive::open(path).and_then(|mut archive| single_chapter(&mut archive));
    result.unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to analyze EPUB");
        SingleChapterReport::issue(Issue::ErrorParsingEpub)
    })
}

/// Run the copyright reachability check on an opened archive.
pub fn copyright<R, S>(
    archive: &mut EpubArchive<R>,
    scorer: &S,
    locator: &CopyrightLocator,
) -> Result<CopyrightReport>
where
    R: Read + Seek,
    S: CopyrightScorer + ?Sized,
{
    let Some(package) = Package::load(archive)? else {
        return Ok(CopyrightReport::warning("OPF not found".to_string()));
    };

    let mut report = CopyrightReport::default();
    let ncx = ncx::extract(archive, &package);
    if let Some(reason) = ncx.unavailable() {
        report.warnings.push(reason.to_string());
    }

    let Some(page) = locator.locate(archive, &package, scorer) else {
        debug!("no confident copyright page");
        return Ok(report);
    };

    let human = human::extract(archive, &package);
    let resolver = HrefResolver::with_entries(archive.entries());
    report.hits = check_reachability(ncx.entries(), &human, &page, &resolver);
    debug!(%page, hits = ?report.hits, "located copyright page");
    report.copyright_page = Some(page);
    Ok(report)
}

/// Run the copyright reachability check on an EPUB file.
///
/// Failures become a single `error: <message>` warning.
pub fn check_copyright<S>(path: &Path, scorer: &S, locator: &CopyrightLocator) -> CopyrightReport
where
    S: CopyrightScorer + ?Sized,
{
    let result =
        EpubArchive::open(path).and_then(|mut archive| copyright(&mut archive, scorer, locator));
    result.unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to analyze EPUB");
        CopyrightReport::warning(format!("error: {e}"))
    })
}
