//! Batch analysis over a directory tree and report rendering.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::analyze::{CopyrightReport, SingleChapterReport};
use crate::error::{Error, Result};

/// Widest file name shown in copyright report lines.
pub const COPYRIGHT_NAME_WIDTH: usize = 30;

pub const NO_EPUBS_FOUND: &str = "No EPUB files found";
pub const NO_COPYRIGHT_HITS: &str = "No copyright pages found in any TOC";
pub const NO_SINGLE_CHAPTER_ISSUES: &str = "No single-chapter issues detected";
pub const SINGLE_CHAPTER_HEADER: &str = "Detecting EPUBs with single-chapter issues...";

/// The report for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport<T> {
    pub path: PathBuf,
    #[serde(flatten)]
    pub report: T,
}

impl<T> FileReport<T> {
    /// File name without its `.epub` extension.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}

/// All `.epub` files under `root` (case-insensitive), sorted by path.
///
/// Unreadable directory entries are skipped.
pub fn discover_epubs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::FolderNotFound(root.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
        })
        .collect();
    paths.sort();
    info!(root = %root.display(), count = paths.len(), "discovered EPUB files");
    Ok(paths)
}

/// Run `check` on every path, `jobs` at a time.
///
/// Reports come back in the order of `paths` regardless of `jobs`.
pub fn run<T, F>(paths: &[PathBuf], jobs: usize, check: F) -> Vec<FileReport<T>>
where
    T: Send,
    F: Fn(&Path) -> T + Sync,
{
    let analyze = |path: &PathBuf| FileReport {
        path: path.clone(),
        report: check(path),
    };

    if jobs <= 1 {
        return paths.iter().map(analyze).collect();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(|| paths.par_iter().map(analyze).collect()),
        Err(e) => {
            warn!(error = %e, "thread pool unavailable, analyzing sequentially");
            paths.iter().map(analyze).collect()
        }
    }
}

/// File name of `path` with the `.epub` extension removed.
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.len().checked_sub(5) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".epub") => {
            name[..cut].to_string()
        }
        _ => name.into_owned(),
    }
}

fn truncate(name: &str, width: usize) -> &str {
    match name.char_indices().nth(width) {
        Some((end, _)) => &name[..end],
        None => name,
    }
}

/// Text lines of a copyright batch.
///
/// Warnings come first for each file, then the hit line if the copyright
/// page is linked from any TOC.
pub fn render_copyright(reports: &[FileReport<CopyrightReport>]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut found = 0;
    for file in reports {
        let name = file.name();
        let name = truncate(&name, COPYRIGHT_NAME_WIDTH);
        for warning in &file.report.warnings {
            lines.push(format!("{name}: {warning}"));
        }
        if !file.report.hits.is_empty() {
            found += 1;
            let hits: Vec<&str> = file.report.hits.iter().map(|h| h.label()).collect();
            lines.push(format!("{name}: {}", hits.join(", ")));
        }
    }
    if found == 0 {
        lines.push(NO_COPYRIGHT_HITS.to_string());
    }
    lines
}

/// Text lines of a single-chapter batch, with per-file statistics when
/// `debug` is set.
pub fn render_single_chapter(
    reports: &[FileReport<SingleChapterReport>],
    debug: bool,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut flagged = 0;
    for file in reports {
        if debug && let Some(stats) = &file.report.stats {
            let file_name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            lines.push(String::new());
            lines.push(format!("DEBUG {file_name}:"));
            lines.push(format!("  NAV entries: {}", stats.nav_entries));
            lines.push(format!("  NCX entries: {}", stats.ncx_entries));
            lines.push(format!("  Content files: {}", stats.content_files));
            if !stats.sample.is_empty() {
                lines.push(format!(
                    "  TOC entries sample: {}",
                    serde_json::to_string(&stats.sample)?
                ));
            }
            lines.push(format!(
                "  TOC analysis: {}",
                serde_json::to_string(&stats.analysis)?
            ));
        }
        if file.report.is_flagged() {
            flagged += 1;
            let codes: Vec<&str> = file.report.issues.iter().map(|i| i.code()).collect();
            lines.push(format!("{}: {}", file.name(), codes.join(", ")));
        }
    }
    if flagged == 0 {
        lines.push(NO_SINGLE_CHAPTER_ISSUES.to_string());
    }
    Ok(lines)
}

/// One JSON object per file.
pub fn render_json<T: Serialize>(reports: &[FileReport<T>]) -> Result<Vec<String>> {
    reports
        .iter()
        .map(|r| serde_json::to_string(r).map_err(Error::from))
        .collect()
}
