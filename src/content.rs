//! Selection of the documents that carry the book's actual text.

use std::collections::HashSet;
use std::io::{Read, Seek};

use crate::archive::EpubArchive;
use crate::href::ResolvedPath;
use crate::opf::Package;

/// Extensions of documents that may hold narrative content.
pub const CONTENT_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xml"];

/// File-name fragments marking front matter rather than content.
pub const BOILERPLATE_FILE_KEYWORDS: &[&str] = &["cover", "title", "copyright", "toc"];

const XHTML_EXTENSIONS: &[&str] = &["xhtml", "html", "htm"];
const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Whether a file name (case-insensitive) looks like boilerplate.
pub fn is_boilerplate_file_name(name: &str) -> bool {
    let name = name.to_lowercase();
    BOILERPLATE_FILE_KEYWORDS.iter().any(|k| name.contains(k))
}

/// Content documents of a package, in spine order.
#[derive(Debug, Clone, Default)]
pub struct ContentFileSet {
    ordered: Vec<ResolvedPath>,
    members: HashSet<ResolvedPath>,
}

impl ContentFileSet {
    pub fn contains(&self, path: &ResolvedPath) -> bool {
        self.members.contains(path)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedPath> {
        self.ordered.iter()
    }

    fn push(&mut self, path: ResolvedPath) {
        if self.members.insert(path.clone()) {
            self.ordered.push(path);
        }
    }
}

/// Spine documents with a content extension whose file name is not
/// boilerplate.
pub fn select_content_files(package: &Package) -> ContentFileSet {
    let mut files = ContentFileSet::default();
    for item in package.spine_items() {
        let path = package.resolve(&item.href);
        let is_content = path
            .extension()
            .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext.as_str()));
        if is_content && !is_boilerplate_file_name(path.file_name()) {
            files.push(path);
        }
    }
    files
}

/// Every XHTML spine document present in the archive, in reading order.
///
/// Unlike [`select_content_files`] nothing is excluded by name: these are the
/// candidates for copyright-page scoring.
pub fn spine_documents<R: Read + Seek>(
    package: &Package,
    archive: &EpubArchive<R>,
) -> Vec<ResolvedPath> {
    let mut seen = HashSet::new();
    package
        .spine_items()
        .filter_map(|item| {
            let path = package.resolve(&item.href);
            let is_xhtml = item.media_type == XHTML_MEDIA_TYPE
                || path
                    .extension()
                    .is_some_and(|ext| XHTML_EXTENSIONS.contains(&ext.as_str()));
            (is_xhtml && archive.contains(&path)).then_some(path)
        })
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
