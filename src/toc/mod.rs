//! Table-of-contents extraction.
//!
//! Three sources produce the same [`TocEntry`] shape:
//!
//! - [`nav`]: the EPUB 3 navigation document (preferred)
//! - [`ncx`]: the EPUB 2 navigation map (fallback)
//! - [`human`]: hand-written "Contents" pages in the spine
//!
//! Missing or broken sources are not errors. Extraction reports them as
//! [`Extraction::Unavailable`] and callers carry on with what they have.

pub mod human;
pub mod nav;
pub mod ncx;

use std::fmt;
use std::io::{Read, Seek};

use serde::Serialize;

use crate::archive::EpubArchive;
use crate::href::{HrefResolver, ResolvedPath};
use crate::opf::Package;

/// Where a TOC entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TocSourceKind {
    Nav,
    Ncx,
    HumanPage,
}

impl TocSourceKind {
    /// Short name used in warnings.
    pub fn label(self) -> &'static str {
        match self {
            TocSourceKind::Nav => "NAV",
            TocSourceKind::Ncx => "NCX",
            TocSourceKind::HumanPage => "TOC page",
        }
    }
}

/// A single table-of-contents link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// The href as written, fragment included.
    pub href: String,
    pub text: String,
    /// Document the href is relative to.
    pub source: ResolvedPath,
    pub kind: TocSourceKind,
}

impl TocEntry {
    /// Archive path the entry points at, fragment removed.
    pub fn target(&self, resolver: &HrefResolver<'_>) -> ResolvedPath {
        resolver.resolve_target(self.source.as_str(), &self.href)
    }
}

/// Why a navigation source produced no entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The package declares no such document.
    NotDeclared(TocSourceKind),
    /// Declared, but not in the archive.
    Missing(TocSourceKind, ResolvedPath),
    /// Present, but could not be read or parsed.
    Parse(TocSourceKind, String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NotDeclared(kind) => write!(f, "NO {} FOUND", kind.label()),
            Unavailable::Missing(kind, path) => {
                write!(f, "{} file missing from zip: {path}", kind.label())
            }
            Unavailable::Parse(kind, msg) => write!(f, "{} parse error: {msg}", kind.label()),
        }
    }
}

/// Outcome of extracting one navigation source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(Vec<TocEntry>),
    Unavailable(Unavailable),
}

impl Extraction {
    /// Entries found, empty when unavailable.
    pub fn entries(&self) -> &[TocEntry] {
        match self {
            Extraction::Parsed(entries) => entries,
            Extraction::Unavailable(_) => &[],
        }
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            Extraction::Parsed(_) => None,
            Extraction::Unavailable(reason) => Some(reason),
        }
    }
}

/// Both machine-readable navigation sources of a package.
#[derive(Debug, Clone)]
pub struct TocSources {
    pub nav: Extraction,
    pub ncx: Extraction,
}

impl TocSources {
    /// Navigation-document entries, or the NCX entries when there are none.
    pub fn preferred(&self) -> &[TocEntry] {
        match self.nav.entries() {
            [] => self.ncx.entries(),
            entries => entries,
        }
    }
}

/// Extract the navigation document and the NCX.
pub fn extract_toc<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> TocSources {
    TocSources {
        nav: nav::extract(archive, package),
        ncx: ncx::extract(archive, package),
    }
}
