//! # tocscan
//!
//! Structural diagnostics for EPUB tables of contents.
//!
//! Two checks are provided:
//!
//! - **Copyright reachability**: find the copyright page by scoring every
//!   spine document, then report whether the NCX or a hand-written contents
//!   page links to it.
//! - **Single-chapter detection**: flag books whose table of contents is
//!   missing, contains only front matter, or collapses to a single content
//!   document (the usual symptom of a book packaged as one huge file).
//!
//! EPUBs are never modified. Malformed markup is recovered from rather than
//! rejected, and any archive fault is contained to the file it came from.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tocscan::{CopyrightLocator, KeywordScorer, check_copyright, check_single_chapter};
//!
//! let report = check_single_chapter(Path::new("book.epub"));
//! for issue in &report.issues {
//!     println!("{issue}");
//! }
//!
//! let report = check_copyright(Path::new("book.epub"), &KeywordScorer, &CopyrightLocator::default());
//! for hit in &report.hits {
//!     println!("{hit}");
//! }
//! ```
//!
//! ## Comparing hrefs
//!
//! Hrefs in OPF, NCX and navigation documents are relative to different
//! files. [`href::resolve`] maps each of them to a [`ResolvedPath`] relative
//! to the archive root:
//!
//! ```
//! use tocscan::href::resolve;
//!
//! let from_ncx = resolve("OEBPS/toc.ncx", "Text/ch%201.xhtml");
//! let from_nav = resolve("OEBPS/Text/nav.xhtml", "ch 1.xhtml");
//! assert_eq!(from_ncx, from_nav);
//! ```

pub mod analyze;
pub mod archive;
pub mod batch;
pub mod classify;
pub mod config;
pub mod content;
pub mod copyright;
pub mod dom;
pub mod error;
pub mod href;
pub mod opf;
pub mod toc;
pub mod xml;

pub use analyze::{
    CopyrightReport, SingleChapterReport, TocStats, check_copyright, check_single_chapter,
};
pub use archive::EpubArchive;
pub use classify::{Issue, TocAnalysis};
pub use copyright::{CopyrightLocator, CopyrightScorer, KeywordScorer, Reachability};
pub use error::{Error, Result};
pub use href::{HrefResolver, ResolvedPath};
pub use opf::Package;
pub use toc::{Extraction, TocEntry, TocSourceKind, Unavailable};
