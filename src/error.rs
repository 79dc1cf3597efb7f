//! Error types for tocscan operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening or inspecting an EPUB.
///
/// Only archive-level faults surface as errors. Malformed markup is
/// recovered from, and missing navigation documents are reported as
/// [`Unavailable`](crate::toc::Unavailable) values instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
