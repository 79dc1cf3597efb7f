//! Href resolution across package, NCX and navigation documents.
//!
//! Every href found in an EPUB is relative to the document that contains it.
//! To compare an NCX `content/@src`, a navigation-document anchor and a
//! manifest `href` with each other they are all reduced to a [`ResolvedPath`]:
//! percent-decoded, relative to the archive root, with `.` and `..` collapsed.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use percent_encoding::percent_decode_str;
use serde::Serialize;

/// A canonical, slash-separated path relative to the archive root.
///
/// Equality and hashing are segment-wise, so `a//b.xhtml` and `a/b.xhtml`
/// compare equal. The empty path is the archive root and doubles as the
/// "unresolvable" sentinel.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    /// Canonicalize an archive member name.
    pub fn new(path: &str) -> Self {
        Self(collapse(path.split('/')))
    }

    /// The archive root (also used when an href cannot be resolved).
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.segments().next().is_none()
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last path segment, or `""` for the root.
    pub fn file_name(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Directory portion (`OEBPS/text/ch1.xhtml` -> `OEBPS/text`).
    pub fn parent(&self) -> &str {
        parent_dir(&self.0)
    }

    /// Lower-cased file extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let dot = name.rfind('.')?;
        (dot > 0).then(|| name[dot + 1..].to_ascii_lowercase())
    }
}

impl PartialEq for ResolvedPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments().eq(other.segments())
    }
}

impl Eq for ResolvedPath {}

impl Hash for ResolvedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResolvedPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Return the part of `href` before the first `#`.
pub fn strip_fragment(href: &str) -> &str {
    match href.find('#') {
        Some(pos) => &href[..pos],
        None => href,
    }
}

/// Percent-decode an href, replacing invalid UTF-8 sequences.
pub fn percent_decode(href: &str) -> Cow<'_, str> {
    percent_decode_str(href).decode_utf8_lossy()
}

/// Resolve `href` relative to the directory of `base`.
///
/// Never fails: malformed input degrades to a best-effort canonical path.
///
/// ```
/// use tocscan::href::resolve;
///
/// assert_eq!(resolve("a/b/c.xhtml", "../d.xhtml").as_str(), "a/d.xhtml");
/// assert_eq!(resolve("a.xhtml", "../../b.xhtml").as_str(), "b.xhtml");
/// assert_eq!(resolve("OEBPS/nav.xhtml", "ch%201.xhtml").as_str(), "OEBPS/ch 1.xhtml");
/// ```
pub fn resolve(base: &str, href: &str) -> ResolvedPath {
    HrefResolver::new().resolve(base, href)
}

/// Href resolver, optionally aware of the archive's member names.
///
/// When member names are supplied, a decoded href that is already the exact
/// name of an archive entry resolves to itself. Some packages store
/// root-relative member names in their hrefs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HrefResolver<'a> {
    entries: Option<&'a HashSet<String>>,
}

impl<'a> HrefResolver<'a> {
    pub fn new() -> Self {
        Self { entries: None }
    }

    pub fn with_entries(entries: &'a HashSet<String>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    pub fn resolve(&self, base: &str, href: &str) -> ResolvedPath {
        let decoded = percent_decode(href);

        if let Some(entries) = self.entries
            && entries.contains(decoded.as_ref())
        {
            return ResolvedPath(decoded.into_owned());
        }

        // Leading slash anchors at the archive root.
        if base.is_empty() || decoded.starts_with('/') {
            return ResolvedPath(collapse(decoded.split('/')));
        }

        let dir = parent_dir(base);
        ResolvedPath(collapse(dir.split('/').chain(decoded.split('/'))))
    }

    /// Resolve an href with its fragment removed.
    pub fn resolve_target(&self, base: &str, href: &str) -> ResolvedPath {
        self.resolve(base, strip_fragment(href))
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Collapse `.` and `..` segments. Popping past the root is a no-op.
fn collapse<'s>(segments: impl Iterator<Item = &'s str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}
