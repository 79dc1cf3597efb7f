//! EPUB 2 navigation map (NCX).

use std::io::{Read, Seek};

use tracing::{debug, warn};

use super::{Extraction, TocEntry, TocSourceKind, Unavailable};
use crate::archive::EpubArchive;
use crate::href::ResolvedPath;
use crate::opf::{ManifestItem, NCX_MEDIA_TYPE, Package};
use crate::xml::{Lookup, XmlDocument};

/// The NCX manifest item: the one named by the spine's `toc` attribute,
/// else the first item with the NCX media type.
pub fn locate(package: &Package) -> Option<&ManifestItem> {
    package.declared_ncx().or_else(|| {
        package
            .manifest
            .iter()
            .find(|item| item.media_type == NCX_MEDIA_TYPE)
    })
}

/// Extract every navPoint of the package's NCX.
pub fn extract<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> Extraction {
    let Some(item) = locate(package) else {
        return Extraction::Unavailable(Unavailable::NotDeclared(TocSourceKind::Ncx));
    };

    let path = package.resolve(&item.href);
    if !archive.contains(&path) {
        warn!(%path, "NCX declared but missing from archive");
        return Extraction::Unavailable(Unavailable::Missing(TocSourceKind::Ncx, path));
    }

    let parsed = archive
        .read_text(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| parse_entries(&text, &path));
    match parsed {
        Ok(entries) => {
            debug!(%path, entries = entries.len(), "parsed NCX");
            Extraction::Parsed(entries)
        }
        Err(msg) => {
            warn!(%path, "NCX unusable: {msg}");
            Extraction::Unavailable(Unavailable::Parse(TocSourceKind::Ncx, msg))
        }
    }
}

/// Parse NCX text found at `source`.
///
/// Each navPoint yields its first nested label text and first nested
/// `content/@src`. navPoints without a source are skipped. Fails only when
/// no root element could be recovered at all.
pub fn parse_entries(content: &str, source: &ResolvedPath) -> Result<Vec<TocEntry>, String> {
    let doc = XmlDocument::parse(content);
    let Some(root) = doc.root() else {
        return Err(doc.fault().unwrap_or("no root element").to_string());
    };

    let ns = root.default_namespace();
    let lookups = |local: &'static str| {
        let mut lookups = Vec::with_capacity(2);
        if let Some(namespace) = ns {
            lookups.push(Lookup::Qualified { namespace, local });
        }
        lookups.push(Lookup::Local(local));
        lookups
    };
    let (text_lookups, content_lookups) = (lookups("text"), lookups("content"));

    let entries = root
        .descendants(&lookups("navPoint"))
        .into_iter()
        .filter_map(|point| {
            let href = point
                .first_descendant(&content_lookups)
                .and_then(|content| content.attr("src"))
                .filter(|src| !src.is_empty())?;
            let text = point
                .first_descendant(&text_lookups)
                .and_then(|label| label.leading_text())
                .map(str::trim)
                .unwrap_or_default();
            Some(TocEntry {
                href: href.to_string(),
                text: text.to_string(),
                source: source.clone(),
                kind: TocSourceKind::Ncx,
            })
        })
        .collect();
    Ok(entries)
}
