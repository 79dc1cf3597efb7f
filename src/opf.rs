//! Package document (OPF) loading.

use std::collections::HashMap;
use std::io::{Read, Seek};

use serde::Serialize;
use tracing::{debug, warn};

use crate::archive::{EpubArchive, decode_text};
use crate::error::Result;
use crate::href::{ResolvedPath, resolve};
use crate::xml::{Lookup, XmlDocument, XmlElement};

/// Namespace assumed when the package root declares none containing `opf`.
pub const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";

/// Media type of the legacy navigation map.
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// A `<manifest><item>` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestItem {
    pub id: String,
    /// Relative to the package document.
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// Manifest items keyed by id, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// Insert an item. A repeated id replaces the earlier item in place.
    pub fn insert(&mut self, item: ManifestItem) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Reading order plus the legacy TOC reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spine {
    pub idrefs: Vec<String>,
    /// The spine's `toc` attribute: manifest id of the NCX.
    pub toc: Option<String>,
}

/// A loaded package document.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Archive path of the package document itself.
    pub path: String,
    /// Directory of the package document; manifest hrefs are relative to it.
    pub dir: String,
    pub manifest: Manifest,
    pub spine: Spine,
}

impl Package {
    /// Locate and parse the package document.
    ///
    /// Returns `Ok(None)` when the archive has no package document at all.
    pub fn load<R: Read + Seek>(archive: &mut EpubArchive<R>) -> Result<Option<Package>> {
        let Some(path) = archive.find_package_path() else {
            return Ok(None);
        };
        let bytes = archive.read_bytes(&path)?;
        let package = Package::parse(&path, &decode_text(&bytes));
        debug!(
            %path,
            manifest = package.manifest.len(),
            spine = package.spine.idrefs.len(),
            "loaded package document"
        );
        Ok(Some(package))
    }

    /// Parse package document text found at `path`.
    ///
    /// Malformed markup is recovered from; whatever was parsed is kept.
    pub fn parse(path: &str, content: &str) -> Package {
        let dir = ResolvedPath::new(path).parent().to_string();
        let mut package = Package {
            path: path.to_string(),
            dir,
            ..Default::default()
        };

        let doc = XmlDocument::parse(content);
        if let Some(fault) = doc.fault() {
            warn!(%path, "package document recovered from: {fault}");
        }
        let Some(root) = doc.root() else {
            return package;
        };

        let opf_ns = package_namespace(root);
        let lookups = |local: &'static str| {
            [
                Lookup::Qualified {
                    namespace: opf_ns,
                    local,
                },
                Lookup::Local(local),
            ]
        };

        if let Some(manifest) = root.child(&lookups("manifest")) {
            for item in manifest.children(&lookups("item")) {
                let (Some(id), Some(href)) = (item.attr("id"), item.attr("href")) else {
                    continue;
                };
                if id.is_empty() || href.is_empty() {
                    continue;
                }
                package.manifest.insert(ManifestItem {
                    id: id.to_string(),
                    href: href.to_string(),
                    media_type: item.attr("media-type").unwrap_or_default().to_string(),
                    properties: item
                        .attr("properties")
                        .unwrap_or_default()
                        .split_ascii_whitespace()
                        .map(str::to_string)
                        .collect(),
                });
            }
        }

        if let Some(spine) = root.child(&lookups("spine")) {
            package.spine.toc = spine.attr("toc").map(str::to_string);
            package.spine.idrefs = spine
                .children(&lookups("itemref"))
                .into_iter()
                .filter_map(|itemref| itemref.attr("idref"))
                .filter(|idref| !idref.is_empty())
                .map(str::to_string)
                .collect();
        }

        package
    }

    /// Resolve a manifest href to its archive path.
    pub fn resolve(&self, href: &str) -> ResolvedPath {
        resolve(&self.path, href)
    }

    /// Manifest items in spine order. Dangling idrefs are skipped.
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine
            .idrefs
            .iter()
            .filter_map(|idref| self.manifest.get(idref))
    }

    /// The spine's legacy TOC id, if it names a manifest item.
    pub fn declared_ncx(&self) -> Option<&ManifestItem> {
        self.spine
            .toc
            .as_deref()
            .and_then(|id| self.manifest.get(id))
    }
}

/// First namespace declared on the root whose URI contains `opf`.
fn package_namespace(root: &XmlElement) -> &str {
    root.declared_namespaces()
        .iter()
        .map(|(_, uri)| uri.as_str())
        .find(|uri| uri.contains("opf"))
        .unwrap_or(OPF_NAMESPACE)
}
