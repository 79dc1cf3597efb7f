//! Read-only access to the ZIP container of an EPUB.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::href::{ResolvedPath, percent_decode};
use crate::xml::{Lookup, XmlDocument};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// An opened EPUB container.
///
/// Member names are indexed once on open, both verbatim (for the exact-match
/// href short-circuit) and canonicalized (for lookups by [`ResolvedPath`]).
pub struct EpubArchive<R> {
    zip: ZipArchive<R>,
    names: Vec<String>,
    entries: HashSet<String>,
    canonical: HashMap<ResolvedPath, String>,
}

impl EpubArchive<File> {
    /// Open an EPUB file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    /// Open an EPUB from any [`Read`] + [`Seek`] source.
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;

        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let file = zip.by_index(i)?;
            names.push(file.name().to_string());
        }
        let entries: HashSet<String> = names.iter().cloned().collect();
        let mut canonical = HashMap::with_capacity(names.len());
        for name in &names {
            canonical
                .entry(ResolvedPath::new(name))
                .or_insert_with(|| name.clone());
        }

        Ok(Self {
            zip,
            names,
            entries,
            canonical,
        })
    }

    /// Member names in central-directory order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Member names as a set, for [`HrefResolver::with_entries`](crate::href::HrefResolver::with_entries).
    pub fn entries(&self) -> &HashSet<String> {
        &self.entries
    }

    /// Whether a resolved path names a member of the archive.
    pub fn contains(&self, path: &ResolvedPath) -> bool {
        !path.is_root() && self.canonical.contains_key(path)
    }

    /// Read a member identified by a resolved path.
    pub fn read(&mut self, path: &ResolvedPath) -> Result<Vec<u8>> {
        let name = self
            .canonical
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.as_str().to_string());
        self.read_bytes(&name)
    }

    /// Read a member and decode it to text.
    pub fn read_text(&mut self, path: &ResolvedPath) -> Result<String> {
        let bytes = self.read(path)?;
        Ok(decode_text(&bytes).into_owned())
    }

    /// Read a member by raw name.
    ///
    /// Falls back to the percent-decoded name, which some malformed EPUBs
    /// require.
    pub fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.zip.by_name(name) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                return Ok(contents);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let decoded = percent_decode(name);
        if decoded == name {
            return Err(Error::InvalidEpub(format!("File not found in ZIP: {name}")));
        }
        let mut file = self.zip.by_name(&decoded)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Locate the package document.
    ///
    /// Uses the first `rootfile/@full-path` of `META-INF/container.xml`. If the
    /// container is absent or points at a missing member, the first `.opf`
    /// member of the archive is used instead.
    pub fn find_package_path(&mut self) -> Option<String> {
        if let Ok(bytes) = self.read_bytes(CONTAINER_PATH)
            && let Some(full_path) = parse_container(&decode_text(&bytes))
        {
            let resolved = ResolvedPath::new(&full_path);
            if let Some(name) = self.canonical.get(&resolved) {
                return Some(name.clone());
            }
            debug!(%full_path, "container rootfile not present in archive");
        }

        self.names
            .iter()
            .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
            .cloned()
    }
}

/// Extract the first `rootfile/@full-path` from a container document.
fn parse_container(content: &str) -> Option<String> {
    let doc = XmlDocument::parse(content);
    let root = doc.root()?;
    root.descendants(&[Lookup::Local("rootfile")])
        .into_iter()
        .find_map(|rootfile| rootfile.attr("full-path"))
        .map(str::to_string)
}

/// Decode bytes to a string.
///
/// Tries UTF-8 first (BOM aware), then the encoding named in the XML
/// declaration, then Windows-1252 which covers most legacy ebooks.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(label) = xml_declared_encoding(bytes)
        && let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Read `encoding="..."` from an XML declaration in the first 100 bytes.
fn xml_declared_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];
    let start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let decl = &prefix[start..];

    let enc = decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let rest = &decl[enc + 9..];

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&rest[1..end]).ok()
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build(files: &[(&str, &[u8])]) -> EpubArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        let cursor = zip.finish().unwrap();
        EpubArchive::from_reader(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_container_rootfile() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        let mut archive = build(&[
            ("META-INF/container.xml", container),
            ("OEBPS/content.opf", b"<package/>"),
        ]);
        assert_eq!(archive.find_package_path().as_deref(), Some("OEBPS/content.opf"));
    }

    #[test]
    fn test_opf_scan_fallback() {
        let mut archive = build(&[
            ("mimetype", b"application/epub+zip"),
            ("book/Package.OPF", b"<package/>"),
        ]);
        assert_eq!(archive.find_package_path().as_deref(), Some("book/Package.OPF"));
    }

    #[test]
    fn test_container_pointing_nowhere_falls_back() {
        let container = br#"<container><rootfiles><rootfile full-path="missing.opf"/></rootfiles></container>"#;
        let mut archive = build(&[
            ("META-INF/container.xml", container),
            ("OPS/real.opf", b"<package/>"),
        ]);
        assert_eq!(archive.find_package_path().as_deref(), Some("OPS/real.opf"));
    }

    #[test]
    fn test_no_package_document() {
        let mut archive = build(&[("mimetype", b"application/epub+zip")]);
        assert_eq!(archive.find_package_path(), None);
    }

    #[test]
    fn test_read_by_canonical_and_encoded_names() {
        let mut archive = build(&[("OEBPS/ch 1.xhtml", b"<html/>")]);
        assert!(archive.contains(&ResolvedPath::from("OEBPS/./ch 1.xhtml")));
        assert_eq!(archive.read(&ResolvedPath::from("OEBPS/ch 1.xhtml")).unwrap(), b"<html/>");
        assert_eq!(archive.read_bytes("OEBPS/ch%201.xhtml").unwrap(), b"<html/>");
        assert!(archive.read_bytes("OEBPS/missing.xhtml").is_err());
    }

    #[test]
    fn test_decode_text_fallbacks() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
        // 0xE9 is é in Windows-1252 and invalid as UTF-8.
        assert_eq!(decode_text(b"caf\xe9"), "café");

        let latin = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xe9</a>";
        assert!(decode_text(latin).contains('é'));
    }

    #[test]
    fn test_xml_declared_encoding() {
        assert_eq!(
            xml_declared_encoding(b"<?xml version=\"1.0\" encoding='utf-16'?>"),
            Some("utf-16")
        );
        assert_eq!(xml_declared_encoding(b"<html>"), None);
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(EpubArchive::from_reader(Cursor::new(Vec::new())).is_err());
    }
}
