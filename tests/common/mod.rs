//! Builders for small in-memory EPUB fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use tocscan::EpubArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A manifest item.
pub struct Item<'a> {
    pub id: &'a str,
    pub href: &'a str,
    pub media_type: &'a str,
    pub properties: Option<&'a str>,
}

pub fn xhtml<'a>(id: &'a str, href: &'a str) -> Item<'a> {
    Item {
        id,
        href,
        media_type: "application/xhtml+xml",
        properties: None,
    }
}

pub fn nav_item<'a>(id: &'a str, href: &'a str) -> Item<'a> {
    Item {
        properties: Some("nav"),
        ..xhtml(id, href)
    }
}

pub fn ncx_item<'a>(id: &'a str, href: &'a str) -> Item<'a> {
    Item {
        id,
        href,
        media_type: "application/x-dtbncx+xml",
        properties: None,
    }
}

/// An OPF package document.
pub fn package(items: &[Item<'_>], spine: &[&str], toc: Option<&str>) -> String {
    let mut opf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Fixture</dc:title></metadata>
  <manifest>
"#,
    );
    for item in items {
        let properties = item
            .properties
            .map(|p| format!(r#" properties="{p}""#))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
            item.id, item.href, item.media_type
        ));
    }
    opf.push_str("  </manifest>\n");
    match toc {
        Some(toc) => opf.push_str(&format!("  <spine toc=\"{toc}\">\n")),
        None => opf.push_str("  <spine>\n"),
    }
    for idref in spine {
        opf.push_str(&format!("    <itemref idref=\"{idref}\"/>\n"));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

/// An XHTML document with the given body markup.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    )
}

/// A navigation document with a `toc` nav listing `(href, label)` links.
pub fn nav(links: &[(&str, &str)]) -> String {
    let items: String = links
        .iter()
        .map(|(href, label)| format!("    <li><a href=\"{href}\">{label}</a></li>\n"))
        .collect();
    page(
        "Contents",
        &format!("<nav epub:type=\"toc\" id=\"toc\">\n  <ol>\n{items}  </ol>\n</nav>"),
    )
}

/// An NCX with one flat navPoint per `(src, label)`.
pub fn ncx(points: &[(&str, &str)]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head/>
  <docTitle><text>Fixture</text></docTitle>
  <navMap>
"#,
    );
    for (i, (src, label)) in points.iter().enumerate() {
        out.push_str(&format!(
            "    <navPoint id=\"np{i}\" playOrder=\"{}\"><navLabel><text>{label}</text></navLabel><content src=\"{src}\"/></navPoint>\n",
            i + 1
        ));
    }
    out.push_str("  </navMap>\n</ncx>\n");
    out
}

/// Collects archive members and writes them as a ZIP.
#[derive(Default)]
pub struct EpubBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// A container with `mimetype` and a container document pointing at
    /// `OEBPS/content.opf`.
    pub fn new() -> Self {
        Self::bare()
            .file("mimetype", "application/epub+zip")
            .file("META-INF/container.xml", CONTAINER)
    }

    /// No members at all.
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.files.push((name.to_string(), contents.as_ref().to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in &self.files {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn archive(&self) -> EpubArchive<Cursor<Vec<u8>>> {
        EpubArchive::from_reader(Cursor::new(self.build())).unwrap()
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

/// Three chapters, a cover and a navigation document, no NCX.
pub fn three_chapter_book(nav_links: &[(&str, &str)]) -> EpubBuilder {
    let items = [
        xhtml("cover", "Text/cover.xhtml"),
        xhtml("c1", "Text/chapter1.xhtml"),
        xhtml("c2", "Text/chapter2.xhtml"),
        xhtml("c3", "Text/chapter3.xhtml"),
        nav_item("nav", "nav.xhtml"),
    ];
    EpubBuilder::new()
        .file(
            "OEBPS/content.opf",
            package(&items, &["cover", "c1", "c2", "c3"], None),
        )
        .file("OEBPS/Text/cover.xhtml", page("Cover", "<img src=\"cover.jpg\"/>"))
        .file("OEBPS/Text/chapter1.xhtml", page("One", "<h1>One</h1><p>It begins.</p>"))
        .file("OEBPS/Text/chapter2.xhtml", page("Two", "<h1>Two</h1><p>It continues.</p>"))
        .file("OEBPS/Text/chapter3.xhtml", page("Three", "<h1>Three</h1><p>It ends.</p>"))
        .file("OEBPS/nav.xhtml", nav(nav_links))
}
