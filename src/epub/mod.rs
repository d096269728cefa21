//! EPUB content rewriting.
//!
//! Content documents are found through `META-INF/container.xml` and the
//! OPF manifest; only `application/xhtml+xml` items are merged. Every other
//! entry is copied through unchanged.

mod parser;
mod rewrite;

pub use parser::{ManifestItem, XHTML_MEDIA_TYPE, parse_container_xml, parse_manifest};
pub use rewrite::{Selection, rewrite_epub, rewrite_epub_file, scan_epub, scan_epub_file};
