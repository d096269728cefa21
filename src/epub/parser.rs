//! EPUB parsing utilities (container.xml, OPF manifest)

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::dom::Attribute;
use crate::error::{Error, Result};

/// Media type of EPUB content documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// A manifest entry from the OPF package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

impl ManifestItem {
    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

/// Parse the manifest of an OPF package document, in document order.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestItem>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_manifest = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"manifest" => in_manifest = true,
            Event::End(e) if local_name(e.name().as_ref()) == b"manifest" => in_manifest = false,
            Event::Empty(e) | Event::Start(e)
                if in_manifest && local_name(e.name().as_ref()) == b"item" =>
            {
                let mut id = String::new();
                let mut href = String::new();
                let mut media_type = String::new();

                for attr in e.attributes().flatten() {
                    let raw = String::from_utf8_lossy(&attr.value);
                    let value = Attribute::from_raw("", raw).value;
                    match attr.key.as_ref() {
                        b"id" => id = value,
                        b"href" => href = value,
                        b"media-type" => media_type = value,
                        _ => {}
                    }
                }

                if !href.is_empty() {
                    items.push(ManifestItem {
                        id,
                        href,
                        media_type,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "opf:item" -> "item").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}
