//! Text decoding and path helpers.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::Encoding;
use percent_encoding::percent_decode_str;

/// Decode document bytes to a string.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the encoding named in the XML declaration
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Returns the encoding that was used, so the output can be written back
/// in the same encoding its declaration names.
pub fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return (result, encoding_rs::UTF_8);
    }

    if let Some(name) = extract_xml_encoding(bytes)
        && let Some(encoding) = Encoding::for_label(name.as_bytes())
    {
        let (result, used, _) = encoding.decode(bytes);
        return (result, used);
    }

    let (result, used, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (result, used)
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` in the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// File extensions treated as markup documents when expanding directories.
const MARKUP_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xml"];

/// Check if a path names a markup document by extension.
pub fn is_markup_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(ext))
        })
}

/// Check if a path names an EPUB archive by extension.
pub fn is_epub_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
}

/// Resolve a manifest href against the OPF directory into an archive path.
///
/// Percent-escapes are decoded and `.`/`..` segments collapsed.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let decoded = percent_decode_str(href).decode_utf8_lossy();

    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    parts.join("/")
}
