//! Build a [`Document`] from XHTML/XML text using quick-xml events.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::arena::{Attribute, Attributes, Document, NodeData, NodeId};
use crate::error::{Error, Result};

impl Document {
    /// Parse XHTML/XML markup into a document tree.
    ///
    /// Whitespace, comments, entity references and declarations are kept
    /// as written so untouched content serializes back unchanged.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut dom = Document::new();
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<NodeId> = vec![dom.document()];

        loop {
            let parent = stack.last().copied().unwrap_or_else(|| dom.document());
            let start = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => {
                    let (name, attrs) = read_element(&e)?;
                    let id = dom.create_element(name, attrs, false);
                    dom.append(parent, id);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let (name, attrs) = read_element(&e)?;
                    let id = dom.create_element(name, attrs, true);
                    dom.append(parent, id);
                }
                Event::End(e) => {
                    if stack.len() <= 1 {
                        return Err(Error::Malformed(format!(
                            "unexpected end tag </{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    stack.pop();
                }
                Event::Text(e) => {
                    let raw = String::from_utf8(e.to_vec())?;
                    dom.append_text(parent, &raw);
                }
                Event::GeneralRef(e) => {
                    let name = String::from_utf8(e.to_vec())?;
                    dom.append_text(parent, &format!("&{name};"));
                }
                Event::CData(e) => {
                    let text = String::from_utf8(e.to_vec())?;
                    append_node(&mut dom, parent, NodeData::CData(text));
                }
                Event::Comment(e) => {
                    let text = String::from_utf8(e.to_vec())?;
                    append_node(&mut dom, parent, NodeData::Comment(text));
                }
                Event::PI(e) => {
                    let text = String::from_utf8(e.to_vec())?;
                    append_node(&mut dom, parent, NodeData::ProcessingInstruction(text));
                }
                Event::Decl(e) => {
                    let text = String::from_utf8(e.to_vec())?;
                    append_node(&mut dom, parent, NodeData::Declaration(text));
                }
                Event::DocType(e) => {
                    let end = reader.buffer_position() as usize;
                    let text = match text.get(start..end).and_then(doctype_as_written) {
                        Some(raw) => raw.to_string(),
                        None => format!("DOCTYPE {}", String::from_utf8(e.to_vec())?.trim_start()),
                    };
                    append_node(&mut dom, parent, NodeData::Doctype(text));
                }
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|&id| dom.element_name(id))
                .unwrap_or_default();
            return Err(Error::Malformed(format!("unclosed element <{open}>")));
        }

        Ok(dom)
    }
}

fn append_node(dom: &mut Document, parent: NodeId, data: NodeData) {
    let id = dom.create(data);
    dom.append(parent, id);
}

/// The doctype declaration between `<!` and `>`, keyword case and spacing
/// included.
fn doctype_as_written(source: &str) -> Option<&str> {
    let body = source.strip_suffix('>')?;
    let keyword = body
        .char_indices()
        .find(|&(i, _)| {
            body.get(i..i + 7)
                .is_some_and(|k| k.eq_ignore_ascii_case("doctype"))
        })
        .map(|(i, _)| i)?;
    Some(&body[keyword..])
}

fn read_element(e: &BytesStart<'_>) -> Result<(String, Attributes)> {
    let name = String::from_utf8(e.name().as_ref().to_vec())?;
    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let raw = String::from_utf8(attr.value.to_vec())?;
        attrs.insert(Attribute::from_raw(key, raw));
    }
    Ok((name, attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elements_and_attributes() {
        let dom = Document::parse(r#"<p class="a" id='x'>Hi <b>there</b></p>"#).unwrap();

        let p = dom.find_by_tag("p").unwrap();
        assert_eq!(dom.get_attr(p, "class"), Some("a"));
        assert_eq!(dom.get_attr(p, "id"), Some("x"));
        assert_eq!(dom.children(p).count(), 2);
        assert_eq!(dom.text_content(p), "Hi there");
    }

    #[test]
    fn test_parse_keeps_entities_raw() {
        let dom = Document::parse("<p>A&amp;B&#160;C</p>").unwrap();
        let p = dom.find_by_tag("p").unwrap();

        // Text and references coalesce into one raw text node
        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert!(matches!(
            &dom.get(children[0]).unwrap().data,
            NodeData::Text(raw) if raw == "A&amp;B&#160;C"
        ));
        assert_eq!(dom.text_content(p), "A&B\u{a0}C");
    }

    #[test]
    fn test_parse_unescapes_attribute_values() {
        let dom = Document::parse(r#"<a title="x &amp; y"/>"#).unwrap();
        let a = dom.find_by_tag("a").unwrap();
        assert_eq!(dom.get_attr(a, "title"), Some("x & y"));
    }

    #[test]
    fn test_parse_self_closing_flag() {
        let dom = Document::parse("<div><br/><span></span></div>").unwrap();

        let br = dom.find_by_tag("br").unwrap();
        let span = dom.find_by_tag("span").unwrap();
        assert!(matches!(
            dom.get(br).unwrap().data,
            NodeData::Element { self_closing: true, .. }
        ));
        assert!(matches!(
            dom.get(span).unwrap().data,
            NodeData::Element { self_closing: false, .. }
        ));
    }

    #[test]
    fn test_parse_strips_bom() {
        let dom = Document::parse("\u{feff}<p/>").unwrap();
        let first = dom.children(dom.document()).next().unwrap();
        assert_eq!(dom.element_name(first), Some("p"));
    }

    #[test]
    fn test_parse_keeps_doctype_as_written() {
        let dom = Document::parse("<!doctype  html>\n<html/>").unwrap();
        let first = dom.children(dom.document()).next().unwrap();
        assert!(matches!(
            &dom.get(first).unwrap().data,
            NodeData::Doctype(text) if text == "doctype  html"
        ));
    }

    #[test]
    fn test_doctype_as_written() {
        assert_eq!(doctype_as_written("<!DOCTYPE html>"), Some("DOCTYPE html"));
        assert_eq!(doctype_as_written("!doctype html>"), Some("doctype html"));
        assert_eq!(doctype_as_written("<!DOCTYPE html"), None);
    }

    #[test]
    fn test_parse_rejects_mismatched_end_tag() {
        assert!(Document::parse("<p><b>x</i></p>").is_err());
    }

    #[test]
    fn test_parse_rejects_unclosed_element() {
        assert!(Document::parse("<p><b>x</b>").is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_attributes() {
        assert!(Document::parse(r#"<p class="a" class="b"/>"#).is_err());
    }
}
