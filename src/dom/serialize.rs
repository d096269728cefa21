//! Write a [`Document`] back to markup text.

use super::arena::{Document, NodeData, NodeId};

impl Document {
    /// Serialize the reachable tree to markup.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.document()) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize a single node and its subtree.
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {
                for child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeData::Element {
                name,
                attrs,
                self_closing,
            } => {
                out.push('<');
                out.push_str(name);
                for attr in attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    // Raw values may come from single-quoted source attributes
                    out.push_str(&attr.raw.replace('"', "&quot;"));
                    out.push('"');
                }

                if *self_closing && node.first_child.is_none() {
                    out.push_str("/>");
                    return;
                }

                out.push('>');
                for child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text(raw) => out.push_str(raw),
            NodeData::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::ProcessingInstruction(text) | NodeData::Declaration(text) => {
                out.push_str("<?");
                out.push_str(text);
                out.push_str("?>");
            }
            NodeData::Doctype(text) => {
                out.push_str("<!");
                out.push_str(text);
                out.push('>');
            }
        }
    }
}
