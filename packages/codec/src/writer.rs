use crate::error::CodecResult;
use crate::escape::escape;
use crate::id_table::IdCompactor;
use crate::{ORIGIN_TAG, PRESETS_TAG, ROOT_TAG, SETTINGS_TAG};
use knecht_common::{Column, NodeData};
use tracing::debug;

const DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>";

/// Serializes node trees into the exchange format
#[derive(Debug)]
pub struct Writer {
    ids: IdCompactor,
    output: String,
    indent: &'static str,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            ids: IdCompactor::new(),
            output: String::new(),
            indent: "  ",
        }
    }

    /// Write without indentation or line breaks
    pub fn compact(mut self) -> Self {
        self.indent = "";
        self
    }

    pub fn write_document(mut self, roots: &[NodeData]) -> CodecResult<String> {
        self.output.push_str(DECLARATION);
        self.newline();
        self.open_tag(ROOT_TAG);

        self.newline();
        self.pad(1);
        self.empty_tag(ORIGIN_TAG);
        self.newline();
        self.pad(1);
        self.empty_tag(SETTINGS_TAG);
        self.newline();
        self.pad(1);

        if roots.is_empty() {
            self.empty_tag(PRESETS_TAG);
        } else {
            self.open_tag(PRESETS_TAG);
            for node in roots {
                self.newline();
                self.write_node(node, 2);
            }
            self.newline();
            self.pad(1);
            self.close_tag(PRESETS_TAG);
        }

        self.newline();
        self.close_tag(ROOT_TAG);
        self.newline();

        debug!(ids = self.ids.len(), roots = roots.len(), "encoded document");
        Ok(self.output)
    }

    fn write_node(&mut self, node: &NodeData, depth: usize) {
        let tag = node.kind().tag();
        self.pad(depth);
        self.output.push('<');
        self.output.push_str(tag);

        for column in Column::ALL {
            let value = match column {
                Column::Reference => node.cells.reference.map(|id| self.ids.compact(id).to_string()),
                Column::Id => node.cells.id.map(|id| self.ids.compact(id).to_string()),
                _ => Some(node.cells.display(column)),
            };
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                self.output.push(' ');
                self.output.push_str(column.key());
                self.output.push_str("=\"");
                self.output.push_str(&escape(&value));
                self.output.push('"');
            }
        }

        if node.children.is_empty() {
            self.output.push_str("/>");
            return;
        }

        self.output.push('>');
        for child in &node.children {
            self.newline();
            self.write_node(child, depth + 1);
        }
        self.newline();
        self.pad(depth);
        self.close_tag(tag);
    }

    fn open_tag(&mut self, tag: &str) {
        self.output.push('<');
        self.output.push_str(tag);
        self.output.push('>');
    }

    fn empty_tag(&mut self, tag: &str) {
        self.output.push('<');
        self.output.push_str(tag);
        self.output.push_str("/>");
    }

    fn close_tag(&mut self, tag: &str) {
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push('>');
    }

    fn newline(&mut self) {
        if !self.indent.is_empty() {
            self.output.push('\n');
        }
    }

    fn pad(&mut self, depth: usize) {
        for _ in 0..depth {
            self.output.push_str(self.indent);
        }
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode top-level nodes into an exchange document
pub fn encode(roots: &[NodeData]) -> CodecResult<String> {
    Writer::new().write_document(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knecht_common::{Cells, ItemId};

    #[test]
    fn test_empty_document() {
        let text = encode(&[]).unwrap();
        assert!(text.starts_with(DECLARATION));
        assert!(text.contains("<renderknecht_varianten>"));
        assert!(text.contains("<variant_presets/>"));
    }

    #[test]
    fn test_attributes_skip_empty_cells() {
        let node = NodeData::new(Cells::variant(3, "Color", "red"));
        let text = Writer::new().compact().write_document(&[node]).unwrap();
        assert!(text.contains(r#"<variant order="003" name="Color" value="red"/>"#));
    }

    #[test]
    fn test_compact_nested_document() {
        let node = NodeData::new(Cells::preset("P", "preset"))
            .with_children(vec![Cells::variant(0, "v", "1").into()]);
        let text = Writer::new().compact().write_document(&[node]).unwrap();
        let expected = concat!(
            "<renderknecht_varianten><origin/><renderknecht_settings/><variant_presets>",
            r#"<preset order="000" name="P" type="preset" id="1">"#,
            r#"<variant order="000" name="v" value="1"/>"#,
            "</preset></variant_presets></renderknecht_varianten>",
        );
        assert_eq!(text, format!("{DECLARATION}{expected}"));
    }

    #[test]
    fn test_ids_are_compacted() {
        let preset = Cells::preset("P1", "trim_setup");
        let id = preset.id.unwrap();
        let roots = vec![
            NodeData::new(preset),
            NodeData::new(Cells::preset("P2", "preset").with_order(1))
                .with_children(vec![Cells::reference("R", id).into()]),
        ];
        let text = Writer::new().compact().write_document(&roots).unwrap();
        assert!(text.contains(r#"<preset order="000" name="P1" type="trim_setup" id="1"/>"#));
        assert!(text.contains(r#"<reference order="000" name="R" reference="1"/>"#));
        assert!(text.contains(r#"id="2""#));
        assert!(!text.contains(&id.to_string()));
    }

    #[test]
    fn test_values_are_escaped() {
        let node = NodeData::new(Cells::variant(0, "A&B", "<x>"));
        let text = encode(&[node]).unwrap();
        assert!(text.contains(r#"name="A&amp;B" value="&lt;x&gt;""#));
    }

    #[test]
    fn test_unknown_reference_still_compacts() {
        let node = NodeData::new(Cells::reference("Dangling", ItemId::new()));
        let text = encode(&[node]).unwrap();
        assert!(text.contains(r#"reference="1""#));
    }
}
