//! # Exchange Reader
//!
//! Two passes: a recursive-descent parse of the token stream into a generic
//! element tree, then a mapping of the `variant_presets` subtree into
//! [`NodeData`].
//!
//! Unknown element tags are skipped together with their subtrees. Legacy
//! files store a variant's value as element text instead of an attribute;
//! that text is picked up when the attribute is missing.

use crate::error::{CodecError, CodecResult};
use crate::escape::unescape;
use crate::id_table::IdExpander;
use crate::lexer::{tokenize, Spanned, Token};
use crate::{PRESETS_TAG, ROOT_TAG};
use knecht_common::{Cells, Column, ItemKind, NodeData};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element<'src> {
    name: &'src str,
    attributes: Vec<(&'src str, String)>,
    text: String,
    children: Vec<Element<'src>>,
}

impl<'src> Element<'src> {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Recursive-descent reader over the token stream
pub struct Reader<'src> {
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    source_len: usize,
    ids: IdExpander,
}

impl<'src> Reader<'src> {
    pub fn new(source: &'src str) -> CodecResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
            ids: IdExpander::new(),
        })
    }

    /// Read the whole document into top-level nodes
    pub fn read_document(mut self) -> CodecResult<Vec<NodeData>> {
        let root = self.parse_element()?;
        if let Some((token, span)) = self.peek() {
            return Err(CodecError::unexpected_token(span.start, "end of document", token.describe()));
        }

        if root.name != ROOT_TAG {
            return Err(CodecError::WrongRoot {
                expected: ROOT_TAG.to_string(),
                found: root.name.to_string(),
            });
        }

        let mut nodes = Vec::new();
        for presets in root.children.iter().filter(|e| e.name == PRESETS_TAG) {
            for element in &presets.children {
                if let Some(node) = self.read_node(element) {
                    nodes.push(node);
                }
            }
        }

        if nodes.is_empty() {
            return Err(CodecError::Empty);
        }

        info!(nodes = nodes.len(), ids = self.ids.len(), "decoded document");
        Ok(nodes)
    }

    fn read_node(&mut self, element: &Element<'src>) -> Option<NodeData> {
        if !ItemKind::is_known_tag(element.name) {
            debug!(tag = element.name, "skipping unknown element");
            return None;
        }

        let mut cells = Cells::default();
        for column in Column::ALL {
            let Some(raw) = element.attribute(column.key()) else {
                continue;
            };
            match column {
                Column::Order => {
                    cells.order = raw.trim().parse().unwrap_or_else(|_| {
                        warn!(order = raw, "invalid order attribute");
                        0
                    })
                }
                Column::Name => cells.name = raw.to_string(),
                Column::Value => cells.value = raw.to_string(),
                Column::Type => cells.item_type = raw.to_string(),
                Column::Reference => cells.reference = self.ids.expand(raw),
                Column::Id => cells.id = self.ids.expand(raw),
                Column::Description => cells.description = raw.to_string(),
            }
        }

        if cells.value.is_empty() && !element.text.is_empty() {
            cells.value = element.text.clone();
        }
        match element.name {
            "sub_seperator" => cells.item_type = "sub_separator".to_string(),
            "separator" | "seperator" | "sub_separator" | "render_preset" if cells.item_type.is_empty() => {
                cells.item_type = element.name.replace("seperator", "separator")
            }
            _ => {}
        }

        let children = element
            .children
            .iter()
            .filter_map(|child| self.read_node(child))
            .collect();

        Some(NodeData { cells, children })
    }

    fn parse_element(&mut self) -> CodecResult<Element<'src>> {
        self.expect(Token::Open, "'<'")?;
        let name = self.expect_name()?;
        let mut element = Element {
            name,
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        };

        loop {
            match self.advance()? {
                (Token::Name(key), _) => {
                    self.expect(Token::Equals, "'='")?;
                    let value = match self.advance()? {
                        (Token::Quoted(value), _) => unescape(value).into_owned(),
                        (token, span) => {
                            return Err(CodecError::unexpected_token(span.start, "quoted value", token.describe()))
                        }
                    };
                    element.attributes.push((key, value));
                }
                (Token::SelfClose, _) => return Ok(element),
                (Token::Close, _) => break,
                (token, span) => {
                    return Err(CodecError::unexpected_token(span.start, "attribute or '>'", token.describe()))
                }
            }
        }

        loop {
            match self.peek() {
                Some((Token::Open, _)) => {
                    let child = self.parse_element()?;
                    element.children.push(child);
                }
                Some((Token::Text(text), _)) => {
                    element.text.push_str(unescape(text.trim()).as_ref());
                    self.pos += 1;
                }
                Some((Token::CloseOpen, _)) => {
                    self.pos += 1;
                    let (pos, found) = match self.advance()? {
                        (Token::Name(found), span) => (span.start, found),
                        (token, span) => {
                            return Err(CodecError::unexpected_token(span.start, "tag name", token.describe()))
                        }
                    };
                    if found != name {
                        return Err(CodecError::MismatchedTag {
                            pos,
                            expected: name.to_string(),
                            found: found.to_string(),
                        });
                    }
                    self.expect(Token::Close, "'>'")?;
                    return Ok(element);
                }
                Some((token, span)) => {
                    return Err(CodecError::unexpected_token(span.start, "element content", token.describe()))
                }
                None => return Err(CodecError::unexpected_eof(self.source_len)),
            }
        }
    }

    fn peek(&self) -> Option<(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) -> CodecResult<(Token<'src>, std::ops::Range<usize>)> {
        let token = self
            .peek()
            .ok_or_else(|| CodecError::unexpected_eof(self.source_len))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token<'src>, label: &str) -> CodecResult<()> {
        match self.advance()? {
            (token, _) if token == expected => Ok(()),
            (token, span) => Err(CodecError::unexpected_token(span.start, label, token.describe())),
        }
    }

    fn expect_name(&mut self) -> CodecResult<&'src str> {
        match self.advance()? {
            (Token::Name(name), _) => Ok(name),
            (token, span) => Err(CodecError::unexpected_token(span.start, "tag name", token.describe())),
        }
    }
}

/// Decode an exchange document into its top-level nodes.
///
/// Fails as a whole: callers get either every node or an error, never a
/// partial tree.
pub fn decode(source: &str) -> CodecResult<Vec<NodeData>> {
    Reader::new(source)?.read_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "<?xml version='1.0' encoding='UTF-8'?>\n<renderknecht_varianten><origin/><renderknecht_settings/><variant_presets>{}</variant_presets></renderknecht_varianten>",
            body
        )
    }

    #[test]
    fn test_read_preset_with_variant() {
        let source = wrap(
            r#"<preset order="000" name="P1" type="trim_setup" id="1">
                 <variant order="000" name="Color" value="red"/>
               </preset>"#,
        );
        let nodes = decode(&source).unwrap();
        assert_eq!(nodes.len(), 1);
        let preset = &nodes[0];
        assert_eq!(preset.cells.name, "P1");
        assert_eq!(preset.kind(), ItemKind::Preset);
        assert!(preset.cells.id.is_some());
        assert_eq!(preset.children[0].cells.name, "Color");
        assert_eq!(preset.children[0].cells.value, "red");
    }

    #[test]
    fn test_reference_tokens_share_identity() {
        let source = wrap(
            r#"<preset order="000" name="P1" type="trim_setup" id="1"/>
               <preset order="001" name="P2" type="preset" id="2">
                 <reference order="000" name="R" reference="1"/>
               </preset>"#,
        );
        let nodes = decode(&source).unwrap();
        assert_eq!(nodes[1].children[0].cells.reference, nodes[0].cells.id);
        assert_ne!(nodes[0].cells.id, nodes[1].cells.id);
    }

    #[test]
    fn test_legacy_variant_text_becomes_value() {
        let source = wrap(r#"<preset name="P" type="package" id="1"><variant name="PR">on</variant></preset>"#);
        let nodes = decode(&source).unwrap();
        assert_eq!(nodes[0].children[0].cells.value, "on");
    }

    #[test]
    fn test_legacy_sub_separator_tag() {
        let source = wrap(r#"<separator/><sub_seperator order="001"/>"#);
        let nodes = decode(&source).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind(), ItemKind::Separator);
        assert_eq!(nodes[1].kind(), ItemKind::SubSeparator);
    }

    #[test]
    fn test_unknown_elements_skipped() {
        let source = wrap(r#"<gizmo a="b"><variant name="x"/></gizmo><variant name="y"/>"#);
        let nodes = decode(&source).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].cells.name, "y");
    }

    #[test]
    fn test_wrong_root() {
        let err = decode("<html><body/></html>").unwrap_err();
        assert_eq!(
            err,
            CodecError::WrongRoot {
                expected: ROOT_TAG.to_string(),
                found: "html".to_string()
            }
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(decode(&wrap("")).unwrap_err(), CodecError::Empty);
        assert_eq!(
            decode("<renderknecht_varianten/>").unwrap_err(),
            CodecError::Empty
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(decode("").unwrap_err().is_malformed());
        assert!(decode("just text").unwrap_err().is_malformed());
        assert!(matches!(
            decode("<renderknecht_varianten></other>").unwrap_err(),
            CodecError::MismatchedTag { .. }
        ));
        assert!(matches!(
            decode("<a b=c/>").unwrap_err(),
            CodecError::UnexpectedToken { .. }
        ));
        assert!(decode("<a><b></b>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_trailing_content_rejected() {
        let source = format!("{}<extra/>", wrap(r#"<variant name="x"/>"#));
        assert!(matches!(
            decode(&source).unwrap_err(),
            CodecError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_invalid_order_defaults_to_zero() {
        let nodes = decode(&wrap(r#"<variant order="abc" name="x"/>"#)).unwrap();
        assert_eq!(nodes[0].cells.order, 0);
    }

    #[test]
    fn test_entities_decoded() {
        let nodes = decode(&wrap(r#"<variant name="A&amp;B" value="&lt;1&gt;"/>"#)).unwrap();
        assert_eq!(nodes[0].cells.name, "A&B");
        assert_eq!(nodes[0].cells.value, "<1>");
    }
}
