use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{decode_entity, tokenize, Token};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Anchor,
    Focus,
}

/// One open element while parsing
struct Frame {
    tag: Option<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<Markup>,
    text: String,
    /// Index of this element in its parent's children
    index: usize,
}

impl Frame {
    fn new(tag: Option<String>, attributes: BTreeMap<String, String>, index: usize) -> Self {
        Self {
            tag,
            attributes,
            children: Vec::new(),
            text: String::new(),
            index,
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let value = std::mem::take(&mut self.text);
            self.children.push(Markup::Text { value });
        }
    }
}

/// Parser for markup documents
pub struct Parser<'src> {
    source: &'src str,
    markers: bool,
    root: Frame,
    /// Open elements, innermost last
    stack: Vec<Frame>,
    /// Markers seen but not yet placed (waiting to know whether text follows)
    pending: Vec<Marker>,
    anchor: Option<MarkerPos>,
    focus: Option<MarkerPos>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            markers: false,
            root: Frame::new(None, BTreeMap::new(), 0),
            stack: Vec::new(),
            pending: Vec::new(),
            anchor: None,
            focus: None,
        }
    }

    /// Interpret `[]`, `[` and `]` as caret markers instead of text
    pub fn with_markers(mut self) -> Self {
        self.markers = true;
        self
    }

    /// Parse a complete document
    pub fn parse_fixture(mut self) -> ParseResult<Fixture> {
        for (token, span) in tokenize(self.source) {
            let token = token.map_err(|_| ParseError::lexer_error(span.start))?;
            match token {
                Token::OpenTag(slice) => self.open_tag(slice, span.start)?,
                Token::CloseTag(slice) => self.close_tag(slice, span.start)?,
                Token::Entity(slice) => {
                    let decoded = decode_entity(slice)
                        .ok_or_else(|| ParseError::invalid_syntax(span.start, "unknown entity"))?;
                    self.push_char(decoded);
                }
                Token::Text(slice) => self.push_text(slice),
                Token::Stray(slice) => {
                    return Err(ParseError::unexpected_token(span.start, "markup", slice));
                }
                Token::Caret | Token::AnchorMark | Token::FocusMark if !self.markers => {
                    self.push_text(token.as_source());
                }
                Token::Caret => {
                    self.mark(Marker::Anchor);
                    self.mark(Marker::Focus);
                }
                Token::AnchorMark => self.mark(Marker::Anchor),
                Token::FocusMark => self.mark(Marker::Focus),
            }
        }

        if !self.stack.is_empty() {
            return Err(ParseError::unexpected_eof(self.source.len()));
        }
        self.resolve_pending_at_boundary();
        let mut root = self.root;
        root.flush_text();
        Ok(Fixture {
            nodes: root.children,
            anchor: self.anchor,
            focus: self.focus,
        })
    }

    fn current(&mut self) -> &mut Frame {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    fn top(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.root)
    }

    fn container_path(&self) -> Vec<usize> {
        self.stack.iter().map(|f| f.index).collect()
    }

    fn mark(&mut self, marker: Marker) {
        let frame = self.top();
        if frame.text.is_empty() {
            self.pending.push(marker);
            return;
        }
        let mut path = self.container_path();
        path.push(frame.children.len());
        let pos = MarkerPos {
            path,
            offset: frame.text.chars().count(),
        };
        self.place(marker, pos);
    }

    fn place(&mut self, marker: Marker, pos: MarkerPos) {
        match marker {
            Marker::Anchor => self.anchor = Some(pos),
            Marker::Focus => self.focus = Some(pos),
        }
    }

    /// Pending markers followed by text land at offset 0 of that text
    fn resolve_pending_in_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut path = self.container_path();
        path.push(self.top().children.len());
        for marker in std::mem::take(&mut self.pending) {
            let pos = MarkerPos {
                path: path.clone(),
                offset: 0,
            };
            self.place(marker, pos);
        }
    }

    /// Pending markers followed by a tag land between children
    fn resolve_pending_at_boundary(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let path = self.container_path();
        let offset = self.top().children.len();
        for marker in std::mem::take(&mut self.pending) {
            let pos = MarkerPos {
                path: path.clone(),
                offset,
            };
            self.place(marker, pos);
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.current().text.is_empty() {
            self.resolve_pending_in_text();
        }
        self.current().text.push_str(text);
    }

    fn push_char(&mut self, c: char) {
        if self.current().text.is_empty() {
            self.resolve_pending_in_text();
        }
        self.current().text.push(c);
    }

    fn open_tag(&mut self, slice: &str, pos: usize) -> ParseResult<()> {
        self.current().flush_text();
        self.resolve_pending_at_boundary();

        let self_closing = slice.ends_with("/>");
        let inner = slice
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/');
        let name_end = inner
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(inner.len());
        let tag = inner[..name_end].to_ascii_lowercase();
        let attributes = parse_attributes(&inner[name_end..], pos)?;

        if self_closing || is_void_tag(&tag) {
            self.current().children.push(Markup::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
            return Ok(());
        }

        let index = self.current().children.len();
        self.stack.push(Frame::new(Some(tag), attributes, index));
        Ok(())
    }

    fn close_tag(&mut self, slice: &str, pos: usize) -> ParseResult<()> {
        let name = slice
            .trim_start_matches("</")
            .trim_end_matches('>')
            .trim()
            .to_ascii_lowercase();

        if is_void_tag(&name) {
            // `</br>` style closers carry no structure
            return Ok(());
        }
        let Some(open) = self.stack.last() else {
            return Err(ParseError::unexpected_token(pos, "open element", slice));
        };
        let expected = open.tag.clone().unwrap_or_default();
        if expected != name {
            return Err(ParseError::mismatched_tag(pos, expected, name));
        }

        self.current().flush_text();
        self.resolve_pending_at_boundary();
        if let Some(mut frame) = self.stack.pop() {
            frame.flush_text();
            self.current().children.push(Markup::Element {
                tag: frame.tag.unwrap_or_default(),
                attributes: frame.attributes,
                children: frame.children,
            });
        }
        Ok(())
    }
}

fn parse_attributes(source: &str, pos: usize) -> ParseResult<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    let mut rest = source.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        if name.is_empty() {
            return Err(ParseError::invalid_syntax(pos, "attribute without name"));
        }
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw, remainder) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body
                        .find(quote)
                        .ok_or_else(|| ParseError::invalid_syntax(pos, "unterminated attribute value"))?;
                    (&body[..end], &body[end + 1..])
                }
                _ => {
                    let end = after_eq
                        .find(|c: char| c.is_ascii_whitespace())
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            rest = remainder.trim_start();
            decode_text(raw)
        } else {
            String::new()
        };

        attributes.insert(name, value);
    }

    Ok(attributes)
}

/// Decode entities inside an attribute value, leaving unknown ones verbatim
fn decode_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';').and_then(|end| {
            decode_entity(&candidate[..=end]).map(|c| (c, end))
        }) {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse markup, treating bracket characters as text
pub fn parse(source: &str) -> ParseResult<Vec<Markup>> {
    Ok(Parser::new(source).parse_fixture()?.nodes)
}

/// Parse markup with caret markers (`[]`, `[`, `]`)
pub fn parse_fixture(source: &str) -> ParseResult<Fixture> {
    Parser::new(source).with_markers().parse_fixture()
}
