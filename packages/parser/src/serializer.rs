use crate::ast::*;
use std::fmt::Write;

/// Serializer converts markup back to source
///
/// Output is deterministic: attributes come out sorted, U+00A0 is written as
/// `&nbsp;` and void elements never get a closing tag. Caret markers are
/// emitted when positions are supplied, which keeps fixtures readable in
/// test assertions.
pub struct Serializer<'a> {
    anchor: Option<&'a MarkerPos>,
    focus: Option<&'a MarkerPos>,
}

impl<'a> Serializer<'a> {
    pub fn new() -> Self {
        Self {
            anchor: None,
            focus: None,
        }
    }

    pub fn with_markers(anchor: Option<&'a MarkerPos>, focus: Option<&'a MarkerPos>) -> Self {
        Self { anchor, focus }
    }

    pub fn serialize(&self, nodes: &[Markup]) -> String {
        let mut output = String::new();
        let mut path = Vec::new();
        self.serialize_children(nodes, &mut path, &mut output);
        output
    }

    fn markers_at(&self, path: &[usize], offset: usize) -> &'static str {
        let hit = |m: Option<&MarkerPos>| m.is_some_and(|m| m.path == path && m.offset == offset);
        match (hit(self.anchor), hit(self.focus)) {
            (true, true) => "[]",
            (true, false) => "[",
            (false, true) => "]",
            (false, false) => "",
        }
    }

    fn serialize_children(&self, nodes: &[Markup], path: &mut Vec<usize>, output: &mut String) {
        for (index, node) in nodes.iter().enumerate() {
            output.push_str(self.markers_at(path, index));
            path.push(index);
            self.serialize_node(node, path, output);
            path.pop();
        }
        output.push_str(self.markers_at(path, nodes.len()));
    }

    fn serialize_node(&self, node: &Markup, path: &mut Vec<usize>, output: &mut String) {
        match node {
            Markup::Text { value } => {
                for (offset, c) in value.chars().enumerate() {
                    output.push_str(self.markers_at(path, offset));
                    push_escaped(c, output);
                }
                output.push_str(self.markers_at(path, value.chars().count()));
            }
            Markup::Element {
                tag,
                attributes,
                children,
            } => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in attributes {
                    if value.is_empty() {
                        let _ = write!(output, " {}", name);
                    } else {
                        let _ = write!(output, " {}=\"{}\"", name, escape_attribute(value));
                    }
                }
                output.push('>');
                if is_void_tag(tag) {
                    return;
                }
                self.serialize_children(children, path, output);
                let _ = write!(output, "</{}>", tag);
            }
        }
    }
}

impl Default for Serializer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn push_escaped(c: char, output: &mut String) {
    match c {
        '&' => output.push_str("&amp;"),
        '<' => output.push_str("&lt;"),
        '>' => output.push_str("&gt;"),
        '\u{00A0}' => output.push_str("&nbsp;"),
        c => output.push(c),
    }
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            c => push_escaped(c, &mut out),
        }
    }
    out
}

/// Serialize markup without markers
pub fn serialize(nodes: &[Markup]) -> String {
    Serializer::new().serialize(nodes)
}
