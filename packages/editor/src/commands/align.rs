use super::{set_style, style_value, traversed_nodes, EditContext};
use crate::errors::CommandResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "justifyleft" => Some(Alignment::Left),
            "center" | "justifycenter" => Some(Alignment::Center),
            "right" | "justifyright" => Some(Alignment::Right),
            "justify" | "justifyfull" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Set `text-align` on every block holding selected visible text
pub fn align(ctx: &mut EditContext<'_>, alignment: Alignment) -> CommandResult {
    let tree = &mut *ctx.tree;
    let mut blocks = Vec::new();
    for node in traversed_nodes(tree, ctx.selection) {
        if tree.is_text(node) && tree.is_visible_text(node) {
            let block = tree.closest_block(node);
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
    }
    if blocks.is_empty() {
        blocks.push(tree.closest_block(ctx.selection.focus.node));
    }

    let root = tree.root();
    for block in blocks.into_iter().filter(|b| *b != root) {
        let current = style_value(tree, block, "text-align");
        if current.as_deref() == Some(alignment.as_str()) {
            continue;
        }
        let is_left = matches!(current.as_deref(), None | Some("left") | Some("start"));
        if alignment == Alignment::Left && is_left {
            continue;
        }
        set_style(tree, block, "text-align", Some(alignment.as_str()));
    }
    Ok(())
}
