//! Typing and plain-text paste.

use super::enter::{enter, shift_enter};
use super::{split_text_node, EditContext, Keep};
use crate::errors::{CommandResult, Violation};
use crate::schema::{is_collapsible, BLOCK_TAGS, NBSP};
use crate::state::{classify, CType};
use crate::tree::{byte_offset, NodeId};
use crate::walk::{Direction, Position};
use crate::whitespace::prepare_update;
use scribe_parser::Markup;

/// Insert `text` at the caret. Spaces that would collapse are written as
/// non-breaking spaces so what was typed is what renders.
pub fn insert_text(ctx: &mut EditContext<'_>, text: &str) -> CommandResult {
    if text.is_empty() {
        return Ok(());
    }
    let caret = ctx.caret();
    if ctx.tree.is_text(caret.node) {
        let node = caret.node;
        let value = ctx.tree.text(node).to_string();
        let cut = byte_offset(&value, caret.offset);
        let (before, after) = value.split_at(cut);

        let left_is_content = !before.is_empty()
            || classify(ctx.tree, ctx.tree.left_pos(node), Direction::Left).ctype == CType::CONTENT;
        let right_is_visible = match after.chars().next() {
            Some(c) => !is_collapsible(c),
            None => classify(ctx.tree, ctx.tree.right_pos(node), Direction::Right)
                .ctype
                .intersects(CType::CONTENT | CType::SPACE),
        };

        let mut before = before.to_string();
        // A trailing NBSP left from earlier typing goes back to a plain space
        // once something visible follows it
        if text.chars().next().is_some_and(|c| !is_collapsible(c)) && before.ends_with(NBSP) {
            let mut chars: Vec<char> = before.chars().collect();
            let n = chars.len();
            if n >= 2 && !is_collapsible(chars[n - 2]) && chars[n - 2] != NBSP {
                chars[n - 1] = ' ';
                before = chars.into_iter().collect();
            }
        }

        let typed = visible_spaces(text, before.chars().next_back(), left_is_content, right_is_visible);
        let typed_len = typed.chars().count();
        ctx.tree.set_text(node, &format!("{before}{typed}{after}"));
        ctx.set_cursor(Position::new(node, caret.offset + typed_len));
        return Ok(());
    }

    let pos = caret;
    let left_is_content = classify(ctx.tree, pos, Direction::Left).ctype == CType::CONTENT;
    let right_is_visible = classify(ctx.tree, pos, Direction::Right)
        .ctype
        .intersects(CType::CONTENT | CType::SPACE);
    let typed = visible_spaces(text, None, left_is_content, right_is_visible);
    let typed_len = typed.chars().count();

    let tree = &mut *ctx.tree;
    let restorer = prepare_update(tree, &[pos]);
    let node = tree.create_text(&typed);
    tree.insert(pos.node, pos.offset, node);
    restorer.restore(tree);
    ctx.set_cursor(Position::new(node, typed_len));
    Ok(())
}

/// Rewrite collapsible whitespace in `text` so each typed space shows
fn visible_spaces(text: &str, prev: Option<char>, left_is_content: bool, right_is_visible: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut prev = prev;
    for (i, c) in chars.iter().copied().enumerate() {
        let c = if is_collapsible(c) {
            let collapses = match prev {
                Some(p) => is_collapsible(p),
                None => !left_is_content,
            };
            let trailing = i + 1 == chars.len() && !right_is_visible;
            if collapses || trailing {
                NBSP
            } else {
                ' '
            }
        } else {
            c
        };
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Insert a whole node at the caret and put the caret after it
pub(crate) fn insert_node(ctx: &mut EditContext<'_>, node: NodeId) {
    let caret = ctx.caret();
    let tree = &mut *ctx.tree;
    let pos = match tree.parent(caret.node) {
        Some(parent) if tree.is_text(caret.node) => {
            Position::new(parent, split_text_node(tree, caret.node, caret.offset, Keep::Left))
        }
        _ => caret,
    };
    let restorer = prepare_update(tree, &[pos]);
    tree.insert(pos.node, pos.offset, node);
    restorer.restore(tree);
    let after = ctx.tree.right_pos(node);
    ctx.set_cursor(after);
}

/// Paste plain text. Each line after the first starts a new paragraph, or a
/// new line where paragraphs cannot be split.
pub fn paste_text(ctx: &mut EditContext<'_>, text: &str) -> CommandResult {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            let caret = ctx.caret();
            match enter(ctx, caret.node, caret.offset) {
                Err(Violation::Unbreakable) => {
                    let caret = ctx.caret();
                    shift_enter(ctx, caret.node, caret.offset)?;
                }
                other => other?,
            }
        }
        insert_text(ctx, line)?;
    }
    Ok(())
}

/// Flatten pasted markup to text, one line per block
pub fn plain_text_from_html(html: &str) -> String {
    match scribe_parser::parse(html) {
        Ok(nodes) => {
            let mut out = String::new();
            for node in &nodes {
                collect_lines(node, &mut out);
            }
            out.trim_matches('\n').to_string()
        }
        Err(_) => html.to_string(),
    }
}

fn collect_lines(node: &Markup, out: &mut String) {
    match node {
        Markup::Text { value } => out.push_str(value),
        Markup::Element { tag, children, .. } => {
            if tag == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_TAGS.contains(&tag.as_str());
            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for child in children {
                collect_lines(child, out);
            }
            if block && !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::apply;
    use super::super::Command;
    use super::plain_text_from_html;
    use pretty_assertions::assert_eq;

    fn typed(source: &str, text: &str) -> String {
        apply(source, Command::InsertText(text.to_string()))
    }

    #[test]
    fn test_insert_inside_text() {
        assert_eq!(typed("<p>ab[]cd</p>", "x"), "<p>abx[]cd</p>");
    }

    #[test]
    fn test_insert_into_empty_paragraph_drops_placeholder() {
        assert_eq!(typed("<p>[]<br></p>", "x"), "<p>x[]</p>");
    }

    #[test]
    fn test_trailing_space_becomes_nbsp() {
        assert_eq!(typed("<p>ab[]</p>", " "), "<p>ab&nbsp;[]</p>");
        assert_eq!(typed("<p>ab[]cd</p>", " "), "<p>ab []cd</p>");
    }

    #[test]
    fn test_typing_after_nbsp_restores_space() {
        assert_eq!(typed("<p>ab&nbsp;[]</p>", "c"), "<p>ab c[]</p>");
    }

    #[test]
    fn test_insert_replaces_selection() {
        assert_eq!(typed("<p>a[bc]d</p>", "x"), "<p>ax[]d</p>");
    }

    #[test]
    fn test_paste_lines_become_paragraphs() {
        assert_eq!(
            apply("<p>[]<br></p>", Command::Paste("a\nb".to_string())),
            "<p>a</p><p>b[]</p>"
        );
    }

    #[test]
    fn test_plain_text_from_html() {
        assert_eq!(plain_text_from_html("<p>a<b>b</b></p><p>c<br>d</p>"), "ab\nc\nd");
    }
}
