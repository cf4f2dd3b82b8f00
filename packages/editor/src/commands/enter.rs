//! Paragraph breaks (enter) and line breaks (shift+enter).
//!
//! Enter splits the node under the caret and keeps splitting ancestors up to
//! the closest block (or list item). Only the innermost split restores
//! whitespace and places the caret.

use super::list::li_shift_tab;
use super::{
    clear_empty, fill_empty, next_element_sibling, set_tag_name, split_text_node, toggle_class,
    EditContext, Keep,
};
use crate::errors::{CommandResult, Violation};
use crate::schema::NodeKind;
use crate::state::{classify, is_fake_line_break, CType};
use crate::tree::NodeId;
use crate::walk::{Direction, Position};
use crate::whitespace::prepare_update;

pub fn enter(ctx: &mut EditContext<'_>, node: NodeId, offset: usize) -> CommandResult {
    enter_at(ctx, node, offset, true).map(|_| ())
}

/// Split `node` at `offset`. Returns the element that now starts the new
/// line, when one was created.
fn enter_at(
    ctx: &mut EditContext<'_>,
    node: NodeId,
    offset: usize,
    first_split: bool,
) -> CommandResult<Option<NodeId>> {
    match ctx.tree.kind(node) {
        NodeKind::Text | NodeKind::LineBreak => {
            let Some(parent) = ctx.tree.parent(node) else {
                return Err(Violation::Unbreakable);
            };
            let index = if ctx.tree.is_text(node) {
                split_text_node(ctx.tree, node, offset, Keep::Right)
            } else {
                ctx.tree.index(node)
            };
            enter_at(ctx, parent, index, first_split)
        }
        NodeKind::Preformatted => {
            pre_enter(ctx, node, offset);
            Ok(None)
        }
        NodeKind::Heading | NodeKind::Quote => {
            let split = element_enter(ctx, node, offset, first_split)?;
            match split {
                // An empty new line after a heading is a paragraph
                Some(split) if !ctx.tree.has_visible_text(split) => {
                    let p = set_tag_name(ctx.tree, split, "p");
                    ctx.set_cursor_start(p);
                    Ok(Some(p))
                }
                other => Ok(other),
            }
        }
        NodeKind::ListItem => {
            if next_element_sibling(ctx.tree, node).is_some() || !ctx.tree.text_content(node).is_empty() {
                let split = element_enter(ctx, node, offset, first_split)?;
                if let Some(split) = split {
                    toggle_class(ctx.tree, split, "o_checked", Some(false));
                }
                Ok(split)
            } else {
                // Enter in an empty last item leaves the list
                li_shift_tab(ctx, node)?;
                Ok(None)
            }
        }
        NodeKind::GenericBlock | NodeKind::GenericInline => element_enter(ctx, node, offset, first_split),
    }
}

fn element_enter(
    ctx: &mut EditContext<'_>,
    node: NodeId,
    offset: usize,
    first_split: bool,
) -> CommandResult<Option<NodeId>> {
    if ctx.tree.is_unbreakable(node) {
        return Err(Violation::Unbreakable);
    }
    let restorer = first_split.then(|| prepare_update(ctx.tree, &[Position::new(node, offset)]));

    let tree = &mut *ctx.tree;
    let split = tree.clone_shallow(node);
    while let Some(child) = tree.child(node, offset) {
        tree.append(split, child);
    }
    let is_block = tree.is_block(node);
    let inserted = is_block || tree.size(split) > 0;
    if inserted {
        tree.insert_after(node, split);
    }

    // Inline nodes, and blocks nested in a list item, split their parent too
    let in_item = tree.kind(node) != NodeKind::ListItem
        && tree.parent(node).is_some_and(|p| tree.closest_tag(p, &["li"]).is_some());
    let outer = if !is_block || in_item {
        let Some(parent) = tree.parent(node) else {
            return Err(Violation::Unbreakable);
        };
        let index = tree.index(node) + 1;
        enter_at(ctx, parent, index, false)?
    } else {
        None
    };

    if let Some(restorer) = restorer {
        restorer.restore(ctx.tree);
        let kept = clear_empty(ctx.tree, node);
        fill_empty(ctx.tree, kept);
        let target = if inserted && ctx.tree.is_connected(split) {
            Some(split)
        } else {
            outer
        };
        if let Some(target) = target {
            fill_empty(ctx.tree, target);
            ctx.set_cursor_start(target);
        }
    }
    Ok(inserted.then_some(split).or(outer))
}

fn pre_enter(ctx: &mut EditContext<'_>, pre: NodeId, offset: usize) {
    if offset < ctx.tree.size(pre) {
        let br = ctx.tree.create_element("br");
        ctx.tree.insert(pre, offset, br);
        let after = ctx.tree.right_pos(br);
        ctx.set_cursor(after);
    } else {
        let p = ctx.tree.create_element("p");
        ctx.tree.insert_after(pre, p);
        fill_empty(ctx.tree, p);
        ctx.set_cursor_start(p);
    }
}

/// Insert a line break at the caret, doubling it when a single one would not
/// show
pub fn shift_enter(ctx: &mut EditContext<'_>, node: NodeId, offset: usize) -> CommandResult {
    let (element, offset) = if ctx.tree.is_text(node) || ctx.tree.is_br(node) {
        let Some(parent) = ctx.tree.parent(node) else {
            return Ok(());
        };
        let index = if ctx.tree.is_text(node) {
            split_text_node(ctx.tree, node, offset, Keep::Right)
        } else {
            ctx.tree.index(node)
        };
        (parent, index)
    } else {
        (node, offset)
    };

    let tree = &mut *ctx.tree;
    let restorer = prepare_update(tree, &[Position::new(element, offset)]);
    let br = tree.create_element("br");
    tree.insert(element, offset, br);
    let mut brs = vec![br];
    if is_fake_line_break(tree, br)
        && classify(tree, tree.left_pos(br), Direction::Left).ctype != CType::BR
    {
        let extra = tree.create_element("br");
        tree.insert_before(br, extra);
        brs.insert(0, extra);
    }
    restorer.restore(tree);

    if let Some(br) = brs.into_iter().find(|b| ctx.tree.is_connected(*b)) {
        let after = ctx.tree.right_pos(br);
        ctx.set_cursor(after);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{apply, Fixture};
    use super::super::Command;
    use crate::errors::Violation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enter_splits_paragraph() {
        assert_eq!(apply("<p>ab[]cd</p>", Command::Enter), "<p>ab</p><p>[]cd</p>");
    }

    #[test]
    fn test_enter_at_end_creates_empty_paragraph() {
        assert_eq!(apply("<p>ab[]</p>", Command::Enter), "<p>ab</p><p>[]<br></p>");
    }

    #[test]
    fn test_enter_at_start_keeps_empty_paragraph_above() {
        assert_eq!(apply("<p>[]ab</p>", Command::Enter), "<p><br></p><p>[]ab</p>");
    }

    #[test]
    fn test_enter_splits_inline_ancestors() {
        assert_eq!(
            apply("<p><b>ab[]cd</b></p>", Command::Enter),
            "<p><b>ab</b></p><p><b>[]cd</b></p>"
        );
    }

    #[test]
    fn test_enter_at_heading_end_makes_paragraph() {
        assert_eq!(apply("<h1>ab[]</h1>", Command::Enter), "<h1>ab</h1><p>[]<br></p>");
        assert_eq!(apply("<h1>ab[]cd</h1>", Command::Enter), "<h1>ab</h1><h1>[]cd</h1>");
    }

    #[test]
    fn test_enter_in_list_item() {
        assert_eq!(
            apply("<ul><li>ab[]cd</li></ul>", Command::Enter),
            "<ul><li>ab</li><li>[]cd</li></ul>"
        );
    }

    #[test]
    fn test_enter_in_empty_last_item_leaves_list() {
        assert_eq!(
            apply("<ul><li>a</li><li>[]</li></ul>", Command::Enter),
            "<ul><li>a</li></ul><p>[]<br></p>"
        );
    }

    #[test]
    fn test_enter_in_pre_inserts_line_break() {
        assert_eq!(apply("<pre>ab[]cd</pre>", Command::Enter), "<pre>ab<br>[]cd</pre>");
    }

    #[test]
    fn test_enter_in_unbreakable_is_a_violation() {
        let mut f = Fixture::load(r#"<div class="oe_unbreakable"><b>ab[]cd</b></div>"#);
        assert_eq!(f.run(Command::Enter), Err(Violation::Unbreakable));
    }

    #[test]
    fn test_shift_enter_inserts_line_break() {
        assert_eq!(apply("<p>ab[]cd</p>", Command::ShiftEnter), "<p>ab<br>[]cd</p>");
    }

    #[test]
    fn test_shift_enter_at_block_end_doubles_break() {
        assert_eq!(apply("<p>ab[]</p>", Command::ShiftEnter), "<p>ab<br>[]<br></p>");
    }
}
