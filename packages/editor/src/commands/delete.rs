//! Backward and forward deletion, and deletion of a selected range.
//!
//! Deleting at the start of a block moves the inline run that follows the
//! caret out of the block, then keeps propagating left while a block edge is
//! still on the left of the moved nodes: this is how two blocks merge.

use super::list::li_shift_tab;
use super::{
    fill_empty, is_visible_str, move_nodes, prev_element_sibling, remove_node, set_tag_name,
    split_text_node, split_to_element, EditContext, Keep,
};
use crate::errors::{CommandResult, Violation};
use crate::guard;
use crate::schema::{is_collapsible_only, NodeKind, ZWS};
use crate::state::{classify, is_fake_line_break, CType};
use crate::tree::{NodeId, Tree};
use crate::walk::{DomPath, Direction, PathOptions, Position};
use crate::whitespace::prepare_update;

pub fn delete_backward(
    ctx: &mut EditContext<'_>,
    node: NodeId,
    offset: usize,
    already_moved: bool,
) -> CommandResult {
    match ctx.tree.kind(node) {
        NodeKind::Text => text_delete_backward(ctx, node, offset, already_moved),
        NodeKind::LineBreak => br_delete_backward(ctx, node, offset, already_moved),
        NodeKind::ListItem => li_delete_backward(ctx, node, offset, already_moved),
        _ => element_delete_backward(ctx, node, offset, already_moved),
    }
}

fn text_delete_backward(
    ctx: &mut EditContext<'_>,
    text: NodeId,
    offset: usize,
    already_moved: bool,
) -> CommandResult {
    if offset == 0 {
        return element_delete_backward(ctx, text, 0, already_moved);
    }
    let Some(parent) = ctx.tree.parent(text) else {
        return Ok(());
    };
    let tree = &mut *ctx.tree;

    // Isolate the character in its own node
    let first = split_text_node(tree, text, offset - 1, Keep::Right);
    let Some(rest) = tree.child(parent, first) else {
        return Ok(());
    };
    let second = split_text_node(tree, rest, 1, Keep::Right);
    let Some(middle) = tree.child(parent, first) else {
        return Ok(());
    };

    let restorer = prepare_update(
        tree,
        &[Position::new(parent, first), Position::new(parent, second)],
    );
    let is_space = !is_visible_str(tree, middle);
    let is_zws = tree.text(middle) == ZWS.to_string();
    tree.detach(middle);
    let at = drop_emptied_inlines(tree, Position::new(parent, first));
    restorer.restore(tree);

    let parent = at.node;
    let first = at.offset.min(tree.size(parent));
    // An invisible char was removed: keep deleting
    if is_zws
        || (is_space
            && classify(tree, Position::new(parent, first), Direction::Left).ctype != CType::CONTENT)
    {
        return delete_backward(ctx, parent, first, already_moved);
    }

    fill_empty(ctx.tree, parent);
    ctx.set_cursor(Position::new(parent, first));
    Ok(())
}

/// Remove the inline wrappers a deletion left with nothing in them
fn drop_emptied_inlines(tree: &mut Tree, pos: Position) -> Position {
    let mut pos = pos;
    while tree.is_element(pos.node)
        && !tree.is_block(pos.node)
        && !tree.is_unremovable(pos.node)
        && !tree.is_visible_empty(pos.node)
        && tree
            .children(pos.node)
            .iter()
            .all(|c| tree.is_text(*c) && tree.text(*c).is_empty())
    {
        let Some(up) = tree.parent(pos.node) else {
            break;
        };
        let index = tree.index(pos.node);
        tree.detach(pos.node);
        pos = Position::new(up, index);
    }
    pos
}

fn br_delete_backward(
    ctx: &mut EditContext<'_>,
    br: NodeId,
    offset: usize,
    already_moved: bool,
) -> CommandResult {
    let Some(parent) = ctx.tree.parent(br) else {
        return Ok(());
    };
    let index = ctx.tree.index(br);
    let right = classify(ctx.tree, Position::new(parent, index + 1), Direction::Right).ctype;
    if right.intersects(CType::BLOCK_INSIDE) {
        // Trailing BR: it only holds the line, delete what is before it
        delete_backward(ctx, parent, index, already_moved)
    } else {
        element_delete_backward(ctx, br, offset, already_moved)
    }
}

fn li_delete_backward(
    ctx: &mut EditContext<'_>,
    li: NodeId,
    offset: usize,
    already_moved: bool,
) -> CommandResult {
    if offset > 0 || prev_element_sibling(ctx.tree, li).is_some() {
        return element_delete_backward(ctx, li, offset, already_moved);
    }
    li_shift_tab(ctx, li).map(|_| ())
}

/// Nothing but invisible text before the node in its parent
fn is_first_child(tree: &Tree, node: NodeId) -> bool {
    let mut sibling = tree.prev_sibling(node);
    while let Some(s) = sibling {
        if !(tree.is_text(s) && is_collapsible_only(tree.text(s))) {
            return false;
        }
        sibling = tree.prev_sibling(s);
    }
    true
}

fn element_delete_backward(
    ctx: &mut EditContext<'_>,
    this: NodeId,
    offset: usize,
    already_moved: bool,
) -> CommandResult {
    let mut already_moved = already_moved;
    let move_dest;

    if offset > 0 {
        let Some(left) = ctx.tree.child(this, offset - 1) else {
            return Ok(());
        };
        if ctx.tree.is_unremovable(left) {
            return Err(Violation::Unremovable);
        }
        if !ctx.tree.is_block(left) || ctx.tree.is_visible_empty(left) {
            // <p>abc<i>def</i>[]</p> deletes like <p>abc<i>def[]</i></p>
            let size = ctx.tree.size(left);
            return delete_backward(ctx, left, size, already_moved);
        }
        // After a block: pull the following inline run into it
        already_moved = true;
        move_dest = ctx.tree.end_pos(left);
    } else {
        if ctx.tree.is_unremovable(this) {
            return Err(Violation::Unremovable);
        }
        let Some(parent) = ctx.tree.parent(this) else {
            return Ok(());
        };

        if !ctx.tree.is_block(this) || ctx.tree.is_visible_empty(this) {
            let parent_offset = ctx.tree.index(this);
            let tree = &mut *ctx.tree;
            if tree.size(this) == 0 || tree.text_content(this) == ZWS.to_string() {
                let visible = tree.is_br(this) || tree.has_visible_content(this);
                remove_node(tree, this)?;
                fill_empty(tree, parent);
                if visible {
                    let offset = parent_offset.min(tree.size(parent));
                    ctx.set_cursor(Position::new(parent, offset));
                    return Ok(());
                }
            }
            let parent_offset = parent_offset.min(ctx.tree.size(parent));
            return delete_backward(ctx, parent, parent_offset, already_moved);
        }

        if is_first_child(ctx.tree, this) && ctx.tree.is_unbreakable(parent) {
            // Nothing to merge with. Leading headings and quotes degrade to
            // a paragraph.
            if matches!(
                ctx.tree.kind(this),
                NodeKind::Heading | NodeKind::Quote | NodeKind::Preformatted
            ) {
                let p = set_tag_name(ctx.tree, this, "p");
                ctx.set_cursor_start(p);
            }
            return Ok(());
        }
        move_dest = ctx.tree.left_pos(this);
    }

    let mut first_block = offset;
    while let Some(node) = ctx.tree.child(this, first_block) {
        if ctx.tree.is_block(node) {
            break;
        }
        first_block += 1;
    }
    let mut cursor = move_nodes(ctx.tree, move_dest, this, offset, first_block);
    ctx.set_cursor(cursor);

    // Keep merging while a block edge is still on the left
    let tree = &*ctx.tree;
    if tree.is_text(cursor.node) && (cursor.offset == 0 || cursor.offset == tree.size(cursor.node)) {
        let Some(parent) = tree.parent(cursor.node) else {
            return Ok(());
        };
        let index = tree.index(cursor.node) + usize::from(cursor.offset != 0);
        cursor = Position::new(parent, index);
    }
    if !tree.is_text(cursor.node) {
        let ctype = classify(tree, cursor, Direction::Left).ctype;
        if ctype.intersects(CType::BLOCK) && (!already_moved || ctype == CType::BLOCK_OUTSIDE) {
            return delete_backward(ctx, cursor.node, cursor.offset, already_moved);
        }
    }
    Ok(())
}

/// Leaves forward deletion can act on
fn is_deletable_leaf(tree: &Tree, node: NodeId) -> bool {
    tree.is_br(node)
        || tree.is_visible_empty(node)
        || (tree.is_text(node) && is_visible_str(tree, node))
}

pub fn delete_forward(ctx: &mut EditContext<'_>, node: NodeId, offset: usize) -> CommandResult {
    if ctx.tree.is_text(node) {
        if offset < ctx.tree.size(node) {
            return text_delete_backward(ctx, node, offset + 1, false);
        }
        let Some(parent) = ctx.tree.parent(node) else {
            return Ok(());
        };
        let index = ctx.tree.index(node) + 1;
        return element_delete_forward(ctx, parent, index);
    }
    element_delete_forward(ctx, node, offset)
}

fn element_delete_forward(ctx: &mut EditContext<'_>, this: NodeId, offset: usize) -> CommandResult {
    let tree = &*ctx.tree;
    let start = Position::new(this, offset);
    let first_leaf = DomPath::new(tree, start, Direction::Right, PathOptions::leaf_inline())
        .find(|n| is_deletable_leaf(tree, *n));

    if let Some(leaf) = first_leaf {
        if !(tree.is_br(leaf) && is_fake_line_break(tree, leaf)) {
            let size = if tree.is_text(leaf) { 1 } else { 0 };
            return delete_backward(ctx, leaf, size, false);
        }
    }

    // Nothing left in this block: merge the next one in
    let from = first_leaf.map_or(start, |leaf| tree.right_pos(leaf));
    let options = PathOptions {
        leaf_only: true,
        ..PathOptions::default()
    };
    let next = DomPath::new(tree, from, Direction::Right, options).find(|n| is_deletable_leaf(tree, *n));
    if let Some(leaf) = next {
        let pos = tree.left_pos(leaf);
        return delete_backward(ctx, pos.node, pos.offset, false);
    }
    Ok(())
}

/// Delete the selected range, then merge the blocks it spanned
pub fn delete_range(ctx: &mut EditContext<'_>) -> CommandResult {
    let (start, end) = ctx.selection.ordered(ctx.tree);
    if start == end {
        return Ok(());
    }
    let tree = &mut *ctx.tree;

    let end = split_to_element(tree, end);
    let end_next = tree.child(end.node, end.offset);
    let start = split_to_element(tree, start);
    let end_parent = end.node;
    let end_offset = end_next.map_or(tree.size(end_parent), |n| tree.index(n));

    // Top-most nodes fully inside the range
    let mut covered = Vec::new();
    let (mut parent, mut index) = (start.node, start.offset);
    while !(parent == end_parent && index >= end_offset) {
        match tree.child(parent, index) {
            Some(child) if tree.contains(child, end_parent) => {
                parent = child;
                index = 0;
            }
            Some(child) => {
                covered.push(child);
                index += 1;
            }
            None => {
                let Some(up) = tree.parent(parent) else {
                    break;
                };
                index = tree.index(parent) + 1;
                parent = up;
            }
        }
    }

    let restorer = prepare_update(tree, &[start, Position::new(end_parent, end_offset)]);
    for node in covered {
        if tree.is_unremovable(node) {
            while let Some(child) = tree.first_child(node) {
                tree.detach(child);
            }
        } else {
            tree.detach(node);
        }
    }
    restorer.restore(tree);

    let start = Position::new(start.node, start.offset.min(tree.size(start.node)));
    ctx.set_cursor(start);

    let tree = &*ctx.tree;
    let end_block = tree.closest_block(end_parent);
    if tree.closest_block(start.node) != end_block && tree.is_connected(end_parent) {
        let offset = end_next
            .filter(|n| tree.parent(*n) == Some(end_parent))
            .map_or(0, |n| tree.index(n));
        let saved = tree.journal_len();
        let snapshot = ctx.selection.snapshot(tree);
        let merged = if tree.kind(end_block) == NodeKind::ListItem {
            // Backspace would outdent the item instead of joining it
            pull_list_item(ctx, start, end_block)
        } else {
            delete_backward(ctx, end_parent, offset, false)
        };
        let merged = merged.and_then(|_| guard::check_ownership(ctx.tree, saved));
        if let Err(violation) = merged {
            tracing::debug!(%violation, "range deleted without merging its blocks");
            guard::rollback(ctx.tree, ctx.selection, saved, &snapshot);
        }
    }

    if ctx.tree.is_connected(end_parent) {
        fill_empty(ctx.tree, end_parent);
    }
    if ctx.tree.is_connected(start.node) {
        fill_empty(ctx.tree, start.node);
    }
    Ok(())
}

/// Join the inline run of a list item at `dest`, then drop the item and its
/// list if nothing else is left in them
fn pull_list_item(ctx: &mut EditContext<'_>, dest: Position, li: NodeId) -> CommandResult {
    let tree = &mut *ctx.tree;
    let list = tree.parent(li);
    let mut first_block = 0;
    while let Some(node) = tree.child(li, first_block) {
        if tree.is_block(node) {
            break;
        }
        first_block += 1;
    }
    let cursor = move_nodes(tree, dest, li, 0, first_block);
    if let Some(list) = list.filter(|l| tree.is_list(*l) && tree.size(*l) == 0) {
        remove_node(tree, list)?;
    }
    ctx.set_cursor(cursor);
    Ok(())
}
