//! Inline formatting over the selected text.
//!
//! Boundary text nodes are split first so formatting applies to whole text
//! nodes, then consecutive siblings are wrapped together.

use super::insert::insert_node;
use super::{set_style, split_to_element, unwrap, EditContext};
use crate::errors::CommandResult;
use crate::selection::compare_positions;
use crate::tree::{NodeId, Tree};
use crate::walk::Position;
use std::cmp::Ordering;

const BOLD_TAGS: &[&str] = &["b", "strong"];

/// Split the selection boundaries and return the text nodes it covers.
/// The selection is moved onto the first and last of them.
fn isolate_selected_texts(ctx: &mut EditContext<'_>) -> Vec<NodeId> {
    if ctx.selection.is_collapsed() {
        return Vec::new();
    }
    let (start, end) = ctx.selection.ordered(ctx.tree);
    let tree = &mut *ctx.tree;
    let end = split_to_element(tree, end);
    let end_next = tree.child(end.node, end.offset);
    let start = split_to_element(tree, start);
    let end = Position::new(
        end.node,
        end_next.map_or_else(|| tree.size(end.node), |n| tree.index(n)),
    );

    let texts: Vec<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|n| tree.is_text(*n) && !tree.text(*n).is_empty())
        .filter(|n| {
            compare_positions(tree, tree.left_pos(*n), start) != Ordering::Less
                && compare_positions(tree, tree.right_pos(*n), end) != Ordering::Greater
        })
        .collect();

    if let (Some(first), Some(last)) = (texts.first(), texts.last()) {
        let focus = Position::new(*last, ctx.tree.size(*last));
        ctx.set_range(Position::new(*first, 0), focus);
    }
    texts
}

/// Wrap runs of consecutive siblings, one fresh wrapper per run
fn wrap_runs(tree: &mut Tree, nodes: &[NodeId], make: impl Fn(&mut Tree) -> NodeId) -> Vec<NodeId> {
    let mut wrappers = Vec::new();
    let mut current: Option<NodeId> = None;
    for node in nodes.iter().copied() {
        let joins = current.is_some_and(|w| tree.next_sibling(w) == Some(node));
        if !joins {
            let wrapper = make(tree);
            tree.insert_before(node, wrapper);
            wrappers.push(wrapper);
            current = Some(wrapper);
        }
        if let Some(wrapper) = current {
            tree.append(wrapper, node);
        }
    }
    wrappers
}

fn is_bold(tree: &Tree, node: NodeId) -> bool {
    let block = tree.closest_block(node);
    tree.closest_tag(node, BOLD_TAGS)
        .is_some_and(|b| tree.contains(block, b) && b != block)
}

pub fn bold(ctx: &mut EditContext<'_>) -> CommandResult {
    let texts = isolate_selected_texts(ctx);
    if texts.is_empty() {
        return Ok(());
    }
    let tree = &mut *ctx.tree;
    if texts.iter().all(|t| is_bold(tree, *t)) {
        for text in &texts {
            let Some(b) = tree.closest_tag(*text, BOLD_TAGS) else {
                continue;
            };
            let whole = tree
                .descendants(b)
                .into_iter()
                .filter(|n| tree.is_text(*n) && !tree.text(*n).is_empty())
                .all(|n| texts.contains(&n));
            if whole {
                unwrap(tree, b);
            } else {
                let span = wrap_runs(tree, &[*text], |t| t.create_element("span"));
                for span in span {
                    set_style(tree, span, "font-weight", Some("normal"));
                }
            }
        }
    } else {
        let plain: Vec<NodeId> = texts.iter().copied().filter(|t| !is_bold(tree, *t)).collect();
        wrap_runs(tree, &plain, |t| t.create_element("b"));
    }
    Ok(())
}

fn create_anchor(tree: &mut Tree, url: &str) -> NodeId {
    let a = tree.create_element("a");
    tree.set_attribute(a, "href", Some(url));
    a
}

/// Link the selected text, or insert the url itself as a link at the caret
pub fn create_link(ctx: &mut EditContext<'_>, url: &str) -> CommandResult {
    let texts = isolate_selected_texts(ctx);
    if texts.is_empty() {
        let a = create_anchor(ctx.tree, url);
        let label = ctx.tree.create_text(url);
        ctx.tree.append(a, label);
        insert_node(ctx, a);
        return Ok(());
    }
    let tree = &mut *ctx.tree;
    let mut unlinked = Vec::new();
    for text in texts {
        match tree.closest_tag(text, &["a"]) {
            Some(a) => tree.set_attribute(a, "href", Some(url)),
            None => unlinked.push(text),
        }
    }
    wrap_runs(tree, &unlinked, |t| create_anchor(t, url));
    Ok(())
}

pub fn unlink(ctx: &mut EditContext<'_>) -> CommandResult {
    let mut nodes = isolate_selected_texts(ctx);
    if nodes.is_empty() {
        nodes.push(ctx.caret().node);
    }
    let tree = &mut *ctx.tree;
    let mut anchors = Vec::new();
    for node in nodes {
        if let Some(a) = tree.closest_tag(node, &["a"]) {
            if !anchors.contains(&a) {
                anchors.push(a);
            }
        }
    }
    for a in anchors {
        unwrap(tree, a);
    }
    Ok(())
}

pub fn set_font_size(ctx: &mut EditContext<'_>, size: &str) -> CommandResult {
    let texts = isolate_selected_texts(ctx);
    let tree = &mut *ctx.tree;
    let mut bare = Vec::new();
    for text in texts {
        // Reuse a span that wraps exactly this text
        match tree.parent(text) {
            Some(parent) if tree.has_tag(parent, &["span"]) && tree.size(parent) == 1 => {
                set_style(tree, parent, "font-size", Some(size));
            }
            _ => bare.push(text),
        }
    }
    for span in wrap_runs(tree, &bare, |t| t.create_element("span")) {
        set_style(tree, span, "font-size", Some(size));
    }
    Ok(())
}

/// Insert an icon element (`<span class="fa ...">`) at the caret
pub fn insert_icon(ctx: &mut EditContext<'_>, class: &str) -> CommandResult {
    let span = ctx.tree.create_element("span");
    let class = format!("fa {}", class.trim());
    ctx.tree.set_attribute(span, "class", Some(class.trim()));
    insert_node(ctx, span);
    Ok(())
}
