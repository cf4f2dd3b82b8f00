//! # Commands
//!
//! Each editing command is implemented once per [`NodeKind`](crate::schema::NodeKind) and dispatched
//! on the kind of the node under the caret. Implementations escalate to the
//! parent (or a neighbor) when the current node cannot handle the command
//! itself, and signal structural violations by returning `Err`; the guard
//! rolls the whole command back in that case.

mod align;
mod delete;
mod enter;
mod format;
mod insert;
mod list;

pub use align::{align, Alignment};
pub use delete::{delete_backward, delete_forward, delete_range};
pub use enter::{enter, shift_enter};
pub use format::{bold, create_link, insert_icon, set_font_size, unlink};
pub use insert::{insert_text, paste_text, plain_text_from_html};
pub use list::{shift_tab, tab, toggle_list, ListMode};

use crate::errors::{CommandResult, Violation};
use crate::schema::is_collapsible_only;
use crate::selection::{compare_positions, Selection};
use crate::tree::{NodeId, Tree};
use crate::walk::Position;
use crate::whitespace::prepare_update;
use std::cmp::Ordering;

/// Mutable view handed to every command
pub struct EditContext<'a> {
    pub tree: &'a mut Tree,
    pub selection: &'a mut Selection,
    /// Number of NBSPs a tab inserts outside lists
    pub tab_width: usize,
}

impl EditContext<'_> {
    pub fn caret(&self) -> Position {
        self.selection.focus
    }

    pub fn set_cursor(&mut self, pos: Position) {
        *self.selection = Selection::caret(pos);
    }

    pub fn set_range(&mut self, anchor: Position, focus: Position) {
        *self.selection = Selection::new(anchor, focus);
    }

    /// Caret before the first visible leaf of `node`
    pub fn set_cursor_start(&mut self, node: NodeId) {
        let tree = &*self.tree;
        let leaf = tree.first_leaf(node);
        let pos = if tree.is_text(leaf) || leaf == node {
            Position::new(leaf, 0)
        } else if tree.is_br(leaf) || tree.is_visible_empty(leaf) {
            tree.left_pos(leaf)
        } else {
            Position::new(leaf, 0)
        };
        self.set_cursor(pos);
    }

    /// Caret after the last visible leaf of `node`; a trailing BR keeps the
    /// caret before it
    pub fn set_cursor_end(&mut self, node: NodeId) {
        let tree = &*self.tree;
        let leaf = tree.last_leaf(node);
        let pos = if tree.is_br(leaf) && leaf != node {
            tree.left_pos(leaf)
        } else if tree.is_visible_empty(leaf) && leaf != node {
            tree.right_pos(leaf)
        } else {
            tree.end_pos(leaf)
        };
        self.set_cursor(pos);
    }

    /// Keep the selection when it still points into the document, else
    /// move the caret to the start of `fallback`
    pub fn repair_cursor(&mut self, fallback: NodeId) {
        if !self.selection.is_valid(self.tree) {
            self.set_cursor_start(fallback);
        }
    }
}

/// Everything the dispatcher can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DeleteBackward,
    DeleteForward,
    Enter,
    ShiftEnter,
    Tab,
    ShiftTab,
    ToggleList(ListMode),
    Align(Alignment),
    InsertText(String),
    Paste(String),
    Bold,
    CreateLink(String),
    Unlink,
    SetFontSize(String),
    InsertIcon(String),
}

impl Command {
    /// Commands that replace a non-collapsed selection before running
    fn consumes_range(&self) -> bool {
        matches!(
            self,
            Command::DeleteBackward
                | Command::DeleteForward
                | Command::Enter
                | Command::ShiftEnter
                | Command::InsertText(_)
                | Command::Paste(_)
                | Command::InsertIcon(_)
        )
    }
}

/// Run one command against the current selection
pub fn dispatch(ctx: &mut EditContext<'_>, command: &Command) -> CommandResult {
    if !ctx.selection.is_collapsed() && command.consumes_range() {
        delete_range(ctx)?;
        if matches!(command, Command::DeleteBackward | Command::DeleteForward) {
            return Ok(());
        }
    }
    let caret = ctx.caret();
    match command {
        Command::DeleteBackward => delete_backward(ctx, caret.node, caret.offset, false),
        Command::DeleteForward => delete_forward(ctx, caret.node, caret.offset),
        Command::Enter => enter(ctx, caret.node, caret.offset),
        Command::ShiftEnter => shift_enter(ctx, caret.node, caret.offset),
        Command::Tab => tab(ctx),
        Command::ShiftTab => shift_tab(ctx),
        Command::ToggleList(mode) => toggle_list(ctx, caret.node, caret.offset, *mode),
        Command::Align(alignment) => align(ctx, *alignment),
        Command::InsertText(text) => insert_text(ctx, text),
        Command::Paste(text) => paste_text(ctx, text),
        Command::Bold => bold(ctx),
        Command::CreateLink(url) => create_link(ctx, url),
        Command::Unlink => unlink(ctx),
        Command::SetFontSize(size) => set_font_size(ctx, size),
        Command::InsertIcon(class) => insert_icon(ctx, class),
    }
}

// ----------------------------------------------------------------------
// Shared tree helpers
// ----------------------------------------------------------------------

/// Which half of a split text node keeps the original node (and its oid)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keep {
    Left,
    Right,
}

/// Split a text node at a char offset. Returns the child index in the
/// parent at which the right half starts. Never creates empty nodes.
pub(crate) fn split_text_node(tree: &mut Tree, text: NodeId, offset: usize, keep: Keep) -> usize {
    let index = tree.index(text);
    let len = tree.size(text);
    if offset == 0 {
        return index;
    }
    if offset >= len {
        return index + 1;
    }
    let value = tree.text(text).to_string();
    let split = crate::tree::byte_offset(&value, offset);
    let (left, right) = value.split_at(split);
    match keep {
        Keep::Left => {
            tree.set_text(text, left);
            let node = tree.create_text(right);
            tree.insert_after(text, node);
        }
        Keep::Right => {
            let node = tree.create_text(left);
            tree.insert_before(text, node);
            tree.set_text(text, right);
        }
    }
    index + 1
}

/// Split a boundary's text node so the boundary becomes a child index
pub(crate) fn split_to_element(tree: &mut Tree, pos: Position) -> Position {
    if !tree.is_text(pos.node) {
        return pos;
    }
    let Some(parent) = tree.parent(pos.node) else {
        return pos;
    };
    let index = split_text_node(tree, pos.node, pos.offset, Keep::Left);
    Position::new(parent, index)
}

/// Move the children of `node` in its place and drop it
pub(crate) fn unwrap(tree: &mut Tree, node: NodeId) {
    while let Some(child) = tree.first_child(node) {
        tree.insert_before(node, child);
    }
    tree.detach(node);
}

/// Text that renders: anything inside `<pre>`, else non-collapsible chars
pub(crate) fn is_visible_str(tree: &Tree, text: NodeId) -> bool {
    !is_collapsible_only(tree.text(text)) || tree.closest_tag(text, &["pre"]).is_some()
}

/// Give an empty block a placeholder BR so its line keeps its height
pub(crate) fn fill_empty(tree: &mut Tree, node: NodeId) {
    let block = tree.closest_block(node);
    if tree.has_visible_content(block) || tree.is_visible_empty(block) {
        return;
    }
    if block == tree.root() {
        let p = tree.create_element("p");
        tree.append(block, p);
        let br = tree.create_element("br");
        tree.append(p, br);
    } else {
        let br = tree.create_element("br");
        tree.append(block, br);
    }
}

/// Remove `node` and its inline ancestors while they render nothing.
/// Returns the first node that was kept.
pub(crate) fn clear_empty(tree: &mut Tree, node: NodeId) -> NodeId {
    let mut node = node;
    while !tree.is_block(node)
        && !tree.has_visible_content(node)
        && !tree.is_visible_empty(node)
        && !tree.is_unremovable(node)
    {
        let Some(parent) = tree.parent(node) else {
            break;
        };
        tree.detach(node);
        node = parent;
    }
    node
}

/// Replace an element by a new one with another tag, keeping attributes
/// and children
pub(crate) fn set_tag_name(tree: &mut Tree, node: NodeId, tag: &str) -> NodeId {
    if tree.tag(node) == Some(tag) {
        return node;
    }
    let replacement = tree.create_element(tag);
    let attributes = tree.attributes(node).cloned().unwrap_or_default();
    for (name, value) in &attributes {
        tree.set_attribute(replacement, name, Some(value));
    }
    while let Some(child) = tree.first_child(node) {
        tree.append(replacement, child);
    }
    tree.insert_before(node, replacement);
    tree.detach(node);
    replacement
}

/// Positions right before and right after a node
pub(crate) fn boundaries_out(tree: &Tree, node: NodeId) -> [Position; 2] {
    [tree.left_pos(node), tree.right_pos(node)]
}

/// Remove a node, restoring whitespace around it
pub(crate) fn remove_node(tree: &mut Tree, node: NodeId) -> CommandResult {
    if tree.is_unremovable(node) {
        return Err(Violation::Unremovable);
    }
    let restorer = prepare_update(tree, &boundaries_out(tree, node));
    tree.detach(node);
    restorer.restore(tree);
    Ok(())
}

/// Move children `start..end` of `source` to `dest`, removing `source` if
/// it ends up empty. Returns the position before the first moved node.
pub(crate) fn move_nodes(
    tree: &mut Tree,
    dest: Position,
    source: NodeId,
    start: usize,
    end: usize,
) -> Position {
    let end = end.min(tree.size(source));
    let nodes: Vec<NodeId> = tree.children(source)[start.min(end)..end].to_vec();
    if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
        let restore_dest = prepare_update(tree, &[dest]);
        let restore_moved = prepare_update(tree, &[tree.left_pos(*first), tree.right_pos(*last)]);
        let mut index = dest.offset;
        for node in &nodes {
            tree.insert(dest.node, index, *node);
            index = tree.index(*node) + 1;
        }
        restore_dest.restore(tree);
        restore_moved.restore(tree);
    }
    if tree.size(source) == 0 && !tree.is_unremovable(source) && tree.parent(source).is_some() {
        let restorer = prepare_update(tree, &boundaries_out(tree, source));
        tree.detach(source);
        restorer.restore(tree);
    }
    nodes
        .iter()
        .find(|n| tree.parent(**n).is_some())
        .map(|n| tree.left_pos(*n))
        .unwrap_or(dest)
}

pub(crate) fn prev_element_sibling(tree: &Tree, node: NodeId) -> Option<NodeId> {
    let mut sibling = tree.prev_sibling(node);
    while let Some(s) = sibling {
        if tree.is_element(s) {
            return Some(s);
        }
        sibling = tree.prev_sibling(s);
    }
    None
}

pub(crate) fn next_element_sibling(tree: &Tree, node: NodeId) -> Option<NodeId> {
    let mut sibling = tree.next_sibling(node);
    while let Some(s) = sibling {
        if tree.is_element(s) {
            return Some(s);
        }
        sibling = tree.next_sibling(s);
    }
    None
}

/// Nodes touched by the selection in document order, ancestors of the
/// boundaries included. A collapsed selection touches the nodes that
/// strictly contain the caret.
pub(crate) fn traversed_nodes(tree: &Tree, selection: &Selection) -> Vec<NodeId> {
    let (start, end) = selection.ordered(tree);
    tree.descendants(tree.root())
        .into_iter()
        .filter(|node| {
            compare_positions(tree, tree.right_pos(*node), start) == Ordering::Greater
                && compare_positions(tree, tree.left_pos(*node), end) == Ordering::Less
        })
        .collect()
}

/// Add (`Some(true)`), remove (`Some(false)`) or flip (`None`) a class
pub(crate) fn toggle_class(tree: &mut Tree, node: NodeId, class: &str, force: Option<bool>) {
    let current = tree.attr(node, "class").unwrap_or_default().to_string();
    let mut classes: Vec<&str> = current.split_whitespace().collect();
    let present = classes.contains(&class);
    let wanted = force.unwrap_or(!present);
    if wanted == present {
        return;
    }
    if wanted {
        classes.push(class);
    } else {
        classes.retain(|c| *c != class);
    }
    let value = classes.join(" ");
    tree.set_attribute(node, "class", (!value.is_empty()).then_some(value.as_str()));
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

pub(crate) fn style_value(tree: &Tree, node: NodeId, property: &str) -> Option<String> {
    parse_style(tree.attr(node, "style")?)
        .into_iter()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

/// Set or remove one inline style declaration
pub(crate) fn set_style(tree: &mut Tree, node: NodeId, property: &str, value: Option<&str>) {
    let mut declarations = parse_style(tree.attr(node, "style").unwrap_or_default());
    declarations.retain(|(name, _)| name != property);
    if let Some(value) = value {
        declarations.push((property.to_string(), value.to_string()));
    }
    let style: String = declarations
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ");
    tree.set_attribute(node, "style", (!style.is_empty()).then_some(style.as_str()));
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_text_node_sides() {
        let mut f = Fixture::load("<p>[]abcd</p>");
        let p = f.tree.child(f.tree.root(), 0).unwrap();
        let text = f.tree.child(p, 0).unwrap();
        assert_eq!(split_text_node(&mut f.tree, text, 0, Keep::Left), 0);
        assert_eq!(split_text_node(&mut f.tree, text, 4, Keep::Left), 1);
        assert_eq!(split_text_node(&mut f.tree, text, 1, Keep::Right), 1);
        assert_eq!(f.tree.text(text), "bcd");
        assert_eq!(f.tree.size(p), 2);
    }

    #[test]
    fn test_style_helpers() {
        let mut f = Fixture::load(r#"<p style="color: red;">[]a</p>"#);
        let p = f.tree.child(f.tree.root(), 0).unwrap();
        set_style(&mut f.tree, p, "text-align", Some("center"));
        assert_eq!(style_value(&f.tree, p, "text-align").as_deref(), Some("center"));
        assert_eq!(f.tree.attr(p, "style"), Some("color: red; text-align: center;"));
        set_style(&mut f.tree, p, "color", None);
        assert_eq!(f.tree.attr(p, "style"), Some("text-align: center;"));
    }

    #[test]
    fn test_toggle_class() {
        let mut f = Fixture::load(r#"<ul class="a">[]</ul>"#);
        let ul = f.tree.child(f.tree.root(), 0).unwrap();
        toggle_class(&mut f.tree, ul, "o_checklist", None);
        assert_eq!(f.tree.attr(ul, "class"), Some("a o_checklist"));
        toggle_class(&mut f.tree, ul, "a", Some(false));
        assert_eq!(f.tree.attr(ul, "class"), Some("o_checklist"));
    }

    #[test]
    fn test_fill_and_clear_empty() {
        let mut f = Fixture::load("<p>[]<b></b></p>");
        let p = f.tree.child(f.tree.root(), 0).unwrap();
        let b = f.tree.child(p, 0).unwrap();
        assert_eq!(clear_empty(&mut f.tree, b), p);
        fill_empty(&mut f.tree, p);
        assert_eq!(f.tree.inner_html(), "<p><br></p>");
    }
}
