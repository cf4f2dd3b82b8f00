//! List commands: indent, outdent and list toggling.
//!
//! Nested lists live in a wrapper item: `<li class="oe-nested"><ul>..</ul></li>`.
//! Checklists are `<ul class="o_checklist">`.

use super::insert::insert_text;
use super::{
    fill_empty, prev_element_sibling, set_tag_name, toggle_class, traversed_nodes, EditContext,
};
use crate::errors::CommandResult;
use crate::schema::NBSP;
use crate::tree::{NodeId, Tree};
use crate::walk::Position;
use serde::{Deserialize, Serialize};

pub const NESTED_CLASS: &str = "oe-nested";
pub const CHECKLIST_CLASS: &str = "o_checklist";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListMode {
    #[serde(rename = "UL")]
    Unordered,
    #[serde(rename = "OL")]
    Ordered,
    #[serde(rename = "CL")]
    Checklist,
}

impl ListMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UL" => Some(ListMode::Unordered),
            "OL" => Some(ListMode::Ordered),
            "CL" => Some(ListMode::Checklist),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ListMode::Ordered => "ol",
            ListMode::Unordered | ListMode::Checklist => "ul",
        }
    }

    fn of(tree: &Tree, list: NodeId) -> Self {
        if tree.tag(list) == Some("ol") {
            ListMode::Ordered
        } else if tree.has_class(list, CHECKLIST_CLASS) {
            ListMode::Checklist
        } else {
            ListMode::Unordered
        }
    }
}

fn create_list(tree: &mut Tree, mode: ListMode) -> NodeId {
    let list = tree.create_element(mode.tag());
    if mode == ListMode::Checklist {
        tree.set_attribute(list, "class", Some(CHECKLIST_CLASS));
    }
    list
}

fn parent_list(tree: &Tree, li: NodeId) -> Option<NodeId> {
    tree.parent(li).filter(|p| tree.is_list(*p))
}

/// List items touched by the selection, outermost first
fn selected_items(ctx: &EditContext<'_>) -> Vec<NodeId> {
    let tree = &*ctx.tree;
    let mut items: Vec<NodeId> = Vec::new();
    for node in traversed_nodes(tree, ctx.selection) {
        if let Some(li) = tree.closest_tag(node, &["li"]) {
            if !items.contains(&li) && !tree.has_class(li, NESTED_CLASS) {
                items.push(li);
            }
        }
    }
    items
}

/// Indent the selected list items, or insert a tab's worth of spaces
pub fn tab(ctx: &mut EditContext<'_>) -> CommandResult {
    let items = selected_items(ctx);
    if items.is_empty() {
        let spaces: String = std::iter::repeat(NBSP).take(ctx.tab_width).collect();
        return insert_text(ctx, &spaces);
    }
    for li in items {
        li_tab(ctx, li);
    }
    Ok(())
}

/// Outdent the selected list items
pub fn shift_tab(ctx: &mut EditContext<'_>) -> CommandResult {
    for li in selected_items(ctx) {
        if ctx.tree.is_connected(li) {
            li_shift_tab(ctx, li)?;
        }
    }
    Ok(())
}

fn li_tab(ctx: &mut EditContext<'_>, li: NodeId) {
    let tree = &mut *ctx.tree;
    let Some(list) = parent_list(tree, li) else {
        return;
    };
    let previous_nested = prev_element_sibling(tree, li)
        .filter(|prev| tree.has_class(*prev, NESTED_CLASS))
        .and_then(|prev| tree.last_child(prev))
        .filter(|nested| tree.is_list(*nested));
    if let Some(nested) = previous_nested {
        tree.append(nested, li);
        return;
    }

    let wrapper = tree.create_element("li");
    tree.set_attribute(wrapper, "class", Some(NESTED_CLASS));
    let tag = tree.tag(list).unwrap_or("ul").to_string();
    let nested = tree.create_element(&tag);
    if tree.has_class(list, CHECKLIST_CLASS) {
        tree.set_attribute(nested, "class", Some(CHECKLIST_CLASS));
    }
    tree.append(wrapper, nested);
    tree.insert_before(li, wrapper);
    tree.append(nested, li);
}

/// Move an item one level up. Returns the item when it is still in a list,
/// `None` once it left the outermost list and became paragraphs.
pub(crate) fn li_shift_tab(ctx: &mut EditContext<'_>, li: NodeId) -> CommandResult<Option<NodeId>> {
    let tree = &mut *ctx.tree;
    let Some(list) = parent_list(tree, li) else {
        return Ok(None);
    };
    let outer_item = tree.parent(list).filter(|p| tree.tag(*p) == Some("li"));

    // Items after this one stay at their level in a list of their own
    if tree.next_sibling(li).is_some() {
        let rest = tree.clone_shallow(list);
        while let Some(next) = tree.next_sibling(li) {
            tree.append(rest, next);
        }
        match outer_item {
            Some(outer) => {
                let wrapper = tree.create_element("li");
                tree.set_attribute(wrapper, "class", Some(NESTED_CLASS));
                tree.append(wrapper, rest);
                tree.insert_after(outer, wrapper);
            }
            None => tree.insert_after(list, rest),
        }
    }

    if let Some(outer) = outer_item {
        let remove_outer = prev_element_sibling(tree, li).is_none()
            && prev_element_sibling(tree, list).is_none();
        tree.insert_after(outer, li);
        if remove_outer {
            if tree.has_class(outer, NESTED_CLASS) {
                tree.detach(outer);
            } else {
                tree.detach(list);
            }
        }
        fill_empty(tree, li);
        return Ok(Some(li));
    }

    // Leaving the outermost list: inline runs become paragraphs, blocks move
    // out as they are
    let dir = tree.attr(list, "dir").map(str::to_string);
    let new_paragraph = |tree: &mut Tree| {
        let p = tree.create_element("p");
        if let Some(dir) = &dir {
            tree.set_attribute(p, "dir", Some(dir));
        }
        p
    };
    let mut anchor = list;
    let mut first_out: Option<NodeId> = None;
    let mut paragraph: Option<NodeId> = None;
    while let Some(child) = tree.first_child(li) {
        if tree.is_block(child) {
            if let Some(p) = paragraph.take().filter(|p| tree.has_visible_content(*p)) {
                tree.insert_after(anchor, p);
                anchor = p;
                first_out.get_or_insert(p);
            }
            tree.insert_after(anchor, child);
            anchor = child;
            first_out.get_or_insert(child);
        } else {
            let p = match paragraph {
                Some(p) => p,
                None => {
                    let p = new_paragraph(tree);
                    paragraph = Some(p);
                    p
                }
            };
            tree.append(p, child);
        }
    }
    if let Some(p) = paragraph.filter(|p| first_out.is_none() || tree.has_visible_content(*p)) {
        tree.insert_after(anchor, p);
        first_out.get_or_insert(p);
    }
    let first_out = match first_out {
        Some(node) => node,
        None => {
            let p = new_paragraph(tree);
            tree.insert_after(anchor, p);
            p
        }
    };
    fill_empty(tree, first_out);

    tree.detach(li);
    if !tree.children(list).iter().any(|c| tree.is_element(*c)) {
        tree.detach(list);
    }
    ctx.repair_cursor(first_out);
    Ok(None)
}

/// Turn the block under the caret into a list item, switch the list type,
/// or take the item out of its list when it already has the requested type
pub fn toggle_list(
    ctx: &mut EditContext<'_>,
    node: NodeId,
    offset: usize,
    mode: ListMode,
) -> CommandResult {
    if let Some(li) = ctx.tree.closest_tag(node, &["li"]) {
        return li_toggle_list(ctx, li, mode);
    }
    let tree = &mut *ctx.tree;
    let block = tree.closest_block(node);

    if tree.is_unbreakable(block) {
        // Inline content straight in a container: wrap the run around the caret
        let calling = if node == block {
            tree.child(block, offset)
                .or_else(|| offset.checked_sub(1).and_then(|i| tree.child(block, i)))
        } else {
            tree.ancestors(node)
                .into_iter()
                .find(|n| tree.parent(*n) == Some(block))
        };
        let Some(calling) = calling else {
            return Ok(());
        };
        if tree.is_block(calling) {
            return toggle_list(ctx, calling, 0, mode);
        }
        let mut first = calling;
        while let Some(prev) = tree.prev_sibling(first).filter(|n| !tree.is_block(*n)) {
            first = prev;
        }
        let mut group = vec![first];
        while let Some(next) = group
            .last()
            .and_then(|last| tree.next_sibling(*last))
            .filter(|n| !tree.is_block(*n))
        {
            group.push(next);
        }
        let list = create_list(tree, mode);
        let li = tree.create_element("li");
        tree.append(list, li);
        tree.insert_before(first, list);
        for item in group {
            tree.append(li, item);
        }
        ctx.repair_cursor(li);
        return Ok(());
    }

    let list = create_list(tree, mode);
    let li = tree.create_element("li");
    tree.append(list, li);
    if tree.tag(block) == Some("p") {
        let attributes = tree.attributes(block).cloned().unwrap_or_default();
        for (name, value) in &attributes {
            if name == "class" {
                let merged = match tree.attr(list, "class") {
                    Some(existing) => format!("{} {}", existing, value),
                    None => value.clone(),
                };
                tree.set_attribute(list, "class", Some(&merged));
            } else {
                tree.set_attribute(list, name, Some(value));
            }
        }
        while let Some(child) = tree.first_child(block) {
            tree.append(li, child);
        }
        tree.insert_after(block, list);
        let caret_in_block = ctx.selection.focus.node == block;
        tree.detach(block);
        if caret_in_block {
            let offset = ctx.selection.focus.offset.min(ctx.tree.size(li));
            ctx.set_cursor(Position::new(li, offset));
        }
    } else {
        if let Some(dir) = tree.attr(block, "dir").map(str::to_string) {
            tree.set_attribute(list, "dir", Some(&dir));
        }
        tree.insert_after(block, list);
        tree.append(li, block);
    }
    ctx.repair_cursor(li);
    Ok(())
}

fn li_toggle_list(ctx: &mut EditContext<'_>, li: NodeId, mode: ListMode) -> CommandResult {
    let Some(list) = parent_list(ctx.tree, li) else {
        return Ok(());
    };
    let current = ListMode::of(ctx.tree, list);
    if current == mode {
        let mut item = Some(li);
        while let Some(next) = item {
            item = li_shift_tab(ctx, next)?;
        }
        return Ok(());
    }
    match (current, mode) {
        (_, ListMode::Checklist) => {
            toggle_class(ctx.tree, list, CHECKLIST_CLASS, Some(true));
            set_tag_name(ctx.tree, list, "ul");
        }
        (ListMode::Checklist, _) => {
            toggle_class(ctx.tree, list, CHECKLIST_CLASS, Some(false));
            set_tag_name(ctx.tree, list, mode.tag());
        }
        _ => {
            set_tag_name(ctx.tree, list, mode.tag());
        }
    }
    ctx.repair_cursor(li);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::apply;
    use super::super::Command;
    use super::ListMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toggle_paragraph_into_list_and_back() {
        let listed = apply("<p>[]ab</p>", Command::ToggleList(ListMode::Unordered));
        assert_eq!(listed, "<ul><li>[]ab</li></ul>");
        assert_eq!(
            apply(&listed, Command::ToggleList(ListMode::Unordered)),
            "<p>[]ab</p>"
        );
    }

    #[test]
    fn test_toggle_switches_list_type() {
        assert_eq!(
            apply("<ul><li>[]ab</li></ul>", Command::ToggleList(ListMode::Ordered)),
            "<ol><li>[]ab</li></ol>"
        );
        assert_eq!(
            apply("<ol><li>[]ab</li></ol>", Command::ToggleList(ListMode::Checklist)),
            r#"<ul class="o_checklist"><li>[]ab</li></ul>"#
        );
        assert_eq!(
            apply(
                r#"<ul class="o_checklist"><li>[]ab</li></ul>"#,
                Command::ToggleList(ListMode::Unordered)
            ),
            "<ul><li>[]ab</li></ul>"
        );
    }

    #[test]
    fn test_toggle_heading_wraps_block() {
        assert_eq!(
            apply("<h1>[]ab</h1>", Command::ToggleList(ListMode::Ordered)),
            "<ol><li><h1>[]ab</h1></li></ol>"
        );
    }

    #[test]
    fn test_tab_nests_item() {
        assert_eq!(
            apply("<ul><li>a</li><li>[]b</li></ul>", Command::Tab),
            r#"<ul><li>a</li><li class="oe-nested"><ul><li>[]b</li></ul></li></ul>"#
        );
    }

    #[test]
    fn test_tab_joins_previous_nested_list() {
        assert_eq!(
            apply(
                r#"<ul><li class="oe-nested"><ul><li>a</li></ul></li><li>[]b</li></ul>"#,
                Command::Tab
            ),
            r#"<ul><li class="oe-nested"><ul><li>a</li><li>[]b</li></ul></li></ul>"#
        );
    }

    #[test]
    fn test_shift_tab_unnests_item() {
        assert_eq!(
            apply(
                r#"<ul><li>a</li><li class="oe-nested"><ul><li>[]b</li></ul></li></ul>"#,
                Command::ShiftTab
            ),
            "<ul><li>a</li><li>[]b</li></ul>"
        );
    }

    #[test]
    fn test_shift_tab_splits_list() {
        assert_eq!(
            apply("<ul><li>a</li><li>[]b</li><li>c</li></ul>", Command::ShiftTab),
            "<ul><li>a</li></ul><p>[]b</p><ul><li>c</li></ul>"
        );
    }

    #[test]
    fn test_tab_outside_list_inserts_spaces() {
        assert_eq!(
            apply("<p>a[]b</p>", Command::Tab),
            "<p>a&nbsp;&nbsp;&nbsp;&nbsp;[]b</p>"
        );
    }

    #[test]
    fn test_enter_in_empty_nested_item_outdents_with_placeholder() {
        assert_eq!(
            apply(
                r#"<ul><li>a</li><li class="oe-nested"><ul><li>b</li><li>[]</li></ul></li></ul>"#,
                Command::Enter
            ),
            r#"<ul><li>a</li><li class="oe-nested"><ul><li>b</li></ul></li><li>[]<br></li></ul>"#
        );
    }

    #[test]
    fn test_backspace_at_first_item_start_outdents() {
        assert_eq!(
            apply("<ul><li>[]ab</li><li>c</li></ul>", Command::DeleteBackward),
            "<p>[]ab</p><ul><li>c</li></ul>"
        );
    }
}
