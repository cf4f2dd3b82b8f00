//! # Selection
//!
//! Anchor/focus boundaries over the live tree, plus conversion to and from
//! oid-based snapshots (history) and child-index paths (fixture markers).

use crate::mutations::CursorSnapshot;
use crate::tree::{NodeId, Tree};
use crate::walk::{DomPath, Direction, PathOptions, Position};
use scribe_parser::MarkerPos;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(pos: Position) -> Self {
        Self {
            anchor: pos,
            focus: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Boundaries in document order
    pub fn ordered(&self, tree: &Tree) -> (Position, Position) {
        match compare_positions(tree, self.anchor, self.focus) {
            Ordering::Greater => (self.focus, self.anchor),
            _ => (self.anchor, self.focus),
        }
    }

    /// Both boundaries point into the attached tree with valid offsets
    pub fn is_valid(&self, tree: &Tree) -> bool {
        [self.anchor, self.focus]
            .iter()
            .all(|p| tree.is_connected(p.node) && p.offset <= tree.size(p.node))
    }

    pub fn snapshot(&self, tree: &Tree) -> CursorSnapshot {
        CursorSnapshot {
            anchor_node: tree.oid(self.anchor.node),
            anchor_offset: self.anchor.offset,
            focus_node: tree.oid(self.focus.node),
            focus_offset: self.focus.offset,
        }
    }

    /// Resolve a snapshot against the live tree; offsets are clamped
    pub fn from_snapshot(tree: &Tree, snapshot: &CursorSnapshot) -> Option<Self> {
        let resolve = |oid, offset: usize| {
            let node = tree.live_by_oid(oid)?;
            Some(Position::new(node, offset.min(tree.size(node))))
        };
        Some(Self {
            anchor: resolve(snapshot.anchor_node, snapshot.anchor_offset)?,
            focus: resolve(snapshot.focus_node, snapshot.focus_offset)?,
        })
    }

    pub fn from_markers(tree: &Tree, anchor: &MarkerPos, focus: &MarkerPos) -> Option<Self> {
        Some(Self {
            anchor: position_from_marker(tree, anchor)?,
            focus: position_from_marker(tree, focus)?,
        })
    }

    pub fn to_markers(&self, tree: &Tree) -> (MarkerPos, MarkerPos) {
        (marker_from_position(tree, self.anchor), marker_from_position(tree, self.focus))
    }

    /// Move both boundaries to meaningful caret locations
    pub fn normalize(&self, tree: &Tree) -> Self {
        Self {
            anchor: normalize_position(tree, self.anchor),
            focus: normalize_position(tree, self.focus),
        }
    }
}

/// Child-index path from the root, with the offset appended
fn position_key(tree: &Tree, pos: Position) -> Vec<usize> {
    let mut key: Vec<usize> = tree
        .ancestors(pos.node)
        .iter()
        .rev()
        .skip(1)
        .map(|n| tree.index(*n))
        .collect();
    key.push(pos.offset);
    key
}

pub fn compare_positions(tree: &Tree, a: Position, b: Position) -> Ordering {
    position_key(tree, a).cmp(&position_key(tree, b))
}

fn position_from_marker(tree: &Tree, marker: &MarkerPos) -> Option<Position> {
    let mut node = tree.root();
    for index in &marker.path {
        node = tree.child(node, *index)?;
    }
    Some(Position::new(node, marker.offset.min(tree.size(node))))
}

fn marker_from_position(tree: &Tree, pos: Position) -> MarkerPos {
    let mut key = position_key(tree, pos);
    let offset = key.pop().unwrap_or(0);
    MarkerPos { path: key, offset }
}

fn scoped_leaf(tree: &Tree, pos: Position, direction: Direction) -> Option<NodeId> {
    let options = PathOptions {
        leaf_only: true,
        inline_only: true,
        scoped: true,
    };
    DomPath::new(tree, pos, direction, options).next()
}

fn is_caret_stop(tree: &Tree, node: NodeId) -> bool {
    tree.is_br(node) || tree.is_visible_empty(node)
}

/// Prefer the end of the inline leaf on the left, else the start of the one
/// on the right. Carets never sit inside void elements.
pub fn normalize_position(tree: &Tree, pos: Position) -> Position {
    let mut pos = pos;
    if tree.is_element(pos.node) && is_caret_stop(tree, pos.node) && tree.parent(pos.node).is_some() {
        pos = if pos.offset > 0 {
            tree.right_pos(pos.node)
        } else {
            tree.left_pos(pos.node)
        };
    }
    if tree.is_text(pos.node) {
        return Position::new(pos.node, pos.offset.min(tree.size(pos.node)));
    }

    let left = scoped_leaf(tree, pos, Direction::Left);
    let mut left_stop = false;
    if let Some(leaf) = left {
        left_stop = is_caret_stop(tree, leaf);
        pos = if left_stop {
            tree.right_pos(leaf)
        } else {
            tree.end_pos(leaf)
        };
    }
    if left.is_none() || left_stop {
        if let Some(leaf) = scoped_leaf(tree, pos, Direction::Right) {
            let right_stop = is_caret_stop(tree, leaf);
            if !(left_stop && right_stop) {
                pos = if right_stop {
                    tree.left_pos(leaf)
                } else {
                    tree.start_pos(leaf)
                };
            }
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_parser::{parse_fixture, Serializer};

    fn load(source: &str) -> (Tree, Selection) {
        let fixture = parse_fixture(source).unwrap();
        let tree = Tree::adopt_children(&fixture.nodes);
        let selection = Selection::from_markers(
            &tree,
            fixture.anchor.as_ref().unwrap(),
            fixture.focus.as_ref().unwrap(),
        )
        .unwrap();
        (tree, selection)
    }

    fn render(tree: &Tree, selection: &Selection) -> String {
        let (anchor, focus) = selection.to_markers(tree);
        Serializer::with_markers(Some(&anchor), Some(&focus)).serialize(&tree.inner_markup())
    }

    #[test]
    fn test_marker_roundtrip() {
        for source in ["<p>ab[]cd</p>", "<p>[]<br></p>", "<p>a[b</p><p>c]d</p>"] {
            let (tree, selection) = load(source);
            assert_eq!(render(&tree, &selection), source);
        }
    }

    #[test]
    fn test_ordered() {
        let (tree, selection) = load("<p>a[b</p><p>c]d</p>");
        let reversed = Selection::new(selection.focus, selection.anchor);
        assert_eq!(reversed.ordered(&tree), (selection.anchor, selection.focus));
    }

    #[test]
    fn test_normalize_into_text() {
        let (tree, selection) = load("<p>ab[]<b>cd</b></p>");
        // Already inside "ab"
        assert_eq!(render(&tree, &selection.normalize(&tree)), "<p>ab[]<b>cd</b></p>");

        let (tree, selection) = load("<p><b>ab</b>[]<i>cd</i></p>");
        assert_eq!(render(&tree, &selection.normalize(&tree)), "<p><b>ab[]</b><i>cd</i></p>");

        let (tree, selection) = load("<p>[]<i>cd</i></p>");
        assert_eq!(render(&tree, &selection.normalize(&tree)), "<p><i>[]cd</i></p>");
    }

    #[test]
    fn test_normalize_keeps_caret_before_br() {
        let (tree, selection) = load("<p>[]<br></p>");
        assert_eq!(render(&tree, &selection.normalize(&tree)), "<p>[]<br></p>");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (tree, selection) = load("<p>ab[]cd</p>");
        let snapshot = selection.snapshot(&tree);
        assert_eq!(Selection::from_snapshot(&tree, &snapshot), Some(selection));
    }
}
