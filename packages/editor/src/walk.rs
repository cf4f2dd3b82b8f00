//! # Directional Path Generator
//!
//! Lazy, side-effect-free walk over the tree starting from a boundary
//! position. Every whitespace and caret computation is built on it.
//!
//! The walk first descends to the deepest node adjacent to the position in
//! the walking direction, then moves sibling by sibling (descending into each
//! sibling's edge leaf) and climbs to the parent when a level is exhausted.
//! Why the walk ended is kept as a [`StopReason`].

use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn inverse(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Why a path stopped yielding nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Reached a block while climbing out of the start container
    BlockOut,
    /// Reached a block while moving across or into siblings
    BlockHit,
    /// Climbed back to the start container of a scoped walk
    OutOfScope,
    /// Nothing left in the tree
    NoNode,
}

/// A boundary: character offset in a text node, child index in an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

impl Tree {
    /// Position right before the node in its parent
    pub fn left_pos(&self, id: NodeId) -> Position {
        Position::new(self.parent(id).unwrap_or(id), self.index(id))
    }

    /// Position right after the node in its parent
    pub fn right_pos(&self, id: NodeId) -> Position {
        Position::new(self.parent(id).unwrap_or(id), self.index(id) + 1)
    }

    pub fn start_pos(&self, id: NodeId) -> Position {
        Position::new(id, 0)
    }

    pub fn end_pos(&self, id: NodeId) -> Position {
        Position::new(id, self.size(id))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathOptions {
    /// Skip nodes reached by climbing to a parent
    pub leaf_only: bool,
    /// Never enter or cross a block
    pub inline_only: bool,
    /// Stop when climbing back to the start container
    pub scoped: bool,
}

impl PathOptions {
    pub fn leaf_inline() -> Self {
        Self {
            leaf_only: true,
            inline_only: true,
            scoped: false,
        }
    }
}

pub struct DomPath<'t> {
    tree: &'t Tree,
    direction: Direction,
    options: PathOptions,
    start: NodeId,
    current: Option<NodeId>,
    moved_up: bool,
    reason: Option<StopReason>,
}

impl<'t> DomPath<'t> {
    pub fn new(tree: &'t Tree, pos: Position, direction: Direction, options: PathOptions) -> Self {
        let mut path = Self {
            tree,
            direction,
            options,
            start: pos.node,
            current: None,
            moved_up: false,
            reason: None,
        };
        let adjacent = match direction {
            Direction::Left => pos
                .offset
                .checked_sub(1)
                .and_then(|i| tree.child(pos.node, i)),
            Direction::Right => tree.child(pos.node, pos.offset),
        };
        match adjacent {
            Some(node) => path.current = Some(path.edge_leaf(node)),
            None => {
                path.moved_up = true;
                path.current = Some(pos.node);
            }
        }
        path
    }

    /// Why the walk ended, once it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason
    }

    /// Deepest leaf on the side facing the walk, never descending into a
    /// block when inline-only
    fn edge_leaf(&self, mut node: NodeId) -> NodeId {
        loop {
            if self.options.inline_only && self.tree.is_block(node) {
                return node;
            }
            let next = match self.direction {
                Direction::Left => self.tree.last_child(node),
                Direction::Right => self.tree.first_child(node),
            };
            match next {
                Some(child) => node = child,
                None => return node,
            }
        }
    }

    fn next_deepest(&self, node: NodeId) -> Option<NodeId> {
        let sibling = match self.direction {
            Direction::Left => self.tree.prev_sibling(node),
            Direction::Right => self.tree.next_sibling(node),
        }?;
        Some(self.edge_leaf(sibling))
    }

    fn stop(&mut self, reason: StopReason) -> Option<NodeId> {
        self.reason.get_or_insert(reason);
        self.current = None;
        None
    }
}

impl Iterator for DomPath<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let Some(node) = self.current else {
                return self.stop(StopReason::NoNode);
            };
            if self.options.inline_only && self.tree.is_block(node) {
                let reason = if self.moved_up {
                    StopReason::BlockOut
                } else {
                    StopReason::BlockHit
                };
                return self.stop(reason);
            }
            if self.options.scoped && node == self.start {
                return self.stop(StopReason::OutOfScope);
            }

            let emit = !(self.options.leaf_only && self.moved_up);
            self.moved_up = false;
            self.current = match self.next_deepest(node) {
                Some(next) => Some(next),
                None => {
                    self.moved_up = true;
                    self.tree.parent(node)
                }
            };
            if emit {
                return Some(node);
            }
        }
    }
}

/// Leaf-only, inline-only walk: the path used by whitespace classification
pub fn leaf_inline_path(tree: &Tree, pos: Position, direction: Direction) -> DomPath<'_> {
    DomPath::new(tree, pos, direction, PathOptions::leaf_inline())
}

/// Next inline leaf after a node (the node itself excluded)
pub fn next_inline_leaf(tree: &Tree, node: NodeId, direction: Direction) -> Option<NodeId> {
    let pos = match direction {
        Direction::Left => tree.left_pos(node),
        Direction::Right => tree.right_pos(node),
    };
    leaf_inline_path(tree, pos, direction).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_parser::parse;

    fn tree(source: &str) -> Tree {
        Tree::adopt_children(&parse(source).unwrap())
    }

    fn texts(tree: &Tree, nodes: impl Iterator<Item = NodeId>) -> Vec<String> {
        nodes
            .map(|n| match tree.tag(n) {
                Some(tag) => format!("<{}>", tag),
                None => tree.text(n).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_right_leaf_walk_stops_at_block() {
        let t = tree("<p>a<b>b<i>c</i></b>d</p><p>e</p>");
        let p = t.child(t.root(), 0).unwrap();
        let mut path = leaf_inline_path(&t, Position::new(p, 0), Direction::Right);
        let nodes: Vec<NodeId> = path.by_ref().collect();
        assert_eq!(texts(&t, nodes.into_iter()), vec!["a", "b", "c", "d"]);
        assert_eq!(path.stop_reason(), Some(StopReason::BlockOut));
    }

    #[test]
    fn test_left_walk_hits_previous_block() {
        let t = tree("<p>a</p>b<i>c</i>");
        let root = t.root();
        let mut path = leaf_inline_path(&t, Position::new(root, 3), Direction::Left);
        let nodes: Vec<NodeId> = path.by_ref().collect();
        assert_eq!(texts(&t, nodes.into_iter()), vec!["c", "b"]);
        assert_eq!(path.stop_reason(), Some(StopReason::BlockHit));
    }

    #[test]
    fn test_full_walk_yields_parents() {
        let t = tree("<p><b>a</b>b</p>");
        let p = t.child(t.root(), 0).unwrap();
        let b = t.child(p, 0).unwrap();
        let options = PathOptions::default();
        let nodes: Vec<NodeId> = DomPath::new(&t, Position::new(b, 1), Direction::Left, options).collect();
        // Without leaf_only every climbed ancestor is yielded as well
        assert_eq!(texts(&t, nodes.into_iter()), vec!["a", "<b>", "<p>", "<div>"]);
    }

    #[test]
    fn test_scoped_walk() {
        let t = tree("<p><b>ab</b>c</p>");
        let p = t.child(t.root(), 0).unwrap();
        let b = t.child(p, 0).unwrap();
        let options = PathOptions {
            scoped: true,
            ..PathOptions::default()
        };
        let mut path = DomPath::new(&t, Position::new(b, 0), Direction::Right, options);
        let nodes: Vec<NodeId> = path.by_ref().collect();
        assert_eq!(texts(&t, nodes.into_iter()), vec!["ab"]);
        assert_eq!(path.stop_reason(), Some(StopReason::OutOfScope));
    }

    #[test]
    fn test_next_inline_leaf() {
        let t = tree("<p>a<br>b</p>");
        let p = t.child(t.root(), 0).unwrap();
        let a = t.child(p, 0).unwrap();
        let br = next_inline_leaf(&t, a, Direction::Right).unwrap();
        assert!(t.is_br(br));
        assert_eq!(next_inline_leaf(&t, a, Direction::Left), None);
    }
}
