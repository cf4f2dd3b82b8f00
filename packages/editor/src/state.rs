//! # Content-Type Classifier
//!
//! Answers "what is visible next to this boundary, in this direction" with a
//! [`CType`], plus the node on the other side of the boundary that anchors
//! the answer so it can be asked again after a mutation.
//!
//! Whitespace follows HTML rendering: a run of collapsible whitespace only
//! shows when visible content sits on the side the run is read from.

use crate::schema::{is_collapsible, is_collapsible_only, strip_zws};
use crate::tree::{NodeId, Tree};
use crate::walk::{leaf_inline_path, next_inline_leaf, Direction, Position, StopReason};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CType: u8 {
        /// Visible text or a visible leaf
        const CONTENT = 1;
        /// Collapsible whitespace that renders as a space
        const SPACE = 2;
        /// A block edge crossed while moving over siblings
        const BLOCK_OUTSIDE = 4;
        /// The edge of the enclosing block
        const BLOCK_INSIDE = 8;
        const BR = 16;

        const INLINE = Self::CONTENT.bits() | Self::SPACE.bits();
        const BLOCK = Self::BLOCK_OUTSIDE.bits() | Self::BLOCK_INSIDE.bits();
    }
}

/// Classification of one side of a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// First node on the opposite side; `None` when that side is empty
    pub anchor: Option<NodeId>,
    pub direction: Direction,
    pub ctype: CType,
}

fn starts_with_space(s: &str) -> bool {
    s.chars().next().is_some_and(is_collapsible)
}

fn ends_with_space(s: &str) -> bool {
    s.chars().next_back().is_some_and(is_collapsible)
}

/// Classify what lies at `pos` looking in `direction`
pub fn classify(tree: &Tree, pos: Position, direction: Direction) -> State {
    classify_with(tree, pos, direction, None)
}

/// Same as [`classify`], reusing an already known left classification when
/// looking right
pub fn classify_with(
    tree: &Tree,
    pos: Position,
    direction: Direction,
    left_ctype: Option<CType>,
) -> State {
    let anchor = leaf_inline_path(tree, pos, direction.inverse()).next();
    let mut path = leaf_inline_path(tree, pos, direction);
    let mut left_ctype = left_ctype;
    let mut seen_space = false;
    let mut ctype = None;

    for node in path.by_ref() {
        if tree.is_text(node) {
            let value = strip_zws(tree.text(node));
            match direction {
                Direction::Left => {
                    if !is_collapsible_only(&value) {
                        ctype = Some(if seen_space {
                            CType::SPACE
                        } else {
                            let content_right = next_inline_leaf(tree, node, Direction::Right)
                                .is_some_and(|leaf| !starts_with_space(&tree.text_content(leaf)));
                            if !content_right && ends_with_space(&value) {
                                CType::SPACE
                            } else {
                                CType::CONTENT
                            }
                        });
                        break;
                    }
                    if !value.is_empty() {
                        seen_space = true;
                    }
                }
                Direction::Right => {
                    if starts_with_space(&value) {
                        let left = *left_ctype
                            .get_or_insert_with(|| classify(tree, pos, Direction::Left).ctype);
                        let content_left = next_inline_leaf(tree, node, Direction::Left)
                            .is_some_and(|leaf| !ends_with_space(&tree.text_content(leaf)));
                        let rct = if !is_collapsible_only(&value) {
                            CType::CONTENT
                        } else {
                            classify(tree, tree.right_pos(node), Direction::Right).ctype
                        };
                        ctype = Some(
                            if left.intersects(CType::CONTENT)
                                && rct.intersects(CType::CONTENT | CType::BR)
                                && !content_left
                            {
                                CType::SPACE
                            } else {
                                rct
                            },
                        );
                        break;
                    }
                    if !value.is_empty() {
                        ctype = Some(CType::CONTENT);
                        break;
                    }
                }
            }
        } else if tree.is_br(node) {
            ctype = Some(CType::BR);
            break;
        } else if tree.is_visible_empty(node) {
            ctype = Some(CType::CONTENT);
            break;
        }
    }

    let ctype = ctype.unwrap_or_else(|| {
        if path.stop_reason() == Some(StopReason::BlockHit) {
            CType::BLOCK_OUTSIDE
        } else {
            CType::BLOCK_INSIDE
        }
    });
    State {
        anchor,
        direction,
        ctype,
    }
}

/// A BR that only keeps its line from collapsing: nothing visible follows
/// it in its block
pub fn is_fake_line_break(tree: &Tree, br: NodeId) -> bool {
    let right = classify(tree, tree.right_pos(br), Direction::Right);
    !right.ctype.intersects(CType::CONTENT | CType::BR)
}
