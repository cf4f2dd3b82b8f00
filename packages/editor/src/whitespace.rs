//! # Whitespace and Line-Break Restoration
//!
//! Keeps an edit from being observable as a layout change. Before a
//! mutation, [`prepare_update`] classifies both sides of each boundary the
//! command is about to touch. After it, [`Restorer::restore`] re-classifies
//! from the remembered anchors and, when the visible situation changed,
//! applies the matching rule: switch an edge space between a plain space and
//! U+00A0, or duplicate/remove a line break.
//!
//! ## Rule precedence
//!
//! Several rules can match one `(direction, before, after)` triple. Each rule
//! weighs as many points as keys it sets; matches are merged from lowest to
//! highest weight, so the most specific rule wins key by key.

use crate::schema::{is_collapsible, is_collapsible_only, NBSP};
use crate::state::{classify, classify_with, is_fake_line_break, CType, State};
use crate::tree::{NodeId, Tree};
use crate::walk::{leaf_inline_path, Direction, Position};

/// Correction to apply next to a boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rule {
    /// `Some(true)`: the edge space must show (NBSP); `Some(false)`: collapse it
    pub space_visibility: Option<bool>,
    /// `Some(true)`: duplicate the adjacent BR; `Some(false)`: remove it
    pub br_visibility: Option<bool>,
    /// Only remove the BR when it is a fake line break
    pub fake_br_only: bool,
}

impl Rule {
    pub fn is_noop(&self) -> bool {
        self.space_visibility.is_none() && self.br_visibility.is_none()
    }

    const fn space(visible: bool) -> Self {
        Self {
            space_visibility: Some(visible),
            br_visibility: None,
            fake_br_only: false,
        }
    }

    const fn br(visible: bool, fake_br_only: bool) -> Self {
        Self {
            space_visibility: None,
            br_visibility: Some(visible),
            fake_br_only,
        }
    }
}

struct RuleSpec {
    direction: Option<Direction>,
    before: Option<CType>,
    after: Option<CType>,
    rule: Rule,
}

impl RuleSpec {
    fn weight(&self) -> usize {
        usize::from(self.direction.is_some())
            + usize::from(self.before.is_some())
            + usize::from(self.after.is_some())
    }

    fn matches(&self, direction: Direction, before: CType, after: CType) -> bool {
        self.direction.map_or(true, |d| d == direction)
            && self.before.map_or(true, |c| c.intersects(before))
            && self.after.map_or(true, |c| c.intersects(after))
    }
}

const fn spec(
    direction: Option<Direction>,
    before: Option<CType>,
    after: Option<CType>,
    rule: Rule,
) -> RuleSpec {
    RuleSpec {
        direction,
        before,
        after,
        rule,
    }
}

const LEFT: Option<Direction> = Some(Direction::Left);
const RIGHT: Option<Direction> = Some(Direction::Right);

const fn c(ctype: CType) -> Option<CType> {
    Some(ctype)
}

static RULES: &[RuleSpec] = &[
    // Content next to a space that now touches a block or a space
    spec(
        None,
        c(CType::CONTENT),
        c(CType::SPACE.union(CType::BLOCK)),
        Rule::space(true),
    ),
    // A space whose neighbor is now a line break
    spec(LEFT, c(CType::INLINE), c(CType::BR), Rule::space(true)),
    spec(RIGHT, c(CType::CONTENT), c(CType::BR), Rule::space(true)),
    spec(
        RIGHT,
        c(CType::BR),
        c(CType::SPACE.union(CType::BLOCK)),
        Rule::space(true),
    ),
    // The content that made a space visible is gone
    spec(None, c(CType::SPACE), None, Rule::space(false)),
    spec(LEFT, c(CType::BR), None, Rule::space(false)),
    spec(
        None,
        c(CType::BLOCK),
        c(CType::INLINE.union(CType::BR)),
        Rule::space(false),
    ),
    // Trailing BR lost what followed it
    spec(RIGHT, c(CType::INLINE), c(CType::BLOCK), Rule::br(true, false)),
    // Doubled BR now followed by something
    spec(
        RIGHT,
        c(CType::BLOCK),
        c(CType::INLINE.union(CType::BR)),
        Rule::br(false, false),
    ),
    // BR now preceded by inline content
    spec(
        LEFT,
        c(CType::BR.union(CType::BLOCK)),
        c(CType::INLINE),
        Rule::br(false, true),
    ),
];

/// Merged rule for a state change
pub fn lookup_rule(direction: Direction, before: CType, after: CType) -> Rule {
    let mut matching: Vec<&RuleSpec> = RULES
        .iter()
        .filter(|r| r.matches(direction, before, after))
        .collect();
    matching.sort_by_key(|r| r.weight());

    let mut merged = Rule::default();
    for spec in matching {
        if spec.rule.space_visibility.is_some() {
            merged.space_visibility = spec.rule.space_visibility;
        }
        if spec.rule.br_visibility.is_some() {
            merged.br_visibility = spec.rule.br_visibility;
            merged.fake_br_only = spec.rule.fake_br_only;
        }
    }
    merged
}

/// States captured before a mutation
#[derive(Debug, Clone, Default)]
#[must_use = "restore() must run once the mutation is done"]
pub struct Restorer {
    states: Vec<State>,
}

/// Classify both sides of every boundary; right-most boundaries first so
/// their sides are restored before the left ones
pub fn prepare_update(tree: &Tree, positions: &[Position]) -> Restorer {
    let mut states = Vec::with_capacity(positions.len() * 2);
    for pos in positions.iter().rev() {
        let left = classify(tree, *pos, Direction::Left);
        let right = classify_with(tree, *pos, Direction::Right, Some(left.ctype));
        states.push(left);
        states.push(right);
    }
    Restorer { states }
}

impl Restorer {
    pub fn restore(self, tree: &mut Tree) {
        for state in self.states {
            restore_state(tree, state);
        }
    }
}

/// Re-classify from a remembered anchor and enforce the rule for the change
pub fn restore_state(tree: &mut Tree, state: State) -> Rule {
    let Some(anchor) = state.anchor else {
        return Rule::default();
    };
    if tree.parent(anchor).is_none() || !tree.is_connected(anchor) {
        return Rule::default();
    }
    let pos = match state.direction {
        Direction::Left => tree.left_pos(anchor),
        Direction::Right => tree.right_pos(anchor),
    };
    let after = classify(tree, pos, state.direction).ctype;
    let rule = lookup_rule(state.direction, state.ctype, after);
    if !rule.is_noop() {
        tracing::trace!(direction = ?state.direction, before = ?state.ctype, after = ?after, ?rule, "restoring whitespace");
        enforce_whitespace(tree, pos, state.direction.inverse(), rule);
    }
    rule
}

fn edge_is_space(value: &str, direction: Direction) -> bool {
    match direction {
        Direction::Left => value.chars().next_back().is_some_and(is_collapsible),
        Direction::Right => value.chars().next().is_some_and(is_collapsible),
    }
}

/// Replace the whitespace run on the edge facing the boundary
fn replace_edge_space(value: &str, direction: Direction, replacement: &str) -> String {
    match direction {
        Direction::Left => {
            let kept = value.trim_end_matches(is_collapsible);
            format!("{}{}", kept, replacement)
        }
        Direction::Right => {
            let kept = value.trim_start_matches(is_collapsible);
            format!("{}{}", replacement, kept)
        }
    }
}

/// First BR reachable from `pos`, looking through text that renders nothing
fn adjacent_br(tree: &Tree, pos: Position, direction: Direction) -> Option<NodeId> {
    for node in leaf_inline_path(tree, pos, direction) {
        if tree.is_br(node) {
            return Some(node);
        }
        if !tree.is_text(node) || !is_collapsible_only(tree.text(node)) {
            return None;
        }
    }
    None
}

/// Apply a rule to the first leaves found from `pos` in `direction`
pub fn enforce_whitespace(tree: &mut Tree, pos: Position, direction: Direction, rule: Rule) {
    let mut duplicate = None;
    if let Some(br_visible) = rule.br_visibility {
        if let Some(br) = adjacent_br(tree, pos, direction) {
            if br_visible {
                duplicate = Some(br);
            } else if !rule.fake_br_only || is_fake_line_break(tree, br) {
                tree.detach(br);
            }
        }
    }

    // Spaces are judged against the break before its clone lands
    enforce_space(tree, pos, direction, rule.space_visibility);

    if let Some(br) = duplicate {
        let clone = tree.create_element("br");
        if tree.is_text(pos.node) {
            match direction {
                Direction::Left => tree.insert_after(br, clone),
                Direction::Right => tree.insert_before(br, clone),
            }
        } else {
            tree.insert(pos.node, pos.offset, clone);
        }
    }
}

fn enforce_space(
    tree: &mut Tree,
    pos: Position,
    direction: Direction,
    space_visibility: Option<bool>,
) {
    let mut invisible: Vec<NodeId> = Vec::new();
    let mut visible: Option<NodeId> = None;
    for node in leaf_inline_path(tree, pos, direction) {
        if !tree.is_text(node) {
            break;
        }
        let value = tree.text(node);
        if edge_is_space(value, direction) {
            if !is_collapsible_only(value) {
                visible = Some(node);
                break;
            }
            invisible.push(node);
        } else if !is_collapsible_only(value) {
            break;
        }
    }

    let Some(space_visible) = space_visibility else {
        return;
    };
    if !space_visible {
        for node in &invisible {
            // Emptied rather than removed so offsets held by the command stay valid
            tree.set_text(*node, "");
            unwrap_empty_inline_ancestors(tree, *node);
        }
    }

    let Some(space_node) = visible.or_else(|| invisible.first().copied()) else {
        return;
    };
    let mut space_visible = space_visible;
    if space_visible
        && visible.is_none()
        && classify(tree, tree.right_pos(space_node), Direction::Right)
            .ctype
            .intersects(CType::BLOCK)
        && classify(tree, tree.left_pos(space_node), Direction::Left).ctype != CType::CONTENT
    {
        space_visible = false;
    }
    let replacement = if space_visible {
        NBSP.to_string()
    } else {
        String::new()
    };
    let value = replace_edge_space(tree.text(space_node), direction, &replacement);
    tree.set_text(space_node, &value);
}

/// Hoist a node out of inline ancestors that contain nothing else
fn unwrap_empty_inline_ancestors(tree: &mut Tree, node: NodeId) {
    let Some(parent) = tree.parent(node) else {
        return;
    };
    let mut to_remove: Option<NodeId> = None;
    for ancestor in tree.ancestors(parent) {
        if let Some(empty) = to_remove.take() {
            tree.detach(empty);
        }
        if tree.size(ancestor) == 1 && !tree.is_block(ancestor) {
            tree.insert_after(ancestor, node);
            to_remove = Some(ancestor);
        } else {
            break;
        }
    }
    if let Some(empty) = to_remove {
        tree.detach(empty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_parser::parse;

    fn tree(source: &str) -> Tree {
        Tree::adopt_children(&parse(source).unwrap())
    }

    #[test]
    fn test_most_specific_rule_wins() {
        // {before: SPACE} says collapse, nothing more specific overrides it
        let rule = lookup_rule(Direction::Left, CType::SPACE, CType::BLOCK_INSIDE);
        assert_eq!(rule.space_visibility, Some(false));

        // Only the direction-specific BR rule applies
        let rule = lookup_rule(Direction::Right, CType::BR, CType::BLOCK_INSIDE);
        assert_eq!(rule.space_visibility, Some(true));

        // Content next to a now-block edge keeps its space visible
        let rule = lookup_rule(Direction::Left, CType::CONTENT, CType::BLOCK_OUTSIDE);
        assert_eq!(rule.space_visibility, Some(true));
        assert_eq!(rule.br_visibility, None);
    }

    #[test]
    fn test_br_rules() {
        let rule = lookup_rule(Direction::Right, CType::CONTENT, CType::BLOCK_INSIDE);
        assert_eq!(rule.br_visibility, Some(true));
        let rule = lookup_rule(Direction::Left, CType::BLOCK_INSIDE, CType::CONTENT);
        assert_eq!(rule.br_visibility, Some(false));
        assert!(rule.fake_br_only);
        let rule = lookup_rule(Direction::Left, CType::CONTENT, CType::CONTENT);
        assert!(rule.is_noop());
    }

    #[test]
    fn test_space_becomes_nbsp_at_block_end() {
        // "ab c" loses "c": the space before it would collapse at the block end
        let mut t = tree("<p>ab <b>c</b></p>");
        let p = t.child(t.root(), 0).unwrap();
        let b = t.child(p, 1).unwrap();
        let restorer = prepare_update(&t, &[Position::new(p, 1), Position::new(p, 2)]);
        t.detach(b);
        restorer.restore(&mut t);
        assert_eq!(t.inner_html(), "<p>ab&nbsp;</p>");
    }

    #[test]
    fn test_trailing_br_duplicated() {
        // Removing the text after a BR would leave it invisible
        let mut t = tree("<p>a<br>b</p>");
        let p = t.child(t.root(), 0).unwrap();
        let b = t.child(p, 2).unwrap();
        let restorer = prepare_update(&t, &[Position::new(p, 2), Position::new(p, 3)]);
        t.detach(b);
        restorer.restore(&mut t);
        assert_eq!(t.inner_html(), "<p>a<br><br></p>");
    }

    #[test]
    fn test_trailing_br_duplicated_through_collapsed_space() {
        // The space between the BR and "b" renders nothing once "b" is gone
        let mut t = tree("<p>a<br> <i>b</i></p>");
        let p = t.child(t.root(), 0).unwrap();
        let b = t.child(p, 3).unwrap();
        let restorer = prepare_update(&t, &[Position::new(p, 3), Position::new(p, 4)]);
        t.detach(b);
        restorer.restore(&mut t);
        assert_eq!(t.inner_html(), "<p>a<br><br></p>");
        // The break is added on the caret side of the emptied space
        assert_eq!(t.size(p), 4);
        assert!(t.is_br(t.child(p, 3).unwrap()));
    }

    #[test]
    fn test_fake_br_removed_after_merge() {
        let mut t = tree("<p>a</p><p><br></p>");
        let root = t.root();
        let p1 = t.child(root, 0).unwrap();
        let p2 = t.child(root, 1).unwrap();
        let br = t.child(p2, 0).unwrap();
        let restorer = prepare_update(&t, &[Position::new(p2, 0)]);
        t.append(p1, br);
        t.detach(p2);
        restorer.restore(&mut t);
        assert_eq!(t.inner_html(), "<p>a</p>");
    }

    #[test]
    fn test_enforce_collapses_invisible_space_nodes() {
        let mut t = tree("<p>a<i> </i></p>");
        let p = t.child(t.root(), 0).unwrap();
        enforce_whitespace(&mut t, Position::new(p, 1), Direction::Right, Rule::space(false));
        assert_eq!(t.inner_html(), "<p>a</p>");
    }
}
