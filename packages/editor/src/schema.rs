//! Node kinds and rendering predicates.
//!
//! Classification is purely tag and attribute based: the engine never sees
//! computed styles, so "block" means a block-level tag.

use crate::tree::{NodeId, Tree};

pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "ul",
];

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

pub const LIST_TAGS: &[&str] = &["ul", "ol"];

/// Tags that are never split or merged across
pub const UNBREAKABLE_TAGS: &[&str] = &[
    "thead", "tbody", "tfoot", "tr", "th", "td", "section", "div",
];

/// Leaf elements that render something by themselves
pub const MEDIA_TAGS: &[&str] = &["img", "hr", "input", "iframe", "video", "audio"];

pub const NBSP: char = '\u{00A0}';
pub const ZWS: char = '\u{200B}';

/// Closed set of behaviors the command dispatcher switches over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    GenericBlock,
    ListItem,
    Heading,
    Quote,
    Preformatted,
    LineBreak,
    GenericInline,
}

/// Whitespace that HTML collapses (NBSP excluded)
pub fn is_collapsible(c: char) -> bool {
    c != NBSP && c.is_whitespace()
}

/// Text with ZWS removed
pub fn strip_zws(s: &str) -> String {
    s.chars().filter(|c| *c != ZWS).collect()
}

/// True when every char is collapsible whitespace (or ZWS)
pub fn is_collapsible_only(s: &str) -> bool {
    s.chars().all(|c| c == ZWS || is_collapsible(c))
}

impl Tree {
    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.tag(id) {
            None => NodeKind::Text,
            Some("br") => NodeKind::LineBreak,
            Some("li") => NodeKind::ListItem,
            Some("blockquote") => NodeKind::Quote,
            Some("pre") => NodeKind::Preformatted,
            Some(tag) if HEADING_TAGS.contains(&tag) => NodeKind::Heading,
            Some(tag) if BLOCK_TAGS.contains(&tag) => NodeKind::GenericBlock,
            Some(_) => NodeKind::GenericInline,
        }
    }

    pub fn is_block(&self, id: NodeId) -> bool {
        id == self.root() || self.has_tag(id, BLOCK_TAGS)
    }

    pub fn is_br(&self, id: NodeId) -> bool {
        self.tag(id) == Some("br")
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        self.has_tag(id, LIST_TAGS)
    }

    /// Leaf element that renders without text (images, icons)
    pub fn is_visible_empty(&self, id: NodeId) -> bool {
        self.has_tag(id, MEDIA_TAGS) || self.is_icon(id)
    }

    pub fn is_icon(&self, id: NodeId) -> bool {
        self.has_class(id, "fa")
    }

    pub fn is_unbreakable(&self, id: NodeId) -> bool {
        if id == self.root() {
            return true;
        }
        let Some(tag) = self.tag(id) else {
            return false;
        };
        UNBREAKABLE_TAGS.contains(&tag)
            || self.extra_unbreakable.iter().any(|t| t == tag)
            || self.has_class(id, "oe_unbreakable")
            || self.attr(id, "data-oe-unbreakable").is_some()
    }

    pub fn is_unremovable(&self, id: NodeId) -> bool {
        id == self.root()
            || self.has_class(id, "oe_unremovable")
            || self.attr(id, "data-oe-unremovable").is_some()
    }

    /// Add tags to the unbreakable set (from config)
    pub fn set_extra_unbreakable(&mut self, tags: &[String]) {
        self.extra_unbreakable = tags.iter().map(|t| t.to_ascii_lowercase()).collect();
    }

    /// Closest inclusive block ancestor
    pub fn closest_block(&self, id: NodeId) -> NodeId {
        self.closest(id, |t, n| t.is_element(n) && t.is_block(n))
            .unwrap_or_else(|| self.root())
    }

    /// Text node with something other than collapsible whitespace
    pub fn is_visible_text(&self, id: NodeId) -> bool {
        self.is_text(id) && !is_collapsible_only(self.text(id))
    }

    /// Has visible text, a BR or a visible leaf anywhere inside
    pub fn has_visible_content(&self, id: NodeId) -> bool {
        let mut nodes = self.descendants(id);
        nodes.push(id);
        nodes.into_iter().any(|n| {
            self.is_visible_text(n)
                || (n != id && self.is_br(n))
                || self.is_visible_empty(n)
        })
    }

    /// Text content without ZWS/collapsible whitespace is non-empty
    pub fn has_visible_text(&self, id: NodeId) -> bool {
        self.text_content(id)
            .chars()
            .any(|c| c != ZWS && !is_collapsible(c))
    }

    /// Deepest first descendant (the node itself when it has no children)
    pub fn first_leaf(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(child) = self.first_child(node) {
            node = child;
        }
        node
    }

    pub fn last_leaf(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(child) = self.last_child(node) {
            node = child;
        }
        node
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
    fn test_kinds() {
        let t = tree("<h2>a</h2><blockquote>b</blockquote><pre>c</pre><ul><li>d</li></ul><p>e<br><b>f</b></p>");
        let root = t.root();
        let kinds: Vec<NodeKind> = t.children(root).iter().map(|c| t.kind(*c)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Heading,
                NodeKind::Quote,
                NodeKind::Preformatted,
                NodeKind::GenericBlock,
                NodeKind::GenericBlock,
            ]
        );
        let p = t.child(root, 4).unwrap();
        assert_eq!(t.kind(t.child(p, 0).unwrap()), NodeKind::Text);
        assert_eq!(t.kind(t.child(p, 1).unwrap()), NodeKind::LineBreak);
        assert_eq!(t.kind(t.child(p, 2).unwrap()), NodeKind::GenericInline);
    }

    #[test]
    fn test_protection_predicates() {
        let mut t = tree(r#"<table><tbody><tr><td>a</td></tr></tbody></table><p class="x oe_unbreakable">b</p><p data-oe-unremovable="">c</p><blockquote>d</blockquote>"#);
        let root = t.root();
        assert!(t.is_unbreakable(root));
        assert!(t.is_unremovable(root));
        let td = t.descendants(root).into_iter().find(|n| t.tag(*n) == Some("td")).unwrap();
        assert!(t.is_unbreakable(td));
        assert!(t.is_unbreakable(t.child(root, 1).unwrap()));
        assert!(t.is_unremovable(t.child(root, 2).unwrap()));

        let quote = t.child(root, 3).unwrap();
        assert!(!t.is_unbreakable(quote));
        t.set_extra_unbreakable(&["BLOCKQUOTE".to_string()]);
        assert!(t.is_unbreakable(quote));
    }

    #[test]
    fn test_whitespace_helpers() {
        assert!(is_collapsible(' '));
        assert!(!is_collapsible(NBSP));
        assert!(is_collapsible_only(" \n\u{200B}"));
        assert!(!is_collapsible_only(" \u{00A0}"));
        assert_eq!(strip_zws("a\u{200B}b"), "ab");
    }
}
