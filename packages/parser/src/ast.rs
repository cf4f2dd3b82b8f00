use std::collections::BTreeMap;

/// Elements that never have children and serialize without a closing tag
pub const VOID_TAGS: &[&str] = &["br", "img", "hr", "input", "wbr"];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Owned markup tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Markup>,
    },
    Text {
        value: String,
    },
}

impl Markup {
    pub fn element(tag: impl Into<String>) -> Self {
        Markup::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Markup::Text {
            value: value.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Markup::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: Markup) -> Self {
        if let Markup::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn children(&self) -> &[Markup] {
        match self {
            Markup::Element { children, .. } => children,
            Markup::Text { .. } => &[],
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Markup::Element { tag, .. } => Some(tag),
            Markup::Text { .. } => None,
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Markup::Text { value } => out.push_str(value),
            Markup::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Location of a caret marker: child-index path from the fixture roots to
/// the container, plus an offset (chars for text, child index for elements)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPos {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Parsed document plus the caret markers found in it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fixture {
    pub nodes: Vec<Markup>,
    pub anchor: Option<MarkerPos>,
    pub focus: Option<MarkerPos>,
}
