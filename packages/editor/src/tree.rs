//! # Document Tree
//!
//! Arena-backed tree of text and element nodes.
//!
//! The arena owns every node; an element owns its children through its
//! `children` list and each node keeps a non-owning `parent` index used only
//! for traversal. Detached nodes stay in the arena until the tree is dropped.
//!
//! Every mutating primitive (`insert`, `detach`, `set_text`,
//! `set_attribute`) appends a [`MutationRecord`] to the journal while
//! recording is on and the touched node is attached to the root. Changes
//! made inside a detached subtree surface later, serialized in the `add`
//! record that attaches it. The journal feeds the open history step.

use crate::mutations::{MutationRecord, VNode};
use scribe_parser::{IDGenerator, Markup, Oid};
use std::collections::{BTreeMap, HashMap};

/// Arena index of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeData {
    Text(String),
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    oid: Oid,
    /// Nearest unbreakable ancestor (self included) at last observation
    ouid: Option<Oid>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
    by_oid: HashMap<Oid, NodeId>,
    ids: IDGenerator,
    journal: Vec<MutationRecord>,
    recording: bool,
    pub(crate) extra_unbreakable: Vec<String>,
}

impl Tree {
    /// Adopt an editable root. The root receives oid 1.
    pub fn adopt(root: &Markup) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
            by_oid: HashMap::new(),
            ids: IDGenerator::new(),
            journal: Vec::new(),
            recording: true,
            extra_unbreakable: Vec::new(),
        };
        let root = match root {
            Markup::Element { .. } => tree.build_markup(root),
            Markup::Text { .. } => {
                // A bare text root is wrapped so the root is always an element
                let wrapper = Markup::element("div").with_child(root.clone());
                tree.build_markup(&wrapper)
            }
        };
        tree.root = root;
        tree
    }

    /// Adopt a list of top-level nodes under a fresh `<div>` root
    pub fn adopt_children(nodes: &[Markup]) -> Self {
        let mut root = Markup::element("div");
        for node in nodes {
            root = root.with_child(node.clone());
        }
        Self::adopt(&root)
    }

    fn build_markup(&mut self, markup: &Markup) -> NodeId {
        match markup {
            Markup::Text { value } => self.create_text(value),
            Markup::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(tag);
                if let NodeData::Element { attributes: attrs, .. } = &mut self.slot_mut(id).data {
                    *attrs = attributes.clone();
                }
                for child in children {
                    let child_id = self.build_markup(child);
                    self.link(id, usize::MAX, child_id);
                }
                id
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn oid(&self, id: NodeId) -> Oid {
        self.slot(id).oid
    }

    pub fn by_oid(&self, oid: Oid) -> Option<NodeId> {
        self.by_oid.get(&oid).copied()
    }

    /// Node for `oid` only if it is attached to the root
    pub fn live_by_oid(&self, oid: Oid) -> Option<NodeId> {
        self.by_oid(oid).filter(|id| self.is_connected(*id))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.slot(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.slot(id).data {
            NodeData::Element { children, .. } => children,
            NodeData::Text(_) => &[],
        }
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Index of the node within its parent (0 for detached nodes)
    pub fn index(&self, id: NodeId) -> usize {
        self.parent(id)
            .and_then(|p| self.children(p).iter().position(|c| *c == id))
            .unwrap_or(0)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id);
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.child(parent, self.index(id) + 1)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slot(id).data, NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        !self.is_text(id)
    }

    /// Lowercase tag name, `None` for text nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.tag(id).is_some_and(|t| tags.contains(&t))
    }

    /// Text value, empty for elements
    pub fn text(&self, id: NodeId) -> &str {
        match &self.slot(id).data {
            NodeData::Text(value) => value,
            NodeData::Element { .. } => "",
        }
    }

    pub fn attributes(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match &self.slot(id).data {
            NodeData::Element { attributes, .. } => Some(attributes),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)?.get(name).map(String::as_str)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// Character count for text, child count for elements
    pub fn size(&self, id: NodeId) -> usize {
        match &self.slot(id).data {
            NodeData::Text(value) => value.chars().count(),
            NodeData::Element { children, .. } => children.len(),
        }
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Ancestors starting with the node itself, ending at the topmost parent
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Closest inclusive ancestor satisfying `pred`
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        self.ancestors(id).into_iter().find(|n| pred(self, *n))
    }

    /// Closest inclusive ancestor with one of the given tags
    pub fn closest_tag(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        self.closest(id, |t, n| t.has_tag(n, tags))
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.slot(id).data {
            NodeData::Text(value) => out.push_str(value),
            NodeData::Element { children, .. } => {
                for child in children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// All descendants (not the node itself), document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    fn alloc(&mut self, data: NodeData, oid: Oid) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data,
            parent: None,
            oid,
            ouid: None,
        });
        self.by_oid.insert(oid, id);
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let oid = self.ids.new_id();
        self.alloc(
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: BTreeMap::new(),
                children: Vec::new(),
            },
            oid,
        )
    }

    pub fn create_text(&mut self, value: &str) -> NodeId {
        let oid = self.ids.new_id();
        self.alloc(NodeData::Text(value.to_string()), oid)
    }

    /// Same tag and attributes, no children, fresh oid. Text nodes clone to
    /// an empty text node.
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        match self.slot(id).data.clone() {
            NodeData::Text(_) => self.create_text(""),
            NodeData::Element { tag, attributes, .. } => {
                let clone = self.create_element(&tag);
                if let NodeData::Element { attributes: attrs, .. } = &mut self.slot_mut(clone).data {
                    *attrs = attributes;
                }
                clone
            }
        }
    }

    /// Rebuild a serialized subtree with its original oids (detached)
    pub fn build(&mut self, node: &VNode) -> NodeId {
        self.ids.observe(node.oid());
        match node {
            VNode::Text { oid, value } => self.alloc(NodeData::Text(value.clone()), *oid),
            VNode::Element {
                oid,
                tag,
                attributes,
                children,
            } => {
                let id = self.alloc(
                    NodeData::Element {
                        tag: tag.clone(),
                        attributes: attributes.clone(),
                        children: Vec::new(),
                    },
                    *oid,
                );
                for child in children {
                    let child_id = self.build(child);
                    self.link(id, usize::MAX, child_id);
                }
                id
            }
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    pub fn serialize(&self, id: NodeId) -> VNode {
        match &self.slot(id).data {
            NodeData::Text(value) => VNode::Text {
                oid: self.oid(id),
                value: value.clone(),
            },
            NodeData::Element {
                tag,
                attributes,
                children,
            } => VNode::Element {
                oid: self.oid(id),
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: children.iter().map(|c| self.serialize(*c)).collect(),
            },
        }
    }

    pub fn to_markup(&self, id: NodeId) -> Markup {
        match &self.slot(id).data {
            NodeData::Text(value) => Markup::text(value.clone()),
            NodeData::Element {
                tag,
                attributes,
                children,
            } => Markup::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: children.iter().map(|c| self.to_markup(*c)).collect(),
            },
        }
    }

    /// Markup of the root's children
    pub fn inner_markup(&self) -> Vec<Markup> {
        self.children(self.root)
            .iter()
            .map(|c| self.to_markup(*c))
            .collect()
    }

    /// Serialized inner content of the root
    pub fn inner_html(&self) -> String {
        scribe_parser::serialize(&self.inner_markup())
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Records journaled after the first `len`
    pub fn journal_since(&self, len: usize) -> &[MutationRecord] {
        &self.journal[len.min(self.journal.len())..]
    }

    pub fn take_journal(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Toggle recording, returning the previous state
    pub fn set_recording(&mut self, recording: bool) -> bool {
        std::mem::replace(&mut self.recording, recording)
    }

    /// Records appended after `len`, removed from the journal
    pub fn split_journal(&mut self, len: usize) -> Vec<MutationRecord> {
        let len = len.min(self.journal.len());
        self.journal.split_off(len)
    }

    /// Changes are journaled only for nodes attached to the root
    fn observed(&self, id: NodeId) -> bool {
        self.recording && self.is_connected(id)
    }

    // ------------------------------------------------------------------
    // Mutation primitives
    // ------------------------------------------------------------------

    /// Attach without recording
    fn link(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let NodeData::Element { children, .. } = &mut self.slot_mut(parent).data {
            let index = index.min(children.len());
            children.insert(index, child);
        }
        self.slot_mut(child).parent = Some(parent);
    }

    /// Insert `child` into `parent` at `index` (clamped). An attached child
    /// is detached first, so the move shows up as remove + add.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.is_text(parent) {
            tracing::warn!(parent = self.oid(parent), "insert into text node ignored");
            return;
        }
        let mut index = index.min(self.size(parent));
        if let Some(old_parent) = self.parent(child) {
            if old_parent == parent && self.index(child) < index {
                index -= 1;
            }
            self.detach(child);
        }
        self.link(parent, index, child);
        if self.observed(parent) {
            let before_id = self.child(parent, index + 1).map(|n| self.oid(n));
            let node = self.serialize(child);
            self.journal.push(MutationRecord::Add {
                id: self.oid(child),
                parent_id: self.oid(parent),
                before_id,
                node,
            });
        }
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.insert(parent, usize::MAX, child);
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            let index = self.index(reference);
            self.insert(parent, index, child);
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            let index = self.index(reference) + 1;
            self.insert(parent, index, child);
        }
    }

    /// Detach a node from its parent
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        let index = self.index(child);
        let record = self.observed(parent).then(|| {
            let prev_id = index
                .checked_sub(1)
                .and_then(|i| self.child(parent, i))
                .map(|n| self.oid(n));
            MutationRecord::Remove {
                id: self.oid(child),
                parent_id: self.oid(parent),
                node: self.serialize(child),
                next_id: self.child(parent, index + 1).map(|n| self.oid(n)),
                prev_id,
            }
        });
        if let NodeData::Element { children, .. } = &mut self.slot_mut(parent).data {
            children.remove(index);
        }
        self.slot_mut(child).parent = None;
        self.journal.extend(record);
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        let NodeData::Text(current) = &mut self.slot_mut(id).data else {
            return;
        };
        if current == value {
            return;
        }
        let old_value = std::mem::replace(current, value.to_string());
        if self.observed(id) {
            self.journal.push(MutationRecord::CharacterData {
                id: self.oid(id),
                text: value.to_string(),
                old_value,
            });
        }
    }

    /// Set (`Some`) or remove (`None`) an attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        let NodeData::Element { attributes, .. } = &mut self.slot_mut(id).data else {
            return;
        };
        let old_value = attributes.get(name).cloned();
        if old_value.as_deref() == value {
            return;
        }
        match value {
            Some(v) => {
                attributes.insert(name.to_string(), v.to_string());
            }
            None => {
                attributes.remove(name);
            }
        }
        if self.observed(id) {
            self.journal.push(MutationRecord::Attributes {
                id: self.oid(id),
                attribute_name: name.to_string(),
                value: value.map(str::to_string),
                old_value,
            });
        }
    }

    // ------------------------------------------------------------------
    // Record replay
    // ------------------------------------------------------------------

    /// Replay a record forward
    pub fn apply_record(&mut self, record: &MutationRecord) {
        match record {
            MutationRecord::Add {
                id,
                parent_id,
                before_id,
                node,
            } => {
                if let Some(existing) = self.live_by_oid(*id) {
                    self.detach(existing);
                }
                let Some(parent) = self.by_oid(*parent_id) else {
                    tracing::warn!(parent_id, "add: parent not found");
                    return;
                };
                let index = before_id
                    .and_then(|b| self.by_oid(b))
                    .filter(|b| self.parent(*b) == Some(parent))
                    .map(|b| self.index(b))
                    .unwrap_or(usize::MAX);
                let child = self.build(node);
                self.insert(parent, index, child);
            }
            MutationRecord::Remove { id, .. } => match self.by_oid(*id) {
                Some(node) => self.detach(node),
                None => tracing::warn!(id, "remove: node not found"),
            },
            MutationRecord::CharacterData { id, text, .. } => match self.by_oid(*id) {
                Some(node) => self.set_text(node, text),
                None => tracing::warn!(id, "characterData: node not found"),
            },
            MutationRecord::Attributes {
                id,
                attribute_name,
                value,
                ..
            } => match self.by_oid(*id) {
                Some(node) => self.set_attribute(node, attribute_name, value.as_deref()),
                None => tracing::warn!(id, "attributes: node not found"),
            },
        }
    }

    /// Undo the effect of a record
    pub fn revert_record(&mut self, record: &MutationRecord) {
        match record {
            MutationRecord::Add { id, .. } => match self.by_oid(*id) {
                Some(node) => self.detach(node),
                None => tracing::warn!(id, "revert add: node not found"),
            },
            MutationRecord::Remove {
                id,
                parent_id,
                node,
                next_id,
                prev_id,
            } => {
                if let Some(existing) = self.live_by_oid(*id) {
                    self.detach(existing);
                }
                let Some(parent) = self.by_oid(*parent_id) else {
                    tracing::warn!(parent_id, "revert remove: parent not found");
                    return;
                };
                let sibling_index = |tree: &Tree, sibling: Option<Oid>| {
                    sibling
                        .and_then(|s| tree.by_oid(s))
                        .filter(|s| tree.parent(*s) == Some(parent))
                        .map(|s| tree.index(s))
                };
                let index = sibling_index(self, *next_id)
                    .or_else(|| sibling_index(self, *prev_id).map(|i| i + 1))
                    .unwrap_or(usize::MAX);
                let child = self.build(node);
                self.insert(parent, index, child);
            }
            MutationRecord::CharacterData { id, old_value, .. } => {
                if let Some(node) = self.by_oid(*id) {
                    self.set_text(node, old_value);
                }
            }
            MutationRecord::Attributes {
                id,
                attribute_name,
                old_value,
                ..
            } => {
                if let Some(node) = self.by_oid(*id) {
                    self.set_attribute(node, attribute_name, old_value.as_deref());
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Unbreakable ownership cache
    // ------------------------------------------------------------------

    pub fn cached_ouid(&self, id: NodeId) -> Option<Oid> {
        self.slot(id).ouid
    }

    /// Oid of the nearest inclusive unbreakable ancestor
    pub fn compute_ouid(&self, id: NodeId) -> Option<Oid> {
        self.closest(id, |t, n| t.is_unbreakable(n)).map(|n| self.oid(n))
    }

    /// Recompute and cache the ouid of every attached node
    pub fn refresh_ouids(&mut self) {
        let root = self.root;
        let mut nodes = self.descendants(root);
        nodes.push(root);
        for node in nodes {
            let ouid = self.compute_ouid(node);
            self.slot_mut(node).ouid = ouid;
        }
    }
}

/// Char index to byte index within `s` (clamped to the end)
pub fn byte_offset(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_parser::parse;

    fn tree(source: &str) -> Tree {
        Tree::adopt_children(&parse(source).unwrap())
    }

    #[test]
    fn test_root_gets_first_oid() {
        let t = tree("<p>ab</p>");
        assert_eq!(t.oid(t.root()), scribe_parser::ROOT_OID);
        let p = t.child(t.root(), 0).unwrap();
        assert_eq!(t.tag(p), Some("p"));
        assert_eq!(t.parent(p), Some(t.root()));
    }

    #[test]
    fn test_primitives_record_and_revert() {
        let mut t = tree("<p>ab</p><p>cd</p>");
        let root = t.root();
        let p1 = t.child(root, 0).unwrap();
        let p2 = t.child(root, 1).unwrap();
        let text = t.child(p1, 0).unwrap();
        let before = t.inner_html();

        t.set_text(text, "xy");
        t.set_attribute(p2, "class", Some("c"));
        t.detach(p1);
        t.append(root, p1);
        assert_eq!(t.inner_html(), r#"<p class="c">cd</p><p>xy</p>"#);

        let records = t.take_journal();
        assert_eq!(records.len(), 4);
        t.set_recording(false);
        for record in records.iter().rev() {
            t.revert_record(record);
        }
        assert_eq!(t.inner_html(), before);

        for record in &records {
            t.apply_record(record);
        }
        assert_eq!(t.inner_html(), r#"<p class="c">cd</p><p>xy</p>"#);
    }

    #[test]
    fn test_moves_within_same_parent() {
        let mut t = tree("<p>a</p><p>b</p><p>c</p>");
        let root = t.root();
        let first = t.child(root, 0).unwrap();
        t.insert(root, 2, first);
        assert_eq!(t.inner_html(), "<p>b</p><p>a</p><p>c</p>");
        let third = t.child(root, 2).unwrap();
        t.insert_after(t.child(root, 0).unwrap(), third);
        assert_eq!(t.inner_html(), "<p>b</p><p>c</p><p>a</p>");
    }

    #[test]
    fn test_rebuilt_nodes_keep_oids() {
        let mut t = tree("<p>ab</p>");
        let p = t.child(t.root(), 0).unwrap();
        let oids = t.serialize(p).oids();
        t.detach(p);
        let records = t.take_journal();
        t.revert_record(&records[0]);
        let p_again = t.child(t.root(), 0).unwrap();
        assert_eq!(t.serialize(p_again).oids(), oids);
        // New nodes never reuse replayed ids
        let fresh = t.create_text("z");
        assert!(t.oid(fresh) > *oids.iter().max().unwrap());
    }

    #[test]
    fn test_byte_offset() {
        assert_eq!(byte_offset("aé b", 2), 3);
        assert_eq!(byte_offset("ab", 5), 2);
    }
}
