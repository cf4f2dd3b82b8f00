//! # Mutation Records
//!
//! Primitive, replayable changes to the document tree.
//!
//! ## Design Principles
//!
//! 1. **Push-based**: every tree primitive appends its own record; nothing
//!    diffs the tree after the fact
//! 2. **Self-contained**: added and removed subtrees are stored serialized,
//!    so a record can be replayed against any tree that agrees on oids
//! 3. **Invertible**: each record carries enough of the previous state to be
//!    reverted (old text, old attribute value, removed subtree and siblings)
//!
//! ## Wire format
//!
//! Records serialize with a `type` tag of `add`, `remove`, `characterData`
//! or `attributes`; a [`Step`] serializes as `{id, cursor, dom}`.

use scribe_parser::Oid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized subtree, keyed by oid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "camelCase")]
pub enum VNode {
    Element {
        oid: Oid,
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<VNode>,
    },
    Text {
        oid: Oid,
        value: String,
    },
}

impl VNode {
    pub fn oid(&self) -> Oid {
        match self {
            VNode::Element { oid, .. } | VNode::Text { oid, .. } => *oid,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Text { .. } => &[],
        }
    }

    /// Every oid in the subtree, depth first
    pub fn oids(&self) -> Vec<Oid> {
        let mut out = Vec::new();
        self.collect_oids(&mut out);
        out
    }

    fn collect_oids(&self, out: &mut Vec<Oid>) {
        out.push(self.oid());
        for child in self.children() {
            child.collect_oids(out);
        }
    }
}

/// One primitive tree change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MutationRecord {
    /// A subtree was inserted under `parent_id`, before `before_id` (or
    /// appended when there is no following sibling)
    #[serde(rename_all = "camelCase")]
    Add {
        id: Oid,
        parent_id: Oid,
        before_id: Option<Oid>,
        node: VNode,
    },

    /// A subtree was detached; siblings locate it again on revert
    #[serde(rename_all = "camelCase")]
    Remove {
        id: Oid,
        parent_id: Oid,
        node: VNode,
        next_id: Option<Oid>,
        prev_id: Option<Oid>,
    },

    /// Text node content replaced
    #[serde(rename_all = "camelCase")]
    CharacterData {
        id: Oid,
        text: String,
        old_value: String,
    },

    /// Attribute set (`Some`) or removed (`None`)
    #[serde(rename_all = "camelCase")]
    Attributes {
        id: Oid,
        attribute_name: String,
        value: Option<String>,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    /// Oid of the node the record is about
    pub fn id(&self) -> Oid {
        match self {
            MutationRecord::Add { id, .. }
            | MutationRecord::Remove { id, .. }
            | MutationRecord::CharacterData { id, .. }
            | MutationRecord::Attributes { id, .. } => *id,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, MutationRecord::Add { .. } | MutationRecord::Remove { .. })
    }
}

/// Caret captured by oid so it survives node re-creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSnapshot {
    pub anchor_node: Oid,
    pub anchor_offset: usize,
    pub focus_node: Oid,
    pub focus_offset: usize,
}

/// Which act produced a step; kept locally, never sent over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepOrigin {
    #[default]
    Edit,
    Undo,
    Redo,
}

/// One committed unit of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Random identifier used to order replicated steps
    pub id: String,

    /// Caret to restore when this step is reverted
    pub cursor: Option<CursorSnapshot>,

    /// Records in application order
    pub dom: Vec<MutationRecord>,

    #[serde(skip)]
    pub origin: StepOrigin,
}

impl Step {
    pub fn new() -> Self {
        Self {
            id: String::new(),
            cursor: None,
            dom: Vec::new(),
            origin: StepOrigin::Edit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dom.is_empty()
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh random step id
pub fn new_step_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_wire_format() {
        let record = MutationRecord::CharacterData {
            id: 7,
            text: "new".to_string(),
            old_value: "old".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "characterData", "id": 7, "text": "new", "oldValue": "old"})
        );
    }

    #[test]
    fn test_step_serialization() {
        let step = Step {
            id: "abc".to_string(),
            cursor: Some(CursorSnapshot {
                anchor_node: 2,
                anchor_offset: 1,
                focus_node: 2,
                focus_offset: 1,
            }),
            dom: vec![MutationRecord::Add {
                id: 3,
                parent_id: 1,
                before_id: None,
                node: VNode::Text {
                    oid: 3,
                    value: "x".to_string(),
                },
            }],
            origin: StepOrigin::Undo,
        };

        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"parentId\":1"));
        assert!(json.contains("\"anchorNode\":2"));

        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dom, step.dom);
        // Origin is local bookkeeping only
        assert_eq!(back.origin, StepOrigin::Edit);
    }

    #[test]
    fn test_vnode_oids() {
        let node = VNode::Element {
            oid: 1,
            tag: "p".to_string(),
            attributes: BTreeMap::new(),
            children: vec![VNode::Text {
                oid: 2,
                value: "a".to_string(),
            }],
        };
        assert_eq!(node.oids(), vec![1, 2]);
    }
}
