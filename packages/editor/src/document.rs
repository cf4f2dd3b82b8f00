//! # Document Handle
//!
//! A [`Document`] owns everything one editor instance mutates: the live
//! tree, the mirror tree (which only ever sees committed steps), the
//! selection and the history.
//!
//! ## Lifecycle
//!
//! ```text
//! markup → adopt → apply (guarded) → commit → undo/redo/integrate
//!            ↓           ↓               ↓
//!          Tree      journal          Step → mirror, outbox
//! ```

use crate::commands::{dispatch, fill_empty, Command, EditContext};
use crate::config::EditorConfig;
use crate::errors::{CommandOutcome, EditorResult};
use crate::guard;
use crate::history::{History, StepState};
use crate::mutations::{CursorSnapshot, Step, StepOrigin};
use crate::selection::Selection;
use crate::tree::Tree;
use crate::walk::Position;
use scribe_parser::{parse, parse_fixture, Serializer};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug)]
pub struct Document {
    tree: Tree,
    mirror: Tree,
    selection: Selection,
    history: History,
    config: EditorConfig,

    /// Id of the newest step received from the history server
    last_fetched: Option<String>,

    /// Committed local steps not yet handed to a replicator
    outbox: Vec<Step>,
}

impl Document {
    /// Document from plain markup; the caret starts at the beginning
    pub fn from_html(html: &str, config: EditorConfig) -> EditorResult<Self> {
        let nodes = parse(html)?;
        Ok(Self::adopt(Tree::adopt_children(&nodes), None, config))
    }

    /// Document from markup with caret markers (`[]`, `[`, `]`)
    pub fn from_fixture(source: &str, config: EditorConfig) -> EditorResult<Self> {
        let fixture = parse_fixture(source)?;
        let tree = Tree::adopt_children(&fixture.nodes);
        let selection = fixture.anchor.as_ref().and_then(|anchor| {
            let focus = fixture.focus.as_ref().unwrap_or(anchor);
            Selection::from_markers(&tree, anchor, focus)
        });
        Ok(Self::adopt(tree, selection, config))
    }

    /// Load a fixture file
    pub fn load(path: impl AsRef<Path>, config: EditorConfig) -> EditorResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_fixture(&source, config)
    }

    fn adopt(mut tree: Tree, selection: Option<Selection>, config: EditorConfig) -> Self {
        tree.set_extra_unbreakable(&config.extra_unbreakable_tags);

        // An empty root still needs a line to type in
        let recording = tree.set_recording(false);
        let root = tree.root();
        fill_empty(&mut tree, root);
        tree.set_recording(recording);

        let mut mirror = tree.clone();
        mirror.set_recording(false);

        let mut selection = selection.unwrap_or_else(|| Selection::caret(Position::new(root, 0)));
        if selection.is_collapsed() && selection.focus == Position::new(root, 0) {
            let mut ctx = EditContext {
                tree: &mut tree,
                selection: &mut selection,
                tab_width: config.tab_width,
            };
            ctx.set_cursor_start(root);
        }

        Self {
            tree,
            mirror,
            selection,
            history: History::new(),
            config,
            last_fetched: None,
            outbox: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Replace the selection; invalid selections are ignored
    pub fn set_selection(&mut self, selection: Selection) {
        if selection.is_valid(&self.tree) {
            self.selection = selection.normalize(&self.tree);
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn last_fetched(&self) -> Option<&str> {
        self.last_fetched.as_deref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Markup of the root's content
    pub fn to_html(&self) -> String {
        self.tree.inner_html()
    }

    /// Markup of the root's content with the selection drawn as markers
    pub fn to_fixture_string(&self) -> String {
        let (anchor, focus) = self.selection.to_markers(&self.tree);
        Serializer::with_markers(Some(&anchor), Some(&focus)).serialize(&self.tree.inner_markup())
    }

    /// True when the mirror, which only receives committed steps, has the
    /// same structure, content and oids as the live tree. Holds after every
    /// commit.
    pub fn mirror_matches_live(&self) -> bool {
        self.tree.serialize(self.tree.root()) == self.mirror.serialize(self.mirror.root())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Run a command under the guard. Its records join the open step.
    pub fn apply(&mut self, command: &Command) -> CommandOutcome {
        if self.tree.journal_len() == 0 {
            self.history.set_open_cursor(self.selection.snapshot(&self.tree));
        }
        let tab_width = self.config.tab_width;
        let outcome = guard::protect(&mut self.tree, &mut self.selection, |tree, selection| {
            let mut ctx = EditContext {
                tree,
                selection,
                tab_width,
            };
            dispatch(&mut ctx, command)
        });
        tracing::debug!(?command, ?outcome, "command applied");
        outcome
    }

    /// Commit the open step. Returns the new step, if anything was recorded.
    pub fn commit_step(&mut self) -> Option<Step> {
        self.commit(false)
    }

    fn commit(&mut self, force: bool) -> Option<Step> {
        let step = self.history.commit(&mut self.tree, &mut self.mirror, force)?.clone();
        if self.config.max_steps > 0 && self.history.len() > self.config.max_steps {
            tracing::debug!(len = self.history.len(), max = self.config.max_steps, "history above soft cap");
        }
        self.outbox.push(step.clone());
        Some(step)
    }

    /// Steps committed since the last call
    pub fn take_outbox(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.tree.journal_len() > 0 || self.history.next_undo_index().is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.tree.journal_len() == 0 && self.history.next_redo_index().is_some()
    }

    pub fn undo(&mut self) -> bool {
        self.commit(false);
        let Some(index) = self.history.next_undo_index() else {
            return false;
        };
        self.revert_step(index, StepOrigin::Undo);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit(false);
        let Some(index) = self.history.next_redo_index() else {
            return false;
        };
        self.revert_step(index, StepOrigin::Redo);
        true
    }

    /// Revert step `index` on the live tree and commit the revert
    fn revert_step(&mut self, index: usize, origin: StepOrigin) {
        let step = self.history.steps()[index].clone();
        self.history.set_open_cursor(self.selection.snapshot(&self.tree));
        for record in step.dom.iter().rev() {
            self.tree.revert_record(record);
        }
        self.history.mark(index, StepState::Consumed);
        self.history.set_open_origin(origin);
        self.commit(true);
        self.restore_cursor(step.cursor.as_ref());
        tracing::debug!(id = %step.id, ?origin, "step reverted");
    }

    fn restore_cursor(&mut self, snapshot: Option<&CursorSnapshot>) {
        if let Some(selection) = snapshot.and_then(|s| Selection::from_snapshot(&self.tree, s)) {
            self.selection = selection;
        } else if !self.selection.is_valid(&self.tree) {
            let root = self.tree.root();
            let mut ctx = EditContext {
                tree: &mut self.tree,
                selection: &mut self.selection,
                tab_width: self.config.tab_width,
            };
            ctx.set_cursor_start(root);
        }
    }

    // ------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------

    /// Bring in steps fetched from the history server, in server order.
    ///
    /// When some of them are new, local steps after the last fetched one
    /// (and the open step) are rolled back, the fetched steps applied in
    /// order, and the open step's records replayed on top. Returns the
    /// number of new steps.
    pub fn integrate(&mut self, fetched: Vec<Step>) -> usize {
        let Some(last) = fetched.last().map(|s| s.id.clone()) else {
            return 0;
        };
        let unknown = fetched
            .iter()
            .filter(|s| self.history.position(&s.id).is_none())
            .count();
        if unknown == 0 {
            self.last_fetched = Some(last);
            return 0;
        }

        let snapshot = self.selection.snapshot(&self.tree);
        let base = self
            .last_fetched
            .as_deref()
            .and_then(|id| self.history.position(id))
            .map_or(0, |i| i + 1);

        let open = self.tree.take_journal();
        let recording = self.tree.set_recording(false);
        for record in open.iter().rev() {
            self.tree.revert_record(record);
        }

        let local = self.history.truncate(base);
        for (step, _, _) in local.iter().rev() {
            for record in step.dom.iter().rev() {
                self.tree.revert_record(record);
                self.mirror.revert_record(record);
            }
        }
        tracing::debug!(rolled_back = local.len(), incoming = unknown, "integrating remote steps");
        let marks: HashMap<String, (Option<StepState>, bool)> = local
            .into_iter()
            .map(|(step, state, remote)| (step.id, (state, remote)))
            .collect();

        for step in fetched {
            for record in &step.dom {
                self.tree.apply_record(record);
                self.mirror.apply_record(record);
            }
            let (state, remote) = marks.get(&step.id).copied().unwrap_or((None, true));
            self.history.push_applied(step, state, remote);
        }
        self.tree.set_recording(recording);

        for record in &open {
            self.tree.apply_record(record);
        }
        self.last_fetched = Some(last);
        self.restore_cursor(Some(&snapshot));
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ListMode;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> Document {
        Document::from_fixture(source, EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_from_html_places_caret_at_start() {
        let doc = Document::from_html("<p>ab</p>", EditorConfig::default()).unwrap();
        assert_eq!(doc.to_fixture_string(), "<p>[]ab</p>");
    }

    #[test]
    fn test_empty_document_gets_a_line() {
        let doc = Document::from_html("", EditorConfig::default()).unwrap();
        assert_eq!(doc.to_fixture_string(), "<p>[]<br></p>");
        assert!(doc.mirror_matches_live());
    }

    #[test]
    fn test_commit_replays_on_mirror() {
        let mut doc = doc("<p>ab[]cd</p>");
        assert!(doc.apply(&Command::Enter).is_applied());
        assert!(!doc.mirror_matches_live());
        let step = doc.commit_step().unwrap();
        assert!(!step.dom.is_empty());
        assert!(doc.mirror_matches_live());
        assert_eq!(doc.commit_step(), None);
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut doc = doc("<p>ab[]cd</p>");
        let before = doc.to_fixture_string();
        doc.apply(&Command::Enter);
        doc.commit_step();
        let after = doc.to_fixture_string();

        assert!(doc.undo());
        assert_eq!(doc.to_fixture_string(), before);
        assert!(doc.can_redo());
        assert!(doc.redo());
        assert_eq!(doc.to_fixture_string(), after);
        assert!(doc.mirror_matches_live());
    }

    #[test]
    fn test_new_edit_disables_redo() {
        let mut doc = doc("<p>ab[]</p>");
        doc.apply(&Command::InsertText("c".into()));
        doc.commit_step();
        doc.undo();
        assert!(doc.can_redo());
        doc.apply(&Command::InsertText("x".into()));
        assert!(!doc.can_redo());
        doc.commit_step();
        assert!(!doc.can_redo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_undo_commits_pending_records() {
        let mut doc = doc("<p>[]ab</p>");
        doc.apply(&Command::ToggleList(ListMode::Unordered));
        assert!(doc.can_undo());
        assert!(doc.undo());
        assert_eq!(doc.to_fixture_string(), "<p>[]ab</p>");
        assert_eq!(doc.history_len(), 2);
    }

    #[test]
    fn test_rolled_back_command_records_nothing() {
        let mut doc = doc(r#"<div class="oe_unbreakable"><b>ab[]cd</b></div>"#);
        let outcome = doc.apply(&Command::Enter);
        assert!(!outcome.is_applied());
        assert_eq!(doc.commit_step(), None);
    }

    #[test]
    fn test_integrate_remote_steps() {
        let mut alice = doc("<p>ab[]</p>");
        let mut bob = doc("<p>ab[]</p>");

        alice.apply(&Command::InsertText("c".into()));
        let step = alice.commit_step().unwrap();

        assert_eq!(bob.integrate(vec![step.clone()]), 1);
        assert_eq!(bob.to_html(), "<p>abc</p>");
        assert!(bob.mirror_matches_live());
        assert_eq!(bob.last_fetched(), Some(step.id.as_str()));
        // Remote steps are not undone locally
        assert!(!bob.undo());
    }

    #[test]
    fn test_integrate_reorders_local_steps_after_remote() {
        let mut alice = doc("<p>ab[]</p><p>cd</p>");
        let mut bob = doc("<p>ab</p><p>cd[]</p>");

        alice.apply(&Command::InsertText("1".into()));
        let remote = alice.commit_step().unwrap();
        bob.apply(&Command::InsertText("2".into()));
        let local = bob.commit_step().unwrap();

        // The server saw alice first
        assert_eq!(bob.integrate(vec![remote, local]), 1);
        assert_eq!(bob.to_html(), "<p>ab1</p><p>cd2</p>");
        assert!(bob.mirror_matches_live());
        assert_eq!(bob.history_len(), 2);
        // Bob's own edit is still his to undo
        assert!(bob.undo());
        assert_eq!(bob.to_html(), "<p>ab1</p><p>cd</p>");
    }
}
