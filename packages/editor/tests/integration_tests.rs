//! Integration tests for editor crate

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scribe_editor::{
    Command, CommandOutcome, Document, EditSession, EditorConfig, EditorEvent, InMemoryReplicator, Key,
    KeyEvent, ListMode, Violation,
};

fn doc(source: &str) -> Document {
    Document::from_fixture(source, EditorConfig::default()).unwrap()
}

fn run(source: &str, commands: &[Command]) -> String {
    let mut doc = doc(source);
    for command in commands {
        doc.apply(command);
    }
    doc.to_fixture_string()
}

#[test]
fn test_enter_splits_paragraph() {
    assert_eq!(run("<p>ab[]cd</p>", &[Command::Enter]), "<p>ab</p><p>[]cd</p>");
}

#[test]
fn test_delete_forward_before_placeholder_is_noop() {
    assert_eq!(run("<p>[]<br></p>", &[Command::DeleteForward]), "<p>[]<br></p>");
}

#[test]
fn test_enter_in_empty_last_item_leaves_list() {
    assert_eq!(
        run("<ul><li>a</li><li>[]</li></ul>", &[Command::Enter]),
        "<ul><li>a</li></ul><p>[]<br></p>"
    );
}

#[test]
fn test_unbreakable_enter_is_rolled_back() {
    let source = r#"<div class="oe_unbreakable"><b>ab[]cd</b></div>"#;
    let mut doc = doc(source);
    let outcome = doc.apply(&Command::Enter);
    assert_eq!(outcome, CommandOutcome::RolledBack(Violation::Unbreakable));
    assert_eq!(doc.to_fixture_string(), source);
    assert_eq!(doc.commit_step(), None);
}

#[test]
fn test_repeated_backspace_keeps_a_line() {
    let mut doc = doc("<p>ab[]</p>");
    for _ in 0..6 {
        doc.apply(&Command::DeleteBackward);
    }
    assert_eq!(doc.to_fixture_string(), "<p>[]<br></p>");
}

#[test]
fn test_redo_disabled_after_new_edit() {
    let mut doc = doc("<p>ab[]</p>");
    doc.apply(&Command::Enter);
    doc.commit_step();
    assert!(doc.undo());
    assert!(doc.can_redo());

    doc.apply(&Command::InsertText("x".into()));
    doc.commit_step();
    assert!(!doc.can_redo());
    assert_eq!(doc.to_fixture_string(), "<p>abx[]</p>");
}

#[test]
fn test_undo_walks_back_through_history() {
    let mut doc = doc("<p>[]ab</p>");
    doc.apply(&Command::ToggleList(ListMode::Unordered));
    doc.commit_step();
    doc.apply(&Command::Enter);
    doc.commit_step();
    doc.apply(&Command::Tab);
    doc.commit_step();

    assert!(doc.undo());
    assert!(doc.undo());
    assert!(doc.undo());
    assert!(!doc.undo());
    assert_eq!(doc.to_fixture_string(), "<p>[]ab</p>");
    assert!(doc.mirror_matches_live());

    assert!(doc.redo());
    assert!(doc.redo());
    assert!(doc.redo());
    assert!(!doc.redo());
    assert!(doc.mirror_matches_live());
}

#[test]
fn test_step_wire_format() {
    let mut doc = doc("<p>ab[]</p>");
    doc.apply(&Command::InsertText("c".into()));
    let step = doc.commit_step().unwrap();
    let json = serde_json::to_value(&step).unwrap();
    assert_eq!(json["dom"][0]["type"], "characterData");
    assert_eq!(json["dom"][0]["text"], "abc");
    assert_eq!(json["dom"][0]["oldValue"], "ab");
    assert!(json["cursor"]["anchorNode"].is_number());
    assert!(json.get("origin").is_none());
}

#[test]
fn test_sessions_converge_through_server() {
    let server = InMemoryReplicator::new();
    let source = "<p>ab[]</p><p>cd</p>";
    let mut alice = EditSession::new("alice", doc(source)).with_replicator(Box::new(server.clone()));
    let mut bob = EditSession::new("bob", doc("<p>ab</p><p>cd[]</p>")).with_replicator(Box::new(server.clone()));

    alice.handle_event(EditorEvent::Input("1".into()));
    alice.commit_step();
    bob.handle_event(EditorEvent::Input("2".into()));
    bob.commit_step();

    assert_eq!(alice.sync(), 1);
    assert_eq!(bob.sync(), 1);
    assert_eq!(alice.document.to_html(), "<p>ab1</p><p>cd2</p>");
    assert_eq!(bob.document.to_html(), alice.document.to_html());
    assert!(alice.document.mirror_matches_live());
    assert!(bob.document.mirror_matches_live());
    assert_eq!(server.len(), 2);
}

#[test]
fn test_key_script() {
    let mut session = EditSession::new("local", doc("<p>[]<br></p>"));
    for c in "hi".chars() {
        session.handle_event(EditorEvent::KeyDown(KeyEvent::plain(Key::Char(c))));
    }
    session.handle_event(EditorEvent::KeyDown(KeyEvent::shift(Key::Enter)));
    session.handle_event(EditorEvent::KeyDown(KeyEvent::plain(Key::Char('x'))));
    assert_eq!(session.document.to_fixture_string(), "<p>hi<br>x[]</p>");
}

#[derive(Debug, Clone)]
enum Op {
    Type(char),
    Enter,
    ShiftEnter,
    Backspace,
    Delete,
}

impl Op {
    fn command(&self) -> Command {
        match self {
            Op::Type(c) => Command::InsertText(c.to_string()),
            Op::Enter => Command::Enter,
            Op::ShiftEnter => Command::ShiftEnter,
            Op::Backspace => Command::DeleteBackward,
            Op::Delete => Command::DeleteForward,
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::sample::select(vec!['a', 'b', ' ']).prop_map(Op::Type),
        Just(Op::Enter),
        Just(Op::ShiftEnter),
        Just(Op::Backspace),
        Just(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_undo_then_redo_restores_each_step(ops in prop::collection::vec(op(), 1..12)) {
        let mut doc = doc("<p>ab[]cd</p><p>ef</p>");
        let initial = doc.to_html();
        for op in &ops {
            doc.apply(&op.command());
            if doc.commit_step().is_none() {
                continue;
            }
            let after = doc.tree().serialize(doc.tree().root());
            prop_assert!(doc.mirror_matches_live());
            prop_assert!(doc.undo());
            prop_assert!(doc.redo());
            prop_assert_eq!(doc.tree().serialize(doc.tree().root()), after);
            prop_assert!(doc.mirror_matches_live());
        }
        while doc.undo() {}
        prop_assert_eq!(doc.to_html(), initial);
        prop_assert!(doc.mirror_matches_live());
    }
}
