//! End-to-end replication through a running history server

use pretty_assertions::assert_eq;
use scribe_editor::{Document, EditSession, EditorConfig, EditorEvent, ReplicationError, Replicator, Step};
use scribe_workspace::{serve, AppState, HttpReplicator};
use std::net::SocketAddr;
use std::sync::mpsc;

fn spawn_server() -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            serve(listener, AppState::new()).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

fn session(id: &str, source: &str, base_url: &str) -> EditSession {
    let doc = Document::from_fixture(source, EditorConfig::default()).unwrap();
    EditSession::new(id, doc).with_replicator(Box::new(HttpReplicator::new(base_url).unwrap()))
}

fn step(id: &str) -> Step {
    Step {
        id: id.to_string(),
        ..Step::new()
    }
}

#[test]
fn test_push_and_fetch_over_http() {
    let base_url = spawn_server();
    let mut replicator = HttpReplicator::new(format!("{}/", base_url)).unwrap();
    assert_eq!(replicator.base_url(), base_url);

    replicator.push(&step("one")).unwrap();
    replicator.push(&step("two")).unwrap();
    assert!(matches!(
        replicator.push(&step("one")),
        Err(ReplicationError::Duplicate(id)) if id == "one"
    ));

    let ids = |steps: Vec<Step>| steps.into_iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids(replicator.fetch(None).unwrap()), vec!["one", "two"]);
    assert_eq!(ids(replicator.fetch(Some("one")).unwrap()), vec!["two"]);
}

#[test]
fn test_sessions_converge_over_http() {
    let base_url = spawn_server();
    let mut alice = session("alice", "<p>ab[]</p><p>cd</p>", &base_url);
    let mut bob = session("bob", "<p>ab</p><p>cd[]</p>", &base_url);

    alice.handle_event(EditorEvent::Input("1".into()));
    alice.commit_step();
    bob.handle_event(EditorEvent::Input("2".into()));
    bob.commit_step();

    alice.sync();
    bob.sync();
    assert_eq!(alice.document.to_html(), "<p>ab1</p><p>cd2</p>");
    assert_eq!(bob.document.to_html(), alice.document.to_html());
    assert!(alice.document.mirror_matches_live());
    assert!(bob.document.mirror_matches_live());
    assert!(alice.is_replicating());
    assert!(bob.is_replicating());
}

#[test]
fn test_unreachable_server_goes_local_only() {
    let mut session = session("solo", "<p>ab[]</p>", "http://127.0.0.1:1");
    session.handle_event(EditorEvent::Input("c".into()));
    session.commit_step();
    assert!(!session.is_replicating());
    assert_eq!(session.document.to_fixture_string(), "<p>abc[]</p>");
}
