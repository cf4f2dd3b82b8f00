//! Edit scripts: one action per line, `#` starts a comment.
//!
//! ```text
//! type hello
//! shift-enter
//! exec createLink https://example.com
//! commit
//! undo
//! ```

use scribe_editor::{CommandOutcome, EditSession, EditorEvent, Key, KeyEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Key(KeyEvent),
    Undo,
    Redo,
    Type(String),
    Paste(String),
    Exec { name: String, args: Vec<String> },
    Commit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown action `{action}`")]
    UnknownAction { line: usize, action: String },

    #[error("line {line}: `{action}` needs an argument")]
    MissingArgument { line: usize, action: String },
}

pub fn parse_script(source: &str) -> Result<Vec<Action>, ScriptError> {
    let mut actions = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim_start();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (action, rest) = line.split_once(' ').unwrap_or((line, ""));
        let missing = || ScriptError::MissingArgument {
            line: index + 1,
            action: action.to_string(),
        };
        let parsed = match action {
            "enter" => Action::Key(KeyEvent::plain(Key::Enter)),
            "shift-enter" => Action::Key(KeyEvent::shift(Key::Enter)),
            "backspace" => Action::Key(KeyEvent::plain(Key::Backspace)),
            "delete" => Action::Key(KeyEvent::plain(Key::Delete)),
            "tab" => Action::Key(KeyEvent::plain(Key::Tab)),
            "shift-tab" => Action::Key(KeyEvent::shift(Key::Tab)),
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "commit" => Action::Commit,
            // Text is taken verbatim, trailing spaces included
            "type" if !rest.is_empty() => Action::Type(rest.to_string()),
            "paste" if !rest.is_empty() => Action::Paste(rest.replace("\\n", "\n")),
            "type" | "paste" => return Err(missing()),
            "exec" => {
                let mut words = rest.split_whitespace().map(str::to_string);
                let name = words.next().ok_or_else(missing)?;
                Action::Exec {
                    name,
                    args: words.collect(),
                }
            }
            other => {
                return Err(ScriptError::UnknownAction {
                    line: index + 1,
                    action: other.to_string(),
                })
            }
        };
        actions.push(parsed);
    }
    Ok(actions)
}

/// Tally of what a script did to a session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub applied: usize,
    pub rolled_back: usize,
    pub committed: usize,
}

impl RunReport {
    fn record(&mut self, outcome: Option<CommandOutcome>) {
        match outcome {
            Some(CommandOutcome::Applied) => self.applied += 1,
            Some(CommandOutcome::RolledBack(violation)) => {
                tracing::info!(%violation, "action rolled back");
                self.rolled_back += 1;
            }
            None => {}
        }
    }
}

pub fn run_script(session: &mut EditSession, actions: &[Action]) -> anyhow::Result<RunReport> {
    let mut report = RunReport::default();
    for action in actions {
        tracing::debug!(?action, "script action");
        match action {
            Action::Key(event) => report.record(session.handle_event(EditorEvent::KeyDown(*event))),
            Action::Undo => report.record(Some(session.undo())),
            Action::Redo => report.record(Some(session.redo())),
            Action::Type(text) => report.record(session.handle_event(EditorEvent::Input(text.clone()))),
            Action::Paste(text) => report.record(session.handle_event(EditorEvent::Paste {
                text: text.clone(),
                html: None,
            })),
            Action::Exec { name, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                report.record(Some(session.exec_command(name, &args)?));
            }
            Action::Commit => {
                if session.commit_step() {
                    report.committed += 1;
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scribe_editor::{Document, EditorConfig};

    fn session(source: &str) -> EditSession {
        EditSession::new("cli", Document::from_fixture(source, EditorConfig::default()).unwrap())
    }

    #[test]
    fn test_parse_script() {
        let actions = parse_script("# setup\ntype a b \n\nshift-tab\nexec setFontSize 18px\npaste x\\ny\ncommit").unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Type("a b ".to_string()),
                Action::Key(KeyEvent::shift(Key::Tab)),
                Action::Exec {
                    name: "setFontSize".to_string(),
                    args: vec!["18px".to_string()],
                },
                Action::Paste("x\ny".to_string()),
                Action::Commit,
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line() {
        assert_eq!(
            parse_script("enter\njump"),
            Err(ScriptError::UnknownAction {
                line: 2,
                action: "jump".to_string()
            })
        );
        assert_eq!(
            parse_script("type"),
            Err(ScriptError::MissingArgument {
                line: 1,
                action: "type".to_string()
            })
        );
        assert!(matches!(parse_script("exec  "), Err(ScriptError::MissingArgument { .. })));
    }

    #[test]
    fn test_run_keys_and_text() {
        let mut s = session("<p>[]<br></p>");
        let actions = parse_script("type hi\nshift-enter\ntype x").unwrap();
        let report = run_script(&mut s, &actions).unwrap();
        assert_eq!(s.document.to_fixture_string(), "<p>hi<br>x[]</p>");
        assert_eq!(report.applied, 3);
    }

    #[test]
    fn test_run_undo_after_commit() {
        let mut s = session("<p>[]<br></p>");
        let actions = parse_script("type ab\ncommit\nenter\ncommit\nundo").unwrap();
        let report = run_script(&mut s, &actions).unwrap();
        assert_eq!(s.document.to_fixture_string(), "<p>ab[]</p>");
        assert_eq!(report.committed, 2);
    }

    #[test]
    fn test_run_exec() {
        let mut s = session("<p>a[]b</p>");
        run_script(&mut s, &parse_script("exec alignCenter").unwrap()).unwrap();
        assert_eq!(s.document.to_fixture_string(), r#"<p style="text-align: center;">a[]b</p>"#);
        assert!(run_script(&mut s, &parse_script("exec explode").unwrap()).is_err());
    }

    #[test]
    fn test_every_command_is_counted_once() {
        let mut s = session(r#"<div class="oe_unbreakable">ab[]</div>"#);
        let report = run_script(&mut s, &parse_script("exec toggleList UL").unwrap()).unwrap();
        assert_eq!(report.applied + report.rolled_back, 1);
    }
}
