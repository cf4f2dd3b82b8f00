//! # Edit Session
//!
//! One client's editor: a [`Document`] plus the input events and the named
//! command catalogue the host UI drives it with, and an optional
//! [`Replicator`] that committed steps are pushed to.
//!
//! The session owns no timer. The host calls [`EditSession::commit_step`]
//! once [`EditSession::idle_window`] has passed without input.

use crate::commands::{plain_text_from_html, Alignment, Command, ListMode};
use crate::document::Document;
use crate::errors::{CommandOutcome, EditorError, EditorResult, Violation};
use crate::replication::Replicator;
use crate::selection::Selection;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    Tab,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            shift: true,
            ..Self::plain(key)
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }
}

/// Input the host forwards to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    KeyDown(KeyEvent),
    /// Text the platform inserted on its own (IME, autocorrect)
    Input(String),
    /// Clipboard content; rich content is reduced to text
    Paste { text: String, html: Option<String> },
    Drop { text: String },
    MouseDown,
    MouseUp,
    SelectionChange(Selection),
}

pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    pub document: Document,

    replicator: Option<Box<dyn Replicator>>,

    /// Selection changes are held back while the mouse is down
    mouse_down: bool,
    dragged: Option<Selection>,
}

impl EditSession {
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self {
            id: id.into(),
            document,
            replicator: None,
            mouse_down: false,
            dragged: None,
        }
    }

    pub fn with_replicator(mut self, replicator: Box<dyn Replicator>) -> Self {
        self.replicator = Some(replicator);
        self
    }

    pub fn is_replicating(&self) -> bool {
        self.replicator.is_some()
    }

    pub fn idle_window(&self) -> Duration {
        self.document.config().idle_window()
    }

    /// Handle one input event. Returns `None` when the event is not an
    /// editing action.
    pub fn handle_event(&mut self, event: EditorEvent) -> Option<CommandOutcome> {
        match event {
            EditorEvent::KeyDown(key) => self.key_down(key),
            EditorEvent::Input(text) => Some(self.run(Command::InsertText(text))),
            EditorEvent::Paste { text, html } => {
                let text = match html {
                    Some(html) if text.is_empty() => plain_text_from_html(&html),
                    _ => text,
                };
                Some(self.run(Command::Paste(text)))
            }
            EditorEvent::Drop { text } => Some(self.run(Command::Paste(text))),
            EditorEvent::MouseDown => {
                self.mouse_down = true;
                None
            }
            EditorEvent::MouseUp => {
                self.mouse_down = false;
                if let Some(selection) = self.dragged.take() {
                    self.document.set_selection(selection);
                }
                None
            }
            EditorEvent::SelectionChange(selection) => {
                if self.mouse_down {
                    self.dragged = Some(selection);
                } else {
                    self.document.set_selection(selection);
                }
                None
            }
        }
    }

    fn key_down(&mut self, event: KeyEvent) -> Option<CommandOutcome> {
        let KeyEvent { key, shift, ctrl } = event;
        if ctrl {
            return match key {
                Key::Char('z') | Key::Char('Z') if shift => Some(self.redo()),
                Key::Char('z') | Key::Char('Z') => Some(self.undo()),
                Key::Char('y') | Key::Char('Y') => Some(self.redo()),
                _ => None,
            };
        }
        let outcome = match key {
            Key::Enter if shift => self.run(Command::ShiftEnter),
            Key::Enter => match self.run(Command::Enter) {
                // A protected block still takes a line break
                CommandOutcome::RolledBack(Violation::Unbreakable) => self.run(Command::ShiftEnter),
                outcome => outcome,
            },
            Key::Backspace => self.run(Command::DeleteBackward),
            Key::Delete => self.run(Command::DeleteForward),
            Key::Tab if shift => self.run(Command::ShiftTab),
            Key::Tab => self.run(Command::Tab),
            Key::Char(c) => self.run(Command::InsertText(c.to_string())),
        };
        Some(outcome)
    }

    /// Run a command against the document
    pub fn run(&mut self, command: Command) -> CommandOutcome {
        self.document.apply(&command)
    }

    pub fn undo(&mut self) -> CommandOutcome {
        self.document.undo();
        self.flush_outbox();
        CommandOutcome::Applied
    }

    pub fn redo(&mut self) -> CommandOutcome {
        self.document.redo();
        self.flush_outbox();
        CommandOutcome::Applied
    }

    pub fn can_undo(&self) -> bool {
        self.document.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.document.can_redo()
    }

    /// Run a catalogue command by name with positional arguments
    pub fn exec_command(&mut self, name: &str, args: &[&str]) -> EditorResult<CommandOutcome> {
        let arg = |i: usize| {
            args.get(i).map(|a| a.to_string()).ok_or_else(|| EditorError::MissingArgument {
                command: name.to_string(),
            })
        };
        let command = match name {
            "undo" => return Ok(self.undo()),
            "redo" => return Ok(self.redo()),
            "bold" => Command::Bold,
            "createLink" => Command::CreateLink(arg(0)?),
            "unlink" => Command::Unlink,
            "setFontSize" => Command::SetFontSize(arg(0)?),
            "insertInlineIcon" => Command::InsertIcon(arg(0)?),
            "indentList" => Command::Tab,
            "outdentList" => Command::ShiftTab,
            "toggleList" => {
                let mode = arg(0)?;
                let mode = ListMode::from_name(&mode)
                    .ok_or_else(|| EditorError::UnknownCommand(format!("toggleList {mode}")))?;
                Command::ToggleList(mode)
            }
            _ => match name.strip_prefix("align").and_then(Alignment::from_name) {
                Some(alignment) => Command::Align(alignment),
                None => return Err(EditorError::UnknownCommand(name.to_string())),
            },
        };
        tracing::debug!(name, ?args, "exec command");
        Ok(self.run(command))
    }

    /// Commit the open step and push it to the replicator
    pub fn commit_step(&mut self) -> bool {
        let committed = self.document.commit_step().is_some();
        self.flush_outbox();
        committed
    }

    fn flush_outbox(&mut self) {
        let steps = self.document.take_outbox();
        let Some(replicator) = self.replicator.as_mut() else {
            return;
        };
        for step in &steps {
            if let Err(err) = replicator.push(step) {
                tracing::warn!(session = %self.id, %err, "history push failed, replication disabled");
                self.replicator = None;
                return;
            }
        }
    }

    /// Fetch remote steps and fold them into the document. Returns the
    /// number of new steps applied.
    pub fn sync(&mut self) -> usize {
        let Some(replicator) = self.replicator.as_mut() else {
            return 0;
        };
        match replicator.fetch(self.document.last_fetched()) {
            Ok(steps) => self.document.integrate(steps),
            Err(err) => {
                tracing::warn!(session = %self.id, %err, "history fetch failed, replication disabled");
                self.replicator = None;
                0
            }
        }
    }
}
