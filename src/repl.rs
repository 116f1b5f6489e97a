//! Terminal front end.
//!
//! Reads commands from stdin and renders the conversation from the session's
//! watch channel. The renderer never talks to the engine directly; it only
//! reacts to published snapshots, so streamed text appears as it arrives.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::chat::{ChatSession, Conversation, QueryMode, Role, TurnOutcome};
use crate::error::Result;
use crate::history::HistoryClient;

const TITLE: &str = "Autonomous Data Copilot";
const TAGLINE: &str = "From Natural Language to Business Truth";
const TYPING: &str = "...";
const CLEAR_LINE: &str = "\r\x1b[2K";

const HELP: &str = "\
Commands:
  /mode                      toggle structured/unstructured
  /mode <structured|unstructured>
  /clear                     cancel the current answer and clear the conversation
  /history                   list saved conversations
  /forget <id>               delete a saved conversation
  /help                      show this help
  /quit                      exit
Anything else is sent as a question.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    ToggleMode,
    SetMode(QueryMode),
    Clear,
    History,
    Forget(String),
    Help,
    Quit,
    /// A slash command that could not be understood, with the reason.
    Invalid(String),
}

/// Parse a line of input. Blank lines yield `None`.
#[must_use]
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Send(line.to_string()));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let cmd = match (name, arg) {
        ("mode", None) => Command::ToggleMode,
        ("mode", Some(arg)) => match arg.parse() {
            Ok(mode) => Command::SetMode(mode),
            Err(err) => Command::Invalid(err.to_string()),
        },
        ("clear", _) => Command::Clear,
        ("history", _) => Command::History,
        ("forget", Some(id)) => Command::Forget(id.to_string()),
        ("forget", None) => Command::Invalid("usage: /forget <id>".to_string()),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        (other, _) => Command::Invalid(format!("unknown command `/{other}`, try /help")),
    };
    Some(cmd)
}

/// Incremental transcript writer.
///
/// Remembers how much of the newest assistant message is already on screen
/// and prints only the difference on each snapshot.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    /// Messages already started on screen.
    shown: usize,
    /// Clear count of the last conversation rendered.
    clears: u64,
    /// Assistant message currently being streamed.
    streaming: Option<Uuid>,
    printed: String,
    typing: bool,
}

impl TranscriptRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, conv: &Conversation, out: &mut impl Write) -> io::Result<()> {
        // Snapshots can be skipped, so a clear followed by a new turn may
        // arrive with the same message count as before.
        if conv.clear_count() != self.clears || conv.len() < self.shown {
            if self.streaming.is_some() {
                writeln!(out)?;
            }
            *self = Self {
                clears: conv.clear_count(),
                ..Self::default()
            };
            writeln!(out, "(conversation cleared)")?;
            if conv.is_empty() {
                write_empty_hint(out)?;
            }
        }

        for msg in &conv.messages()[self.shown..] {
            if self.streaming.take().is_some() {
                writeln!(out)?;
            }
            if msg.role() == Role::Assistant {
                write!(out, "copilot [{}]> ", msg.mode())?;
                self.streaming = Some(msg.id());
                self.printed.clear();
                self.typing = false;
            }
        }
        self.shown = conv.len();

        let Some(id) = self.streaming else {
            return out.flush();
        };
        let Some(msg) = conv.get(id) else {
            return out.flush();
        };
        let content = msg.content();

        if content.is_empty() {
            if conv.is_loading() && !self.typing {
                write!(out, "{TYPING}")?;
                self.typing = true;
            }
        } else if let Some(delta) = content.strip_prefix(self.printed.as_str()) {
            if self.typing {
                write!(out, "{CLEAR_LINE}copilot [{}]> ", msg.mode())?;
                self.typing = false;
            }
            write!(out, "{delta}")?;
            self.printed.push_str(delta);
        } else {
            // Content was replaced wholesale (error text).
            write!(out, "{CLEAR_LINE}copilot [{}]> {content}", msg.mode())?;
            self.printed = content.to_string();
            self.typing = false;
        }

        if !conv.is_loading() {
            if self.typing {
                write!(out, "{CLEAR_LINE}copilot [{}]> ", msg.mode())?;
            }
            writeln!(out)?;
            self.streaming = None;
            self.typing = false;
        }
        out.flush()
    }
}

fn write_empty_hint(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Start a conversation")?;
    writeln!(
        out,
        "Toggle between structured and unstructured modes, then type your question below to get started."
    )
}

/// Interactive loop over stdin.
#[derive(Debug)]
pub struct Repl {
    session: ChatSession,
    history: HistoryClient,
}

impl Repl {
    #[must_use]
    pub fn new(session: ChatSession, history: HistoryClient) -> Self {
        Self { session, history }
    }

    pub async fn run(self) -> Result<()> {
        {
            let mut out = io::stdout().lock();
            writeln!(out, "{TITLE}")?;
            writeln!(out, "{TAGLINE}")?;
            writeln!(out, "mode: {} (/help for commands)", self.session.mode())?;
            writeln!(out)?;
            write_empty_hint(&mut out)?;
        }

        let renderer = spawn_renderer(&self.session);
        let mut turn: Option<JoinHandle<TurnOutcome>> = None;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let Some(cmd) = parse_command(&line) else {
                continue;
            };
            match cmd {
                Command::Send(text) => {
                    if self.session.is_loading() {
                        notice("still answering, wait or /clear to cancel");
                        continue;
                    }
                    let session = self.session.clone();
                    turn = Some(tokio::spawn(
                        async move { session.send_message(&text).await },
                    ));
                }
                Command::ToggleMode => {
                    if self.session.is_loading() {
                        notice("mode can't change while an answer is streaming");
                    } else {
                        let mode = self.session.toggle_mode();
                        notice(&format!("mode: {mode}"));
                    }
                }
                Command::SetMode(mode) => {
                    if self.session.is_loading() {
                        notice("mode can't change while an answer is streaming");
                    } else {
                        self.session.set_mode(mode);
                        notice(&format!("mode: {mode}"));
                    }
                }
                Command::Clear => self.session.clear_messages(),
                Command::History => self.print_history().await,
                Command::Forget(id) => match self.history.delete(&id).await {
                    Ok(()) => notice(&format!("deleted {id}")),
                    Err(err) => notice(&format!("could not delete {id}: {err}")),
                },
                Command::Help => notice(HELP),
                Command::Quit => break,
                Command::Invalid(reason) => notice(&reason),
            }
        }

        self.session.clear_messages();
        if let Some(handle) = turn {
            match handle.await {
                Ok(outcome) => debug!(?outcome, "Last turn finished"),
                Err(err) => debug!(error = %err, "Last turn task failed"),
            }
        }
        renderer.abort();
        Ok(())
    }

    async fn print_history(&self) {
        let items = self.history.list().await;
        if items.is_empty() {
            notice("no saved conversations");
            return;
        }
        let listing = items
            .iter()
            .map(|item| format!("  {}  {}  {}", item.id, item.date, item.title))
            .collect::<Vec<_>>()
            .join("\n");
        notice(&listing);
    }
}

fn notice(text: &str) {
    println!("{text}");
}

fn spawn_renderer(session: &ChatSession) -> JoinHandle<()> {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        let mut renderer = TranscriptRenderer::new();
        while rx.changed().await.is_ok() {
            let conv = rx.borrow_and_update().clone();
            let mut out = io::stdout().lock();
            if let Err(err) = renderer.render(&conv, &mut out) {
                debug!(error = %err, "Render failed");
                break;
            }
        }
    })
}
