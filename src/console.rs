//! Interactive console
//!
//! Input is read on a dedicated OS thread and handed to the async loop
//! through a single-slot channel, so a shutdown signal can interrupt the
//! wait for input as well as an in-flight exchange.

use crate::runtime::{ConversationStore, ExchangeError, ModelBackend, ToolDispatcher, TurnOrchestrator};
use crate::store::SessionId;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    NewSession,
    Clear,
    Sessions,
    ShowSession,
    Empty,
    Message(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "/exit" => Command::Exit,
            "/new" => Command::NewSession,
            "/clear" => Command::Clear,
            "/sessions" => Command::Sessions,
            "/session" => Command::ShowSession,
            other => Command::Message(other.to_string()),
        }
    }
}

/// Read lines from `reader` on a separate thread.
///
/// The thread stops at end of input, on a read error, or once the receiver
/// is gone. A line read after shutdown is dropped.
pub fn spawn_input_reader<R>(reader: R, shutdown: CancellationToken) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            };
            if shutdown.is_cancelled() || tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub struct Console<S, B, D, W> {
    orchestrator: TurnOrchestrator<S, B, D>,
    session: SessionId,
    out: W,
}

impl<S, B, D, W> Console<S, B, D, W>
where
    S: ConversationStore,
    B: ModelBackend,
    D: ToolDispatcher,
    W: Write,
{
    pub fn new(orchestrator: TurnOrchestrator<S, B, D>, session: SessionId, out: W) -> Self {
        Self {
            orchestrator,
            session,
            out,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Run until `/exit`, end of input or shutdown
    pub async fn run(
        &mut self,
        mut input: mpsc::Receiver<String>,
        shutdown: &CancellationToken,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "Session {}. Type /exit to quit, /new for a fresh session.",
            self.session
        )?;

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let line = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                line = input.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };

            match Command::parse(&line) {
                Command::Empty => {}
                Command::Exit => break,
                Command::NewSession => {
                    self.session = SessionId::generate();
                    writeln!(self.out, "Started session {}", self.session)?;
                }
                Command::ShowSession => writeln!(self.out, "{}", self.session)?,
                Command::Clear => self.clear().await?,
                Command::Sessions => self.print_sessions().await?,
                Command::Message(text) => {
                    self.exchange(&text, shutdown).await?;
                    if shutdown.is_cancelled() {
                        break;
                    }
                }
            }
        }

        writeln!(self.out)?;
        Ok(())
    }

    async fn exchange(&mut self, text: &str, shutdown: &CancellationToken) -> io::Result<()> {
        let cancel = shutdown.child_token();
        match self
            .orchestrator
            .run_exchange(&self.session, text, &cancel)
            .await
        {
            Ok(outcome) => {
                tracing::debug!(response_id = %outcome.response_id, "Exchange answered");
                for call in &outcome.tool_calls {
                    writeln!(self.out, "[tool] {}", call.name)?;
                }
                writeln!(self.out, "{}", outcome.text)?;
                writeln!(self.out)
            }
            Err(ExchangeError::Cancelled) => writeln!(self.out, "Cancelled."),
            Err(e) => {
                tracing::error!(session = %self.session, error = %e, "Exchange failed");
                writeln!(self.out, "Error: {e}")
            }
        }
    }

    async fn clear(&mut self) -> io::Result<()> {
        match self.orchestrator.store().delete(&self.session).await {
            Ok(()) => writeln!(self.out, "Cleared session {}", self.session),
            Err(e) => writeln!(self.out, "Error: {e}"),
        }
    }

    async fn print_sessions(&mut self) -> io::Result<()> {
        let sessions = match self.orchestrator.store().list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => return writeln!(self.out, "Error: {e}"),
        };
        if sessions.is_empty() {
            return writeln!(self.out, "No saved sessions.");
        }
        for summary in sessions {
            let marker = if summary.session_id == self.session { '*' } else { ' ' };
            writeln!(
                self.out,
                "{marker} {}  {} turns  last active {}",
                summary.session_id,
                summary.turn_count,
                summary.last_activity.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
        }
        Ok(())
    }
}
