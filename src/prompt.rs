//! User confirmation and interactive field resolution.
//!
//! Terminal answers are read on a helper thread. A signal does not break a
//! blocking read, so prompts wait on the thread with a timeout and give up
//! with `Interrupted` once SIGINT or SIGTERM has arrived.

use issue_core::merge::{FieldDiff, FieldValue, ResolutionPolicy};
use issue_core::{Issue, IssueError};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use crate::branch::Interrupts;
use crate::error::{GitIssueError, Result};

/// How often a waiting prompt looks for a signal.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

/// Where prompt answers come from.
pub trait AnswerSource {
    /// The next line, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if a signal arrives while waiting, or `Io` if
    /// the input cannot be read.
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Answers from any buffered reader.
#[derive(Debug)]
pub struct Lines<R>(R);

impl<R: BufRead> AnswerSource for Lines<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        Ok((self.0.read_line(&mut line)? > 0).then_some(line))
    }
}

/// Answers from stdin. Signals are captured from construction on, so one
/// arriving while the question is printed still counts.
pub struct TerminalInput {
    interrupts: Interrupts,
}

impl TerminalInput {
    /// # Errors
    ///
    /// Returns `Io` if the signal handlers cannot be registered.
    pub fn new() -> Result<Self> {
        Ok(Self {
            interrupts: Interrupts::install()?,
        })
    }
}

impl AnswerSource for TerminalInput {
    fn next_line(&mut self) -> Result<Option<String>> {
        let lines = stdin_lines().lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            self.interrupts.check()?;
            match lines.recv_timeout(SIGNAL_POLL) {
                Ok(line) => return Ok(Some(line)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

/// Lines of stdin, fed by one reader thread for the life of the process.
fn stdin_lines() -> &'static Mutex<Receiver<String>> {
    static LINES: OnceLock<Mutex<Receiver<String>>> = OnceLock::new();
    LINES.get_or_init(|| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            loop {
                let mut line = String::new();
                match stdin.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "stdin closed");
                        break;
                    }
                }
            }
        });
        Mutex::new(receiver)
    })
}

/// Asks the user to approve an action.
pub trait Confirm {
    /// Returns `Ok(false)` when the user declines.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if a signal arrives while waiting, or `Io` if
    /// the terminal cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Approve deleting user data. Only a person at a terminal can say yes.
    ///
    /// # Errors
    ///
    /// Same as [`confirm`](Self::confirm).
    fn confirm_destructive(&self, question: &str) -> Result<bool>;
}

/// Prompts on stderr and reads a line from stdin. End of input declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        let mut input = TerminalInput::new()?;
        let mut stderr = io::stderr();
        write!(stderr, "{question} [y/N] ")?;
        stderr.flush()?;

        let answer = input.next_line()?;
        Ok(answer.as_deref().is_some_and(is_yes))
    }

    fn confirm_destructive(&self, question: &str) -> Result<bool> {
        if !io::stdin().is_terminal() {
            tracing::warn!(question, "not a terminal; refusing to delete without a person to confirm");
            return Ok(false);
        }
        self.confirm(question)
    }
}

/// Approves everything except deletion (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        tracing::info!(question, "assuming yes");
        Ok(true)
    }

    fn confirm_destructive(&self, question: &str) -> Result<bool> {
        tracing::warn!(question, "--yes does not approve deleting files; declining");
        Ok(false)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks which side to keep for every differing field.
pub struct InteractivePolicy<A, W> {
    input: A,
    output: W,
}

impl InteractivePolicy<TerminalInput, io::Stderr> {
    /// Prompt on stderr, read answers from stdin.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the signal handlers cannot be registered.
    pub fn terminal() -> Result<Self> {
        Ok(Self {
            input: TerminalInput::new()?,
            output: io::stderr(),
        })
    }
}

impl<R: BufRead, W: Write> InteractivePolicy<Lines<R>, W> {
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input: Lines(input),
            output,
        }
    }
}

impl<A: AnswerSource, W: Write> InteractivePolicy<A, W> {
    fn ask(&mut self, issue: &Issue, diff: &FieldDiff) -> Result<Option<FieldValue>> {
        writeln!(self.output, "{} ({}) conflicting {}:", issue.id, issue.uuid, diff.field)?;
        writeln!(self.output, "  [c]urrent:  {}", diff.current)?;
        writeln!(self.output, "  [i]ncoming: {}", diff.incoming)?;
        loop {
            write!(self.output, "Keep which value? [c/i] ")?;
            self.output.flush()?;

            let Some(answer) = self.input.next_line()? else {
                return Ok(None);
            };
            match answer.trim().to_lowercase().as_str() {
                "c" | "current" => return Ok(Some(diff.current.clone())),
                "i" | "incoming" => return Ok(Some(diff.incoming.clone())),
                _ => writeln!(self.output, "Please answer 'c' or 'i'.")?,
            }
        }
    }
}

impl<A: AnswerSource, W: Write> ResolutionPolicy for InteractivePolicy<A, W> {
    fn choose(&mut self, issue: &Issue, diff: &FieldDiff) -> issue_core::Result<FieldValue> {
        let aborted = |reason: String| IssueError::ResolutionAborted {
            field: diff.field.to_string(),
            reason,
        };
        match self.ask(issue, diff) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(aborted("no answer before end of input".to_string())),
            Err(GitIssueError::Interrupted) => Err(aborted("interrupted".to_string())),
            Err(e) => Err(aborted(e.to_string())),
        }
    }
}
