//! SIGINT/SIGTERM capture for the duration of a session.
//!
//! While installed, a signal only sets a flag. Child git processes in the
//! same process group still receive it and exit, so the session unwinds
//! through ordinary error returns and the worktree guard gets to release.

use signal_hook::SigId;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{GitIssueError, Result};

pub struct Interrupts {
    flag: Arc<AtomicBool>,
    ids: Vec<SigId>,
}

impl Interrupts {
    /// Start capturing signals. Handlers are removed on drop.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a handler cannot be registered.
    pub fn install() -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut ids = Vec::with_capacity(2);
        for signal in [SIGINT, SIGTERM] {
            ids.push(signal_hook::flag::register(signal, Arc::clone(&flag))?);
        }
        Ok(Self { flag, ids })
    }

    #[must_use]
    pub fn triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// # Errors
    ///
    /// Returns `Interrupted` if a signal has arrived.
    pub fn check(&self) -> Result<()> {
        if self.triggered() {
            return Err(GitIssueError::Interrupted);
        }
        Ok(())
    }

    /// Replace `err` with `Interrupted` if a signal caused it.
    #[must_use]
    pub fn explain(&self, err: GitIssueError) -> GitIssueError {
        if self.triggered() {
            tracing::debug!(error = %err, "operation failed after interrupt");
            GitIssueError::Interrupted
        } else {
            err
        }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}
