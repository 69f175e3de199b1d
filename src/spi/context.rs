// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Deadline and cancellation handed to every backend command.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{CommandError, ScmResult};

/// Per-invocation execution limits.
///
/// Backends that can be interrupted check [`ExecutionContext::check`] between
/// steps and pass [`ExecutionContext::remaining`] on to child processes.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    token: CancellationToken,
    timeout: Option<Duration>,
    started: Instant,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ExecutionContext {
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            token: CancellationToken::new(),
            timeout,
            started: Instant::now(),
        }
    }

    /// Cancel through `token` instead of a private one.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Time left before the deadline; `None` without a timeout.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .map(|timeout| timeout.saturating_sub(self.started.elapsed()))
    }

    /// Fail if the command was cancelled or ran past its deadline.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Cancelled` or `CommandError::Timeout`.
    pub fn check(&self, command: &str) -> ScmResult<()> {
        if self.token.is_cancelled() {
            return Err(CommandError::Cancelled {
                command: command.to_string(),
            }
            .into());
        }
        if let Some(timeout) = self.timeout
            && self.started.elapsed() >= timeout
        {
            return Err(CommandError::Timeout {
                command: command.to_string(),
                timeout_secs: timeout.as_secs(),
            }
            .into());
        }
        Ok(())
    }
}
