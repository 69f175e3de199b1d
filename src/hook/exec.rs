// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! External commands run as hooks.
//!
//! ```text
//! [[hooks.exec]] --> ExecHook
//!   env:   SCM_REPOSITORY_ID / _NAME / _TYPE, SCM_HOOK_TYPE, SCM_USER
//!   stdin: "<old> <new> <ref>\n" per ref update
//!   exit 0 --> accept     non-zero --> error (veto on pre-receive)
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{RepositoryHook, RepositoryHookEvent, RepositoryHookType};
use crate::config::types::ExecHookConfig;
use crate::error::{ConfigError, HookError, ScmResult};
use crate::process::{ProcessBuilder, ProcessFlags};

/// Hook running a configured program.
#[derive(Debug)]
pub struct ExecHook {
    name: String,
    command: std::path::PathBuf,
    args: Vec<String>,
    hook_types: Vec<RepositoryHookType>,
    is_async: bool,
    repositories: Option<String>,
    timeout: Option<Duration>,
}

impl ExecHook {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the repository glob is invalid.
    pub fn from_config(config: &ExecHookConfig) -> ScmResult<Self> {
        if let Some(pattern) = config.repositories.as_deref()
            && let Err(e) = wax::Glob::new(pattern)
        {
            return Err(ConfigError::InvalidValue {
                section: "hooks.exec".to_string(),
                key: "repositories".to_string(),
                message: e.to_string(),
            }
            .into());
        }

        Ok(Self {
            name: config.name.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            hook_types: config.hook_types.clone(),
            is_async: config.is_async,
            repositories: config.repositories.clone(),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        })
    }

    /// Whether the hook applies to the repository named `name`.
    #[must_use]
    pub fn applies_to(&self, name: &str) -> bool {
        use wax::{Glob, Program as _};

        self.repositories.as_deref().is_none_or(|pattern| {
            Glob::new(pattern).is_ok_and(|glob| glob.is_match(name))
        })
    }
}

impl RepositoryHook for ExecHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_types(&self) -> &[RepositoryHookType] {
        &self.hook_types
    }

    fn is_async(&self) -> bool {
        self.is_async
    }

    fn on_event(&self, event: &RepositoryHookEvent) -> ScmResult<()> {
        let repository = event.repository();
        if !self.applies_to(&repository.name) {
            debug!(hook = %self.name, repository = %repository.display_name(), "skipped");
            return Ok(());
        }

        let stdin: String = event
            .context()
            .ref_updates()
            .iter()
            .map(|update| format!("{update}\n"))
            .collect();

        let output = ProcessBuilder::new(&self.command)
            .args(&self.args)
            .name(self.name.as_str())
            .env("SCM_REPOSITORY_ID", &repository.id)
            .env("SCM_REPOSITORY_NAME", &repository.name)
            .env("SCM_REPOSITORY_TYPE", &repository.backend)
            .env("SCM_HOOK_TYPE", event.hook_type().as_str())
            .env("SCM_USER", event.subject().name())
            .stdin(stdin)
            .maybe_timeout(self.timeout)
            .flags(ProcessFlags::ALLOW_FAILURE)
            .run(&CancellationToken::new())
            .map_err(|e| HookError::ExecFailed {
                command: self.command.display().to_string(),
                message: e.to_string(),
            })?;

        if output.success() {
            return Ok(());
        }
        let message = if output.stderr().is_empty() {
            format!("exited with code {}", output.exit_code())
        } else {
            output.stderr().to_string()
        };
        Err(HookError::ExecFailed {
            command: self.name.clone(),
            message,
        }
        .into())
    }
}
