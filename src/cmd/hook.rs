// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hook callback commands.
//!
//! ```text
//! git receive-pack
//!   hooks/pre-receive  --> scm-hub hook pre-receive git NAME  < ref updates
//!                            RefUpdate::parse_line per stdin line
//!                            HookContext + GitHookChangesetProvider
//!                            RepositoryRegistry::fire_hook_event
//!                          exit 1 on veto --> git refuses the push
//! ```

use std::io::BufRead;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cli::hook::{HookArgs, HookUrlArgs};
use crate::context::ScmContext;
use crate::error::{RepositoryError, Result};
use crate::git::{GIT_TYPE, GitHookChangesetProvider};
use crate::hook::{HookContext, RefUpdate, RepositoryHookType};
use crate::security::Subject;

/// Read `<old> <new> <ref>` lines; blank and malformed lines are skipped.
///
/// # Errors
///
/// Returns an error if `input` cannot be read.
pub fn read_ref_updates(input: impl BufRead) -> Result<Vec<RefUpdate>> {
    let mut updates = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match RefUpdate::parse_line(&line) {
            Some(update) => updates.push(update),
            None => warn!(line = %line, "ignoring malformed ref update"),
        }
    }
    Ok(updates)
}

/// Dispatch a hook event reported by an installed hook script.
///
/// # Errors
///
/// Returns the veto of a pre-receive hook, or an error if the repository is
/// unknown.
pub fn run_hook_command(args: &HookArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let hook_type = RepositoryHookType::from(args.point);
    let updates = read_ref_updates(std::io::stdin().lock())?;
    let registry = context.registry();
    let repository = registry
        .get_by_name(subject, &args.backend, &args.name)?
        .ok_or_else(|| RepositoryError::NameNotFound {
            backend: args.backend.clone(),
            name: args.name.clone(),
        })?;
    debug!(
        repository = %repository.display_name(),
        hook = %hook_type,
        updates = updates.len(),
        "hook callback"
    );

    let mut hook_context = HookContext::new(updates);
    if repository.backend == GIT_TYPE {
        match which::which("git") {
            Ok(git) => {
                let directory = registry.directory(&repository)?;
                hook_context = hook_context
                    .with_provider(Box::new(GitHookChangesetProvider::new(git, directory)));
            }
            Err(e) => debug!(error = %e, "hooks run without changesets"),
        }
    }
    registry.fire_hook_event(subject, &repository.id, hook_type, Arc::new(hook_context))?;
    Ok(())
}

/// Print the hook callback URL, resolving it first.
///
/// # Errors
///
/// Returns an error if no candidate URL answered the probe.
pub async fn run_hook_url_command(args: &HookUrlArgs, context: &ScmContext) -> Result<()> {
    let resolver = context.hook_url();
    match resolver.resolve(args.request_url.as_deref()).await {
        Some(url) => {
            println!("{url}");
            Ok(())
        }
        None => anyhow::bail!("no hook url answered the probe"),
    }
}
