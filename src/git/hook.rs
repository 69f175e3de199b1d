// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Changesets introduced by a git push, read from inside a hook.

use std::collections::HashSet;
use std::path::PathBuf;

use super::shell::GitShell;
use crate::error::ScmResult;
use crate::hook::{HookChangesetProvider, RefUpdate};
use crate::repository::changeset::Changeset;
use crate::spi::ExecutionContext;

/// Lists the commits each ref update adds, newest first, without repeats.
///
/// A created ref contributes the commits no other branch has; a deleted ref
/// contributes nothing.
#[derive(Debug)]
pub struct GitHookChangesetProvider {
    shell: GitShell,
}

impl GitHookChangesetProvider {
    pub fn new(git: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            shell: GitShell::new(git, directory),
        }
    }
}

impl HookChangesetProvider for GitHookChangesetProvider {
    fn changesets(&self, updates: &[RefUpdate]) -> ScmResult<Vec<Changeset>> {
        let context = ExecutionContext::default();
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for update in updates.iter().filter(|update| !update.is_delete()) {
            let added = if update.is_create() {
                let branch = update
                    .reference
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&update.reference);
                let exclude = format!("--exclude={branch}");
                self.shell.lines(
                    &context,
                    &["rev-list", &update.new, "--not", &exclude, "--branches"],
                )?
            } else {
                let range = format!("{}..{}", update.old, update.new);
                self.shell.lines(&context, &["rev-list", &range])?
            };
            ids.extend(added.into_iter().filter(|id| seen.insert(id.clone())));
        }
        self.shell.changesets(&context, &ids)
    }
}
