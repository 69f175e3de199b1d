// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository storage queries through gix, without spawning git.

use std::path::Path;

use tracing::debug;

use crate::error::{GitError, GixError, ScmResult};

/// Whether `path` is a bare git repository.
#[must_use]
pub fn is_bare_repository(path: &Path) -> bool {
    gix::open(path).is_ok_and(|repo| repo.is_bare())
}

/// Create an empty bare repository at `path`.
///
/// # Errors
///
/// Returns `GitError::Gix` if initialization fails, e.g. when `path` is a
/// non-empty directory.
pub fn init_bare(path: &Path) -> ScmResult<()> {
    gix::init_bare(path).map_err(|e| GitError::Gix(GixError::Init(Box::new(e))))?;
    Ok(())
}

/// Open the repository at `path`.
///
/// # Errors
///
/// Returns `GitError::Gix` if `path` is not a git repository.
pub fn open(path: &Path) -> ScmResult<gix::Repository> {
    gix::open(path).map_err(|e| GitError::Gix(GixError::Open(Box::new(e))).into())
}

/// Short name of the branch HEAD points to, born or not.
#[must_use]
pub fn head_branch(path: &Path) -> Option<String> {
    let repo = open(path).ok()?;
    match repo.head_name() {
        Ok(name) => name.map(|name| name.shorten().to_string()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot read HEAD");
            None
        }
    }
}
