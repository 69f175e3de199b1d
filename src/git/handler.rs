// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Storage provisioning of git repositories.
//!
//! ```text
//! create  gix::init_bare(<base>/<name>) --> install hook scripts
//! modify  reinstall hook scripts
//! delete  remove <base>/<name>
//! open    GitServiceProvider(git, <base>/<name>)
//! ```
//!
//! Installed hook scripts call back into this program:
//!
//! ```text
//! hooks/pre-receive    exec scm-hub [--config <file>] hook pre-receive git <name>
//! hooks/post-receive   exec scm-hub [--config <file>] hook post-receive git <name>
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::provider::GitServiceProvider;
use super::{GIT_TYPE, query};
use crate::backend::{RepositoryHandler, StorageProvisioner};
use crate::error::{GitError, RepositoryError, ScmResult};
use crate::hook::RepositoryHookType;
use crate::repository::{BackendType, Repository};
use crate::spi::RepositoryServiceProvider;

/// Hook scripts written into every repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookScripts {
    program: PathBuf,
    config: Option<PathBuf>,
}

impl HookScripts {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config: None,
        }
    }

    /// Pass `--config <file>` to the callback.
    #[must_use]
    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    /// Content of the script for `hook_type`.
    #[must_use]
    pub fn script(&self, hook_type: RepositoryHookType, repository: &Repository) -> String {
        let mut command = format!("exec {}", quote(&self.program.to_string_lossy()));
        if let Some(config) = &self.config {
            let _ = write!(command, " --config {}", quote(&config.to_string_lossy()));
        }
        let _ = write!(
            command,
            " hook {} {GIT_TYPE} {}",
            hook_type.script_name(),
            quote(&repository.name)
        );
        format!("#!/bin/sh\n# managed by scm-hub, rewritten on every repository change\n{command}\n")
    }

    fn install(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        let hooks = directory.join("hooks");
        std::fs::create_dir_all(&hooks)?;
        for hook_type in [RepositoryHookType::PreReceive, RepositoryHookType::PostReceive] {
            let path = hooks.join(hook_type.script_name());
            std::fs::write(&path, self.script(hook_type, repository))?;
            make_executable(&path)?;
        }
        debug!(repository = %repository.display_name(), "installed hook scripts");
        Ok(())
    }
}

/// Single-quote `value` for `/bin/sh`.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Handler of the `git` backend type.
#[derive(Debug)]
pub struct GitRepositoryHandler {
    backend_type: BackendType,
    base: PathBuf,
    git: Option<PathBuf>,
    hook_scripts: Option<HookScripts>,
}

impl GitRepositoryHandler {
    /// Handler storing repositories below `base`, using `git` from `PATH`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            backend_type: BackendType::new(GIT_TYPE, "Git"),
            base: base.into(),
            git: which::which("git").ok(),
            hook_scripts: None,
        }
    }

    /// Use `git` instead of the executable found on `PATH`.
    #[must_use]
    pub fn with_git(mut self, git: Option<PathBuf>) -> Self {
        self.git = git;
        self
    }

    #[must_use]
    pub fn with_hook_scripts(mut self, scripts: Option<HookScripts>) -> Self {
        self.hook_scripts = scripts;
        self
    }

    fn git(&self) -> ScmResult<&Path> {
        self.git
            .as_deref()
            .ok_or_else(|| GitError::ExecutableNotFound.into())
    }
}

impl StorageProvisioner for GitRepositoryHandler {
    fn create(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        if directory.exists() && std::fs::read_dir(directory)?.next().is_some() {
            return Err(RepositoryError::Storage {
                operation: "create",
                name: repository.name.clone(),
                message: format!("directory '{}' is not empty", directory.display()),
            }
            .into());
        }
        if let Some(parent) = directory.parent() {
            std::fs::create_dir_all(parent)?;
        }
        query::init_bare(directory)?;
        if let Some(scripts) = &self.hook_scripts {
            scripts.install(repository, directory)?;
        }
        info!(
            repository = %repository.display_name(),
            directory = %directory.display(),
            "created git repository"
        );
        Ok(())
    }

    fn modify(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        match &self.hook_scripts {
            Some(scripts) if directory.is_dir() => scripts.install(repository, directory),
            _ => Ok(()),
        }
    }

    fn delete(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        if directory.exists() {
            std::fs::remove_dir_all(directory)?;
            info!(repository = %repository.display_name(), "deleted git repository");
        }
        Ok(())
    }

    fn is_repository(&self, directory: &Path) -> bool {
        query::is_bare_repository(directory)
    }
}

impl RepositoryHandler for GitRepositoryHandler {
    fn backend_type(&self) -> &BackendType {
        &self.backend_type
    }

    fn is_configured(&self) -> bool {
        self.git.is_some()
    }

    fn base_directory(&self) -> &Path {
        &self.base
    }

    fn open(&self, repository: &Repository) -> ScmResult<Box<dyn RepositoryServiceProvider>> {
        let directory = self.directory(repository);
        if !self.is_repository(&directory) {
            return Err(GitError::RepoNotFound {
                path: directory.display().to_string(),
            }
            .into());
        }
        Ok(Box::new(GitServiceProvider::new(self.git()?, directory)))
    }
}
