// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Backend handlers and the capability registry.
//!
//! ```text
//! BackendRegistry
//!   "git" --> GitRepositoryHandler   (StorageProvisioner + open())
//!   "hg"  --> ...
//!
//! resolve(repository)
//!   handler = handlers[repository.type]     UnknownType if absent
//!   handler.is_configured()                 NotConfigured otherwise
//!   handler.open(repository) --> Box<dyn RepositoryServiceProvider>
//! ```

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::error::{RepositoryError, ScmResult};
use crate::repository::{BackendType, Repository};
use crate::spi::RepositoryServiceProvider;

/// On-disk materialization of repositories.
pub trait StorageProvisioner: Send + Sync {
    /// Create empty storage for `repository` at `directory`.
    fn create(&self, repository: &Repository, directory: &Path) -> ScmResult<()>;

    /// Apply metadata changes to the storage, e.g. rewrite hook scripts.
    fn modify(&self, _repository: &Repository, _directory: &Path) -> ScmResult<()> {
        Ok(())
    }

    /// Remove the storage of `repository`.
    fn delete(&self, repository: &Repository, directory: &Path) -> ScmResult<()>;

    /// Whether `directory` holds a repository of this backend.
    fn is_repository(&self, directory: &Path) -> bool;
}

/// Everything the registry needs from one backend.
pub trait RepositoryHandler: StorageProvisioner {
    fn backend_type(&self) -> &BackendType;

    /// Whether the handler can serve requests, e.g. its executable exists.
    fn is_configured(&self) -> bool {
        true
    }

    /// Directory holding all repositories of this backend.
    fn base_directory(&self) -> &Path;

    /// Storage directory of `repository`.
    fn directory(&self, repository: &Repository) -> PathBuf {
        self.base_directory().join(&repository.name)
    }

    /// Names of the repositories stored below the base directory, sorted.
    ///
    /// The subdirectories of a repository are not searched.
    ///
    /// # Errors
    ///
    /// Fails if a directory cannot be read.
    fn find_repositories(&self) -> ScmResult<Vec<String>> {
        let base = self.base_directory();
        let mut found = Vec::new();
        if !base.is_dir() {
            return Ok(found);
        }
        let mut pending = vec![base.to_path_buf()];
        while let Some(directory) = pending.pop() {
            for entry in std::fs::read_dir(&directory)? {
                let path = entry?.path();
                if !path.is_dir() {
                    continue;
                }
                if !self.is_repository(&path) {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(base) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|part| part.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    found.push(parts.join("/"));
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Open a service provider bound to `repository`.
    fn open(&self, repository: &Repository) -> ScmResult<Box<dyn RepositoryServiceProvider>>;

    /// Release handler-wide resources on shutdown.
    fn close(&self) -> ScmResult<()> {
        Ok(())
    }
}

/// Handlers keyed by backend type name.
#[derive(Default)]
pub struct BackendRegistry {
    handlers: RwLock<BTreeMap<String, Arc<dyn RepositoryHandler>>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under its type name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::HandlerAlreadyRegistered` if the type is
    /// taken.
    pub fn register(&self, handler: Arc<dyn RepositoryHandler>) -> ScmResult<()> {
        let name = handler.backend_type().name().to_string();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&name) {
            return Err(RepositoryError::HandlerAlreadyRegistered { backend: name }.into());
        }
        info!(
            backend = %name,
            directory = %handler.base_directory().display(),
            configured = handler.is_configured(),
            "registered repository handler"
        );
        handlers.insert(name, handler);
        Ok(())
    }

    /// The handler of `backend`, configured or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownType` for unregistered types.
    pub fn get(&self, backend: &str) -> ScmResult<Arc<dyn RepositoryHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(backend)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::UnknownType {
                    backend: backend.to_string(),
                }
                .into()
            })
    }

    /// The handler of `backend`, which must be configured.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` or `NotConfigured`.
    pub fn configured(&self, backend: &str) -> ScmResult<Arc<dyn RepositoryHandler>> {
        let handler = self.get(backend)?;
        if handler.is_configured() {
            Ok(handler)
        } else {
            Err(RepositoryError::NotConfigured {
                backend: backend.to_string(),
            }
            .into())
        }
    }

    #[must_use]
    pub fn contains(&self, backend: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(backend)
    }

    /// All registered backend types, sorted by name.
    #[must_use]
    pub fn types(&self) -> Vec<BackendType> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|handler| handler.backend_type().clone())
            .collect()
    }

    /// Backend types whose handler is configured.
    #[must_use]
    pub fn configured_types(&self) -> Vec<BackendType> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|handler| handler.is_configured())
            .map(|handler| handler.backend_type().clone())
            .collect()
    }

    /// Open a service provider for `repository`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, `NotConfigured`, or the handler's open error.
    pub fn resolve(
        &self,
        repository: &Repository,
    ) -> ScmResult<Box<dyn RepositoryServiceProvider>> {
        let handler = self.configured(&repository.backend)?;
        debug!(repository = %repository.display_name(), "opening service provider");
        handler.open(repository)
    }

    /// Close every handler; failures are logged.
    pub fn close_all(&self) {
        for (name, handler) in self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            if let Err(e) = handler.close() {
                warn!(backend = %name, error = %e, "failed to close repository handler");
            }
        }
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("BackendRegistry")
            .field("handlers", &names)
            .finish()
    }
}
