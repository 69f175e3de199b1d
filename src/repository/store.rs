// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository metadata persistence.
//!
//! ```text
//! RepositoryStore (trait, concurrent)
//!    |-- MemoryStore     RwLock<StoreState>
//!    '-- JsonFileStore   RwLock<StoreState> + atomic rewrite on mutation
//!                        tempfile in same dir --> persist() over target
//! ```

use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Repository;
use crate::error::{RepositoryError, ScmResult};

/// Keyed store of repository metadata.
///
/// Implementations synchronize internally; callers never lock.
pub trait RepositoryStore: Send + Sync {
    /// Insert a new repository.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyExists` if the id or the type/name pair is taken.
    fn add(&self, repository: Repository) -> ScmResult<()>;

    /// Replace the repository with the same id.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if no repository has this id.
    fn modify(&self, repository: Repository) -> ScmResult<()>;

    /// Remove the repository with this id.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if no repository has this id.
    fn remove(&self, id: &str) -> ScmResult<()>;

    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn get(&self, id: &str) -> ScmResult<Option<Repository>>;

    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn get_by_name(&self, backend: &str, name: &str) -> ScmResult<Option<Repository>>;

    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn all(&self) -> ScmResult<Vec<Repository>>;

    /// Time of the last mutation.
    fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// # Errors
    ///
    /// Fails if the store cannot be read.
    fn contains(&self, backend: &str, name: &str) -> ScmResult<bool> {
        Ok(self.get_by_name(backend, name)?.is_some())
    }
}

/// Serialized form shared by both stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    repositories: Vec<Repository>,
}

impl StoreState {
    fn position(&self, id: &str) -> Option<usize> {
        self.repositories.iter().position(|r| r.id == id)
    }

    fn find_by_name(&self, backend: &str, name: &str) -> Option<&Repository> {
        self.repositories
            .iter()
            .find(|r| r.backend == backend && r.name == name)
    }

    fn add(&mut self, repository: Repository) -> ScmResult<()> {
        if self.position(&repository.id).is_some()
            || self
                .find_by_name(&repository.backend, &repository.name)
                .is_some()
        {
            return Err(RepositoryError::AlreadyExists {
                backend: repository.backend,
                name: repository.name,
            }
            .into());
        }
        self.repositories.push(repository);
        self.last_modified = Some(Utc::now());
        Ok(())
    }

    fn modify(&mut self, repository: Repository) -> ScmResult<()> {
        let index = self
            .position(&repository.id)
            .ok_or_else(|| RepositoryError::NotFound {
                id: repository.id.clone(),
            })?;
        self.repositories[index] = repository;
        self.last_modified = Some(Utc::now());
        Ok(())
    }

    fn remove(&mut self, id: &str) -> ScmResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;
        self.repositories.remove(index);
        self.last_modified = Some(Utc::now());
        Ok(())
    }
}

/// Volatile store, used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryStore for MemoryStore {
    fn add(&self, repository: Repository) -> ScmResult<()> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(repository)
    }

    fn modify(&self, repository: Repository) -> ScmResult<()> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .modify(repository)
    }

    fn remove(&self, id: &str) -> ScmResult<()> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    fn get(&self, id: &str) -> ScmResult<Option<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.position(id).map(|i| state.repositories[i].clone()))
    }

    fn get_by_name(&self, backend: &str, name: &str) -> ScmResult<Option<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.find_by_name(backend, name).cloned())
    }

    fn all(&self) -> ScmResult<Vec<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.repositories.clone())
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_modified
    }
}

/// Store persisted as a JSON document.
///
/// The whole document is rewritten on every mutation through a temporary
/// file in the same directory, so readers never observe a partial file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the file exists but cannot be read
    /// or parsed.
    pub fn open(path: impl Into<PathBuf>) -> ScmResult<Self> {
        let path = path.into();
        let state = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| store_error(&path, &e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(store_error(&path, &e)),
        };
        debug!(
            path = %path.display(),
            repositories = state.repositories.len(),
            "opened repository store"
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutation` and persist; the in-memory state only changes if the
    /// write succeeds.
    fn mutate(&self, mutation: impl FnOnce(&mut StoreState) -> ScmResult<()>) -> ScmResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        mutation(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, state: &StoreState) -> ScmResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| store_error(&self.path, &e))?;

        let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| store_error(&self.path, &e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| store_error(&self.path, &e))?;
            writer.flush().map_err(|e| store_error(&self.path, &e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| store_error(&self.path, &e))?;
        temp.persist(&self.path)
            .map_err(|e| store_error(&self.path, &e.error))?;
        Ok(())
    }
}

impl RepositoryStore for JsonFileStore {
    fn add(&self, repository: Repository) -> ScmResult<()> {
        self.mutate(|state| state.add(repository))
    }

    fn modify(&self, repository: Repository) -> ScmResult<()> {
        self.mutate(|state| state.modify(repository))
    }

    fn remove(&self, id: &str) -> ScmResult<()> {
        self.mutate(|state| state.remove(id))
    }

    fn get(&self, id: &str) -> ScmResult<Option<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.position(id).map(|i| state.repositories[i].clone()))
    }

    fn get_by_name(&self, backend: &str, name: &str) -> ScmResult<Option<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.find_by_name(backend, name).cloned())
    }

    fn all(&self) -> ScmResult<Vec<Repository>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.repositories.clone())
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_modified
    }
}

fn store_error(path: &Path, error: &dyn std::fmt::Display) -> crate::error::ScmError {
    RepositoryError::Store {
        message: format!("{}: {error}", path.display()),
    }
    .into()
}
