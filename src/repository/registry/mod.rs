// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Permission-gated repository registry.
//!
//! ```text
//! create(subject, repo, provision)
//!   admin? --> validate --> handler --> lock(type/name)
//!   duplicate? --> AlreadyExists (store untouched)
//!   id = KeyGenerator, creation_date = now
//!   middleware.create
//!   provision? --> handler.create(dir)        fails: nothing registered
//!   BEFORE_CREATE --> store.add --> CREATE    add fails: storage removed
//!
//! modify(subject, repo)      owner check against the STORED entity
//!   lock(type/name) --> reload, check again
//!   BEFORE_MODIFY --> last_modified = now --> handler.modify --> store --> MODIFY
//!
//! delete(subject, repo)      owner check against the stored entity
//!   archive policy && !archived --> NotArchived (handler untouched)
//!   BEFORE_DELETE --> handler.delete --> store.remove --> DELETE
//! ```
//!
//! Every event goes to the registry listeners first (in registration order,
//! on the calling thread) and then to the process-wide event channel.
//! Mutations of one type/name pair are serialized by a per-key lock that is
//! dropped from the lock table once no caller holds it; events of a mutation
//! are delivered before the call returns.
//!
//! Callers only ever receive copies; the stored instances stay private to the
//! [`RepositoryStore`].

mod listener;

#[cfg(test)]
mod tests;

pub use listener::{RegistryMiddleware, RepositoryListener};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use wax::{Glob, Program};

use super::store::RepositoryStore;
use super::{
    BackendType, HandlerEvent, KeyGenerator, Repository, RepositoryEvent, RepositoryOrder,
    UuidKeyGenerator,
};
use crate::backend::{BackendRegistry, RepositoryHandler};
use crate::error::{RepositoryError, ScmResult};
use crate::event::{EventChannel, ScmEvent};
use crate::hook::dispatch::HookDispatcher;
use crate::hook::{HookContext, RepositoryHookEvent, RepositoryHookType};
use crate::security::{PermissionChecker, PermissionType, Subject};

/// One mutex per `type/name`, held only while a mutation runs.
///
/// An entry is removed by the last caller that used it, so the table only
/// holds keys under contention.
#[derive(Debug, Default)]
struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `action` while holding the lock of `key`.
    fn with_lock<R>(&self, key: String, action: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(self.table().entry(key.clone()).or_default());
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            action()
        };
        let mut locks = self.table();
        drop(lock);
        if locks
            .get(&key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&key);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Repository CRUD, lifecycle events and hook entry points.
pub struct RepositoryRegistry {
    store: Arc<dyn RepositoryStore>,
    backends: Arc<BackendRegistry>,
    permissions: Arc<dyn PermissionChecker>,
    keys: Arc<dyn KeyGenerator>,
    events: Option<Arc<dyn EventChannel>>,
    hooks: Option<Arc<HookDispatcher>>,
    middleware: Vec<Arc<dyn RegistryMiddleware>>,
    listeners: RwLock<Vec<Arc<dyn RepositoryListener>>>,
    archive_before_delete: bool,
    locks: LockTable,
}

impl RepositoryRegistry {
    #[must_use]
    pub fn new(
        store: Arc<dyn RepositoryStore>,
        backends: Arc<BackendRegistry>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            store,
            backends,
            permissions,
            keys: Arc::new(UuidKeyGenerator),
            events: None,
            hooks: None,
            middleware: Vec::new(),
            listeners: RwLock::new(Vec::new()),
            archive_before_delete: false,
            locks: LockTable::default(),
        }
    }

    /// Publish lifecycle events on `events` after the listeners saw them.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventChannel>) -> Self {
        self.events = Some(events);
        self
    }

    /// Dispatch hook events through `hooks`.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HookDispatcher>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    #[must_use]
    pub fn with_key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    /// Refuse to delete repositories that are not archived.
    #[must_use]
    pub const fn with_archive_policy(mut self, archive_before_delete: bool) -> Self {
        self.archive_before_delete = archive_before_delete;
        self
    }

    /// Append `middleware`; middleware runs in the order added.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn RegistryMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn add_listener(&self, listener: Arc<dyn RepositoryListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Returns `false` if `listener` was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn RepositoryListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|known| !Arc::ptr_eq(known, listener));
        listeners.len() != before
    }

    #[must_use]
    pub const fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    #[must_use]
    pub fn permissions(&self) -> &dyn PermissionChecker {
        self.permissions.as_ref()
    }

    #[must_use]
    pub const fn hooks(&self) -> Option<&Arc<HookDispatcher>> {
        self.hooks.as_ref()
    }

    #[must_use]
    pub const fn archive_before_delete(&self) -> bool {
        self.archive_before_delete
    }

    // --- Lifecycle ---

    /// Register `repository`, optionally provisioning its storage first.
    ///
    /// Returns the registered copy with id and creation date assigned.
    ///
    /// # Errors
    ///
    /// `AdminRequired`, `Validation`, `UnknownType`, `NotConfigured`,
    /// `AlreadyExists`, a middleware veto, or the storage/store failure.
    pub fn create(
        &self,
        subject: &Subject,
        repository: Repository,
        provision: bool,
    ) -> ScmResult<Repository> {
        info!(
            repository = %repository.display_name(),
            user = %subject,
            provision,
            "creating repository"
        );
        self.permissions.check_admin(subject)?;
        repository.validate()?;
        let handler = self.backends.configured(&repository.backend)?;

        self.locks.with_lock(repository.display_name(), || {
            self.create_locked(subject, repository, provision, handler.as_ref())
        })
    }

    /// Register a repository whose storage already exists.
    ///
    /// # Errors
    ///
    /// Same as [`RepositoryRegistry::create`].
    pub fn import(&self, subject: &Subject, repository: Repository) -> ScmResult<Repository> {
        self.create(subject, repository, false)
    }

    /// Update the metadata of the repository with the same type and name.
    ///
    /// Id and creation date are taken from the stored entity.
    ///
    /// # Errors
    ///
    /// `Validation`, `NameNotFound`, `PermissionDenied` (owner on the stored
    /// entity), a middleware veto, or the storage/store failure.
    pub fn modify(&self, subject: &Subject, repository: Repository) -> ScmResult<Repository> {
        info!(
            repository = %repository.display_name(),
            user = %subject,
            "modifying repository"
        );
        repository.validate()?;
        let stored = self.stored_by_name(&repository.backend, &repository.name)?;
        self.permissions
            .check(subject, &stored, PermissionType::Owner)?;

        self.locks.with_lock(repository.display_name(), || {
            self.modify_locked(subject, repository)
        })
    }

    /// Set the archived flag of the repository with `id`.
    ///
    /// The flag is applied to the state stored when the lock is taken, so
    /// concurrent changes of other fields are kept.
    ///
    /// # Errors
    ///
    /// `NotFound` or any error of [`RepositoryRegistry::modify`].
    pub fn archive(&self, subject: &Subject, id: &str, archived: bool) -> ScmResult<Repository> {
        let current = self.stored(id)?;
        info!(
            repository = %current.display_name(),
            user = %subject,
            archived,
            "archiving repository"
        );
        self.permissions
            .check(subject, &current, PermissionType::Owner)?;

        self.locks.with_lock(current.display_name(), || {
            let mut repository = self.stored(id)?;
            repository.archived = archived;
            self.modify_locked(subject, repository)
        })
    }

    /// Remove the repository with the type and name of `repository`,
    /// including its storage.
    ///
    /// # Errors
    ///
    /// `NameNotFound`, `PermissionDenied`, `NotArchived` under the archive
    /// policy, a middleware veto, or the storage/store failure.
    pub fn delete(&self, subject: &Subject, repository: &Repository) -> ScmResult<()> {
        info!(
            repository = %repository.display_name(),
            user = %subject,
            "deleting repository"
        );
        let stored = self.stored_by_name(&repository.backend, &repository.name)?;
        self.permissions
            .check(subject, &stored, PermissionType::Owner)?;

        self.locks.with_lock(stored.display_name(), || {
            self.delete_locked(subject, repository)
        })
    }

    /// Overwrite `repository` with the stored state of the same type/name.
    ///
    /// # Errors
    ///
    /// `NameNotFound` or `PermissionDenied`.
    pub fn refresh(&self, subject: &Subject, repository: &mut Repository) -> ScmResult<()> {
        let stored = self.stored_by_name(&repository.backend, &repository.name)?;
        self.permissions.check(subject, &stored, PermissionType::Read)?;
        *repository = stored;
        Ok(())
    }

    // --- Queries ---

    /// # Errors
    ///
    /// `PermissionDenied` if the repository exists but is not readable, or
    /// a store failure.
    pub fn get(&self, subject: &Subject, id: &str) -> ScmResult<Option<Repository>> {
        self.readable(subject, self.store.get(id)?)
    }

    /// # Errors
    ///
    /// Same as [`RepositoryRegistry::get`].
    pub fn get_by_name(
        &self,
        subject: &Subject,
        backend: &str,
        name: &str,
    ) -> ScmResult<Option<Repository>> {
        self.readable(subject, self.store.get_by_name(backend, name)?)
    }

    /// Readable repositories, ordered, then windowed by `start`/`limit`.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read.
    pub fn get_all(
        &self,
        subject: &Subject,
        order: RepositoryOrder,
        start: usize,
        limit: Option<usize>,
    ) -> ScmResult<Vec<Repository>> {
        let mut repositories: Vec<Repository> = self
            .store
            .all()?
            .into_iter()
            .filter(|repository| {
                self.permissions
                    .has_permission(subject, repository, PermissionType::Read)
            })
            .collect();
        repositories.sort_by(|a, b| order.compare(a, b));
        Ok(repositories
            .into_iter()
            .skip(start)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Readable repositories whose name matches the glob `pattern`.
    ///
    /// # Errors
    ///
    /// `Validation` for an invalid pattern, or a store failure.
    pub fn search(&self, subject: &Subject, pattern: &str) -> ScmResult<Vec<Repository>> {
        let glob = Glob::new(pattern).map_err(|e| RepositoryError::Validation {
            field: "pattern".to_string(),
            message: e.to_string(),
        })?;
        Ok(self
            .get_all(subject, RepositoryOrder::Name, 0, None)?
            .into_iter()
            .filter(|repository| glob.is_match(repository.name.as_str()))
            .collect())
    }

    /// The repository addressed by `type/name[/path/inside]`.
    ///
    /// When nested names both match, the longest name wins.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` if the match is not readable, or a store failure.
    pub fn get_from_uri(&self, subject: &Subject, uri: &str) -> ScmResult<Option<Repository>> {
        let uri = uri.trim_start_matches('/');
        let Some((backend, rest)) = uri.split_once('/') else {
            return Ok(None);
        };
        if !self.backends.contains(backend) {
            debug!(backend, "uri addresses an unknown repository type");
            return Ok(None);
        }
        let found = self
            .store
            .all()?
            .into_iter()
            .filter(|repository| repository.backend == backend && repository.matches_uri(rest))
            .max_by_key(|repository| repository.name.len());
        self.readable(subject, found)
    }

    /// The managed repository whose storage holds the local `location`.
    ///
    /// `location` is a path or `file://` URL; relative paths are taken from
    /// `base`. URLs of other schemes and paths outside every repository
    /// directory give `None`.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` without `permission` on the match, or a store
    /// failure.
    pub fn get_by_location(
        &self,
        subject: &Subject,
        base: &Path,
        location: &str,
        permission: PermissionType,
    ) -> ScmResult<Option<Repository>> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        let Ok(path) = base.join(path).canonicalize() else {
            return Ok(None);
        };
        let found = self
            .store
            .all()?
            .into_iter()
            .filter_map(|repository| {
                let directory = self.directory(&repository).ok()?.canonicalize().ok()?;
                path.starts_with(&directory)
                    .then(|| (directory.as_os_str().len(), repository))
            })
            .max_by_key(|(length, _)| *length)
            .map(|(_, repository)| repository);
        if let Some(repository) = &found {
            debug!(
                repository = %repository.display_name(),
                location,
                "location is a managed repository"
            );
            self.permissions.check(subject, repository, permission)?;
        }
        Ok(found)
    }

    /// Registered backend types.
    #[must_use]
    pub fn types(&self) -> Vec<BackendType> {
        self.backends.types()
    }

    /// Backend types whose handler is usable.
    #[must_use]
    pub fn configured_types(&self) -> Vec<BackendType> {
        self.backends.configured_types()
    }

    /// Time of the last metadata change.
    #[must_use]
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.store.last_modified()
    }

    /// Storage directory of `repository`.
    ///
    /// # Errors
    ///
    /// `UnknownType` for unregistered backends.
    pub fn directory(&self, repository: &Repository) -> ScmResult<PathBuf> {
        Ok(self.backends.get(&repository.backend)?.directory(repository))
    }

    // --- Hooks ---

    /// Dispatch a hook event for the repository with `id`.
    ///
    /// Hooks run with `subject` bound as the current identity.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `HookRejected` when a pre-receive hook vetoes.
    pub fn fire_hook_event(
        &self,
        subject: &Subject,
        id: &str,
        hook_type: RepositoryHookType,
        context: Arc<HookContext>,
    ) -> ScmResult<()> {
        let repository = self.stored(id)?;
        self.dispatch_hook(subject, repository, hook_type, context)
    }

    /// Dispatch a hook event for the repository `backend/name`.
    ///
    /// # Errors
    ///
    /// `NameNotFound`, or `HookRejected` when a pre-receive hook vetoes.
    pub fn fire_hook_event_by_name(
        &self,
        subject: &Subject,
        backend: &str,
        name: &str,
        hook_type: RepositoryHookType,
        context: Arc<HookContext>,
    ) -> ScmResult<()> {
        let repository = self.stored_by_name(backend, name)?;
        self.dispatch_hook(subject, repository, hook_type, context)
    }

    /// Run `apply` between the pre-receive and post-receive dispatch.
    ///
    /// `apply` is not called when a pre-receive hook vetoes; post-receive
    /// hooks only run after `apply` succeeded.
    ///
    /// # Errors
    ///
    /// The veto, the error of `apply`, or `NotFound`.
    pub fn receive<R>(
        &self,
        subject: &Subject,
        id: &str,
        context: Arc<HookContext>,
        apply: impl FnOnce(&Repository) -> ScmResult<R>,
    ) -> ScmResult<R> {
        let repository = self
            .store
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;
        self.dispatch_hook(
            subject,
            repository.clone(),
            RepositoryHookType::PreReceive,
            Arc::clone(&context),
        )?;
        let applied = apply(&repository)?;
        self.dispatch_hook(subject, repository, RepositoryHookType::PostReceive, context)?;
        Ok(applied)
    }

    fn dispatch_hook(
        &self,
        subject: &Subject,
        repository: Repository,
        hook_type: RepositoryHookType,
        context: Arc<HookContext>,
    ) -> ScmResult<()> {
        let Some(hooks) = &self.hooks else {
            debug!(
                repository = %repository.display_name(),
                hook_type = %hook_type,
                "no hook dispatcher, ignoring hook event"
            );
            return Ok(());
        };
        let event = RepositoryHookEvent::new(repository, hook_type, context, subject.clone());
        subject.scope(|| hooks.fire(event))
    }

    // --- Internals ---

    fn create_locked(
        &self,
        subject: &Subject,
        mut repository: Repository,
        provision: bool,
        handler: &dyn RepositoryHandler,
    ) -> ScmResult<Repository> {
        if self.store.contains(&repository.backend, &repository.name)? {
            return Err(RepositoryError::AlreadyExists {
                backend: repository.backend,
                name: repository.name,
            }
            .into());
        }

        repository.id = self.keys.create_key();
        repository.creation_date = Some(Utc::now());
        repository.last_modified = None;
        for middleware in &self.middleware {
            middleware.create(subject, &mut repository)?;
        }

        let directory = handler.directory(&repository);
        if provision {
            handler.create(&repository, &directory)?;
        }

        self.fire(HandlerEvent::BeforeCreate, &repository, None, subject);
        if let Err(e) = self.store.add(repository.clone()) {
            if provision && let Err(cleanup) = handler.delete(&repository, &directory) {
                warn!(
                    repository = %repository.display_name(),
                    error = %cleanup,
                    "could not remove storage after failed registration"
                );
            }
            return Err(e);
        }
        self.fire(HandlerEvent::Create, &repository, None, subject);
        Ok(repository)
    }

    /// Permissions are checked again: they may have changed while waiting.
    fn modify_locked(
        &self,
        subject: &Subject,
        mut repository: Repository,
    ) -> ScmResult<Repository> {
        let stored = self.stored_by_name(&repository.backend, &repository.name)?;
        self.permissions
            .check(subject, &stored, PermissionType::Owner)?;
        let handler = self.backends.configured(&stored.backend)?;

        repository.id.clone_from(&stored.id);
        repository.creation_date = stored.creation_date;
        for middleware in &self.middleware {
            middleware.modify(subject, &mut repository, &stored)?;
        }

        self.fire(HandlerEvent::BeforeModify, &repository, Some(&stored), subject);
        repository.last_modified = Some(Utc::now());
        handler.modify(&repository, &handler.directory(&repository))?;
        self.store.modify(repository.clone())?;
        self.fire(HandlerEvent::Modify, &repository, Some(&stored), subject);
        Ok(repository)
    }

    fn delete_locked(&self, subject: &Subject, repository: &Repository) -> ScmResult<()> {
        let stored = self.stored_by_name(&repository.backend, &repository.name)?;
        self.permissions
            .check(subject, &stored, PermissionType::Owner)?;
        if self.archive_before_delete && !stored.archived {
            return Err(RepositoryError::NotArchived {
                name: stored.display_name(),
            }
            .into());
        }
        for middleware in &self.middleware {
            middleware.delete(subject, &stored)?;
        }
        let handler = self.backends.configured(&stored.backend)?;

        self.fire(HandlerEvent::BeforeDelete, &stored, None, subject);
        handler.delete(&stored, &handler.directory(&stored))?;
        self.store.remove(&stored.id)?;
        self.fire(HandlerEvent::Delete, &stored, None, subject);
        Ok(())
    }

    fn stored(&self, id: &str) -> ScmResult<Repository> {
        self.store
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() }.into())
    }

    fn stored_by_name(&self, backend: &str, name: &str) -> ScmResult<Repository> {
        self.store.get_by_name(backend, name)?.ok_or_else(|| {
            RepositoryError::NameNotFound {
                backend: backend.to_string(),
                name: name.to_string(),
            }
            .into()
        })
    }

    fn readable(
        &self,
        subject: &Subject,
        repository: Option<Repository>,
    ) -> ScmResult<Option<Repository>> {
        match repository {
            Some(repository) => {
                self.permissions
                    .check(subject, &repository, PermissionType::Read)?;
                Ok(Some(repository))
            }
            None => Ok(None),
        }
    }

    fn fire(
        &self,
        kind: HandlerEvent,
        repository: &Repository,
        old: Option<&Repository>,
        subject: &Subject,
    ) {
        let event = RepositoryEvent::new(kind, repository.clone(), old.cloned(), subject.clone());
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(
            event = %kind,
            repository = %repository.display_name(),
            listeners = listeners.len(),
            "firing repository event"
        );
        for listener in &listeners {
            if let Err(e) = listener.on_event(&event) {
                warn!(
                    event = %kind,
                    repository = %repository.display_name(),
                    error = %e,
                    "repository listener failed"
                );
            }
        }
        if let Some(events) = &self.events {
            events.publish(ScmEvent::Repository(event));
        }
    }
}

impl std::fmt::Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("backends", &self.backends)
            .field("archive_before_delete", &self.archive_before_delete)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
