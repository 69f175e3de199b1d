// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Result caches of the command builders.
//!
//! ```text
//! fetch(cache, key, load)
//!   key == None (cache disabled) --> load()            cache untouched
//!   cache.get(key) hit           --> cached value      backend untouched
//!   miss --> load() --> Some(v) --> cache.put(key, v) --> v
//!                   --> None    --> NoResult           nothing cached
//! ```
//!
//! Values are stored exactly as the backend returned them. Concurrent misses
//! on one key may both reach the backend; the later put wins.

use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use super::Command;
use crate::cache::{
    CacheClearHook, CacheManager, CacheStore, MemoryCache, RepositoryCacheKey,
};
use crate::error::{CommandError, ScmResult};
use crate::repository::changeset::{
    BlameResult, Branches, BrowserResult, Changeset, ChangesetPagingResult, Tags,
};
use crate::spi::{
    BlameCommandRequest, BrowseCommandRequest, LogCommandRequest, PagedRemoteCommandRequest,
};

pub const LOG_CACHE: &str = "scm.cache.log";
pub const CHANGESET_CACHE: &str = "scm.cache.changeset";
pub const BLAME_CACHE: &str = "scm.cache.blame";
pub const BROWSE_CACHE: &str = "scm.cache.browse";
pub const TAGS_CACHE: &str = "scm.cache.tags";
pub const BRANCHES_CACHE: &str = "scm.cache.branches";
pub const INCOMING_CACHE: &str = "scm.cache.incoming";
pub const OUTGOING_CACHE: &str = "scm.cache.outgoing";

/// Identity of a cached command result: the repository plus a snapshot of
/// the whole request.
///
/// The request is cloned into the key, so later changes to a builder never
/// alter a stored key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey<R> {
    repository_id: String,
    request: R,
}

impl<R> CacheKey<R> {
    pub fn new(repository_id: impl Into<String>, request: R) -> Self {
        Self {
            repository_id: repository_id.into(),
            request,
        }
    }

    #[must_use]
    pub const fn request(&self) -> &R {
        &self.request
    }
}

impl<R> RepositoryCacheKey for CacheKey<R> {
    fn repository_id(&self) -> &str {
        &self.repository_id
    }
}

pub type Cache<R, V> = Arc<MemoryCache<CacheKey<R>, V>>;

/// The named caches shared by every repository service.
#[derive(Clone)]
pub struct CommandCaches {
    pub(crate) log: Cache<LogCommandRequest, ChangesetPagingResult>,
    pub(crate) changeset: Cache<String, Changeset>,
    pub(crate) blame: Cache<BlameCommandRequest, BlameResult>,
    pub(crate) browse: Cache<BrowseCommandRequest, BrowserResult>,
    pub(crate) tags: Cache<(), Tags>,
    pub(crate) branches: Cache<(), Branches>,
    pub(crate) incoming: Cache<PagedRemoteCommandRequest, ChangesetPagingResult>,
    pub(crate) outgoing: Cache<PagedRemoteCommandRequest, ChangesetPagingResult>,
}

impl CommandCaches {
    /// Look up (or create) every command cache in `manager`.
    ///
    /// # Errors
    ///
    /// Fails if a cache name is already taken by a cache of other types.
    pub fn new(manager: &CacheManager) -> ScmResult<Self> {
        Ok(Self {
            log: manager.cache(LOG_CACHE)?,
            changeset: manager.cache(CHANGESET_CACHE)?,
            blame: manager.cache(BLAME_CACHE)?,
            browse: manager.cache(BROWSE_CACHE)?,
            tags: manager.cache(TAGS_CACHE)?,
            branches: manager.cache(BRANCHES_CACHE)?,
            incoming: manager.cache(INCOMING_CACHE)?,
            outgoing: manager.cache(OUTGOING_CACHE)?,
        })
    }

    /// Let `hook` clear these caches when a repository changes.
    pub fn register(&self, hook: &CacheClearHook) {
        hook.register(self.log.clone());
        hook.register(self.changeset.clone());
        hook.register(self.blame.clone());
        hook.register(self.browse.clone());
        hook.register(self.tags.clone());
        hook.register(self.branches.clone());
        hook.register(self.incoming.clone());
        hook.register(self.outgoing.clone());
    }
}

impl std::fmt::Debug for CommandCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCaches").finish_non_exhaustive()
    }
}

/// Serve from `cache` under `key`, or load and store.
///
/// `key` is `None` when caching is disabled for the call.
pub(crate) fn fetch<K, V>(
    cache: &MemoryCache<K, V>,
    key: Option<K>,
    command: Command,
    load: impl FnOnce() -> ScmResult<Option<V>>,
) -> ScmResult<V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Some(key) = key else {
        debug!(command = %command, "cache disabled, calling backend");
        return load()?.ok_or_else(|| no_result(command));
    };

    if let Some(hit) = cache.get(&key) {
        debug!(cache = cache.name(), command = %command, "cache hit");
        return Ok(hit);
    }

    debug!(cache = cache.name(), command = %command, "cache miss");
    let value = load()?.ok_or_else(|| no_result(command))?;
    cache.put(key, value.clone());
    Ok(value)
}

fn no_result(command: Command) -> crate::error::ScmError {
    CommandError::NoResult {
        command: command.to_string(),
    }
    .into()
}
