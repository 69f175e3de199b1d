// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Invalidation of command caches when a repository changes.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::RepositoryScopedCache;
use crate::error::ScmResult;
use crate::hook::{RepositoryHook, RepositoryHookEvent, RepositoryHookType};
use crate::repository::registry::RepositoryListener;
use crate::repository::{HandlerEvent, RepositoryEvent};

const HOOK_TYPES: &[RepositoryHookType] = &[RepositoryHookType::PostReceive];

/// Clears cached command results of a repository after a push, a modify,
/// or a delete.
#[derive(Default)]
pub struct CacheClearHook {
    caches: RwLock<Vec<Arc<dyn RepositoryScopedCache>>>,
}

impl CacheClearHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `cache`; registering the same cache twice is harmless.
    pub fn register(&self, cache: Arc<dyn RepositoryScopedCache>) {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        if !caches.iter().any(|known| known.name() == cache.name()) {
            caches.push(cache);
        }
    }

    /// Drop the entries of `repository_id` from every tracked cache.
    pub fn clear(&self, repository_id: &str) -> usize {
        let removed = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|cache| cache.clear_repository(repository_id))
            .sum();
        debug!(repository = repository_id, removed, "cleared repository caches");
        removed
    }
}

impl RepositoryHook for CacheClearHook {
    fn name(&self) -> &str {
        "cache-clear"
    }

    fn hook_types(&self) -> &[RepositoryHookType] {
        HOOK_TYPES
    }

    fn on_event(&self, event: &RepositoryHookEvent) -> ScmResult<()> {
        self.clear(&event.repository().id);
        Ok(())
    }
}

impl RepositoryListener for CacheClearHook {
    fn on_event(&self, event: &RepositoryEvent) -> ScmResult<()> {
        if matches!(event.kind(), HandlerEvent::Modify | HandlerEvent::Delete) {
            self.clear(&event.repository().id);
        }
        Ok(())
    }
}

impl std::fmt::Debug for CacheClearHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|cache| cache.name().to_string())
            .collect();
        f.debug_struct("CacheClearHook").field("caches", &names).finish()
    }
}
