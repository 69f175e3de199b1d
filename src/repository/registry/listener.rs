// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Listener and middleware seams of the registry.

use crate::error::ScmResult;
use crate::repository::{Repository, RepositoryEvent};
use crate::security::Subject;

/// Receives lifecycle events synchronously, in registration order.
///
/// Errors are logged by the registry and never stop the mutation or the
/// remaining listeners.
pub trait RepositoryListener: Send + Sync {
    fn on_event(&self, event: &RepositoryEvent) -> ScmResult<()>;
}

impl<F> RepositoryListener for F
where
    F: Fn(&RepositoryEvent) -> ScmResult<()> + Send + Sync,
{
    fn on_event(&self, event: &RepositoryEvent) -> ScmResult<()> {
        self(event)
    }
}

/// Interceptor around registry mutations.
///
/// Runs after permission checks and validation, before any event fires or
/// storage is touched. Returning an error aborts the mutation.
pub trait RegistryMiddleware: Send + Sync {
    /// Adjust or veto a repository about to be created.
    fn create(&self, _subject: &Subject, _repository: &mut Repository) -> ScmResult<()> {
        Ok(())
    }

    /// Adjust or veto a modification; `stored` is the current state.
    fn modify(
        &self,
        _subject: &Subject,
        _repository: &mut Repository,
        _stored: &Repository,
    ) -> ScmResult<()> {
        Ok(())
    }

    /// Veto a delete.
    fn delete(&self, _subject: &Subject, _repository: &Repository) -> ScmResult<()> {
        Ok(())
    }
}
