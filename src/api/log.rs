// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Changeset history.

use tracing::debug;

use super::caches::{CacheKey, fetch};
use super::{BuilderOptions, Command, RepositoryService};
use crate::error::{CommandError, ScmResult};
use crate::repository::changeset::{Changeset, ChangesetPagingResult};
use crate::spi::LogCommandRequest;

/// Reads changesets, one page at a time or by id.
///
/// ```text
/// service.log_command()?
///     .set_branch(Some("main"))
///     .set_paging_start(20)
///     .set_paging_limit(Some(10))
///     .get_changesets()?
/// ```
#[derive(Debug)]
pub struct LogCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: LogCommandRequest,
    options: BuilderOptions,
}

impl<'a> LogCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: LogCommandRequest::default(),
            options: BuilderOptions::default(),
        }
    }

    /// Newest changeset of the range.
    pub fn set_start_changeset(&mut self, id: Option<&str>) -> &mut Self {
        self.request.start_changeset = id.map(str::to_string);
        self
    }

    /// Oldest changeset of the range.
    pub fn set_end_changeset(&mut self, id: Option<&str>) -> &mut Self {
        self.request.end_changeset = id.map(str::to_string);
        self
    }

    pub fn set_branch(&mut self, branch: Option<&str>) -> &mut Self {
        self.request.branch = branch.map(str::to_string);
        self
    }

    /// Only changesets touching `path`.
    pub fn set_path(&mut self, path: Option<&str>) -> &mut Self {
        self.request.path = path.map(str::to_string);
        self
    }

    pub const fn set_paging_start(&mut self, start: usize) -> &mut Self {
        self.request.paging_start = start;
        self
    }

    /// `None` returns the whole range.
    pub const fn set_paging_limit(&mut self, limit: Option<usize>) -> &mut Self {
        self.request.paging_limit = limit;
        self
    }

    pub const fn set_disable_cache(&mut self, disable: bool) -> &mut Self {
        self.options.disable_cache = disable;
        self
    }

    pub const fn set_disable_pre_processors(&mut self, disable: bool) -> &mut Self {
        self.options.disable_pre_processors = disable;
        self
    }

    pub const fn set_disable_escaping(&mut self, disable: bool) -> &mut Self {
        self.options.disable_escaping = disable;
        self
    }

    /// Back to the defaults: first page of 20, caching and processing on.
    pub fn reset(&mut self) -> &mut Self {
        self.request.reset();
        self.options = BuilderOptions::default();
        self
    }

    #[must_use]
    pub const fn request(&self) -> &LogCommandRequest {
        &self.request
    }

    /// # Errors
    ///
    /// `NoResult` if the backend has nothing for the request, or the
    /// backend's own error.
    pub fn get_changesets(&self) -> ScmResult<ChangesetPagingResult> {
        let service = self.service;
        let repository = service.repository();
        debug!(
            repository = %repository.display_name(),
            start = self.request.paging_start,
            limit = ?self.request.paging_limit,
            "log"
        );

        let key = (!self.options.disable_cache)
            .then(|| CacheKey::new(&repository.id, self.request.clone()));
        let mut result = fetch(&service.caches().log, key, Command::Log, || {
            service
                .provider()?
                .log_command()?
                .changesets(&service.context(), &self.request)
        })?;

        if !self.options.disable_pre_processors {
            service.pipeline().process_changesets(
                repository,
                &mut result.changesets,
                self.options.escape(),
            );
        }
        Ok(result)
    }

    /// One changeset by id; range and paging settings are ignored.
    ///
    /// # Errors
    ///
    /// `ChangesetNotFound` if the backend does not know `id`.
    pub fn get_changeset(&self, id: &str) -> ScmResult<Changeset> {
        let service = self.service;
        let repository = service.repository();
        debug!(repository = %repository.display_name(), id, "log changeset");

        let key = (!self.options.disable_cache)
            .then(|| CacheKey::new(&repository.id, id.to_string()));
        let mut changeset = fetch(&service.caches().changeset, key, Command::Log, || {
            service
                .provider()?
                .log_command()?
                .changeset(&service.context(), id)?
                .map(Some)
                .ok_or_else(|| CommandError::ChangesetNotFound { id: id.to_string() }.into())
        })?;

        if !self.options.disable_pre_processors {
            service
                .pipeline()
                .process_changeset(repository, &mut changeset, self.options.escape());
        }
        Ok(changeset)
    }
}
