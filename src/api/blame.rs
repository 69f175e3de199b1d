// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Line attribution of one file.

use tracing::debug;

use super::caches::{CacheKey, fetch};
use super::{BuilderOptions, Command, RepositoryService};
use crate::error::{CommandError, ScmResult};
use crate::repository::changeset::BlameResult;
use crate::spi::BlameCommandRequest;

#[derive(Debug)]
pub struct BlameCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: BlameCommandRequest,
    options: BuilderOptions,
}

impl<'a> BlameCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: BlameCommandRequest::default(),
            options: BuilderOptions::default(),
        }
    }

    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.request.path = path.to_string();
        self
    }

    /// `None` blames the default branch head.
    pub fn set_revision(&mut self, revision: Option<&str>) -> &mut Self {
        self.request.revision = revision.map(str::to_string);
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

    pub fn reset(&mut self) -> &mut Self {
        self.request.reset();
        self.options = BuilderOptions::default();
        self
    }

    /// # Errors
    ///
    /// `InvalidRequest` without a path, `NoResult` if the backend has no
    /// attribution, or the backend's own error.
    pub fn get_blame_result(&self) -> ScmResult<BlameResult> {
        if self.request.path.is_empty() {
            return Err(CommandError::InvalidRequest {
                command: Command::Blame.to_string(),
                message: "a path is required".to_string(),
            }
            .into());
        }

        let service = self.service;
        let repository = service.repository();
        debug!(
            repository = %repository.display_name(),
            path = %self.request.path,
            revision = ?self.request.revision,
            "blame"
        );

        let key = (!self.options.disable_cache)
            .then(|| CacheKey::new(&repository.id, self.request.clone()));
        let mut result = fetch(&service.caches().blame, key, Command::Blame, || {
            service
                .provider()?
                .blame_command()?
                .blame(&service.context(), &self.request)
        })?;

        if !self.options.disable_pre_processors {
            service
                .pipeline()
                .process_blame(repository, &mut result, self.options.escape());
        }
        Ok(result)
    }
}
