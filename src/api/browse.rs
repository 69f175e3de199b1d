// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Directory listings.

use tracing::debug;

use super::caches::{CacheKey, fetch};
use super::{BuilderOptions, Command, RepositoryService};
use crate::error::ScmResult;
use crate::repository::changeset::BrowserResult;
use crate::spi::BrowseCommandRequest;

#[derive(Debug)]
pub struct BrowseCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: BrowseCommandRequest,
    options: BuilderOptions,
}

impl<'a> BrowseCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: BrowseCommandRequest::default(),
            options: BuilderOptions::default(),
        }
    }

    /// `None` lists the root.
    pub fn set_path(&mut self, path: Option<&str>) -> &mut Self {
        self.request.path = path.map(str::to_string);
        self
    }

    pub fn set_revision(&mut self, revision: Option<&str>) -> &mut Self {
        self.request.revision = revision.map(str::to_string);
        self
    }

    pub const fn set_recursive(&mut self, recursive: bool) -> &mut Self {
        self.request.recursive = recursive;
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
    /// `NoResult` if the path does not exist at the revision, or the
    /// backend's own error.
    pub fn get_browser_result(&self) -> ScmResult<BrowserResult> {
        let service = self.service;
        let repository = service.repository();
        debug!(
            repository = %repository.display_name(),
            path = ?self.request.path,
            recursive = self.request.recursive,
            "browse"
        );

        let key = (!self.options.disable_cache)
            .then(|| CacheKey::new(&repository.id, self.request.clone()));
        let mut result = fetch(&service.caches().browse, key, Command::Browse, || {
            service
                .provider()?
                .browse_command()?
                .browse(&service.context(), &self.request)
        })?;

        if !self.options.disable_pre_processors {
            service
                .pipeline()
                .process_browse(repository, &mut result, self.options.escape());
        }
        Ok(result)
    }
}
