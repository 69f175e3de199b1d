// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tags and branches.

use tracing::debug;

use super::caches::{CacheKey, fetch};
use super::{Command, RepositoryService};
use crate::error::ScmResult;
use crate::repository::changeset::{Branches, Tags};

#[derive(Debug)]
pub struct TagsCommandBuilder<'a> {
    service: &'a RepositoryService,
    disable_cache: bool,
}

impl<'a> TagsCommandBuilder<'a> {
    pub(crate) const fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            disable_cache: false,
        }
    }

    pub const fn set_disable_cache(&mut self, disable: bool) -> &mut Self {
        self.disable_cache = disable;
        self
    }

    pub const fn reset(&mut self) -> &mut Self {
        self.disable_cache = false;
        self
    }

    /// # Errors
    ///
    /// `NoResult` if the backend reports no tags, or the backend's own error.
    pub fn get_tags(&self) -> ScmResult<Tags> {
        let service = self.service;
        let repository = service.repository();
        debug!(repository = %repository.display_name(), "tags");

        let key = (!self.disable_cache).then(|| CacheKey::new(&repository.id, ()));
        fetch(&service.caches().tags, key, Command::Tags, || {
            service.provider()?.tags_command()?.tags(&service.context())
        })
    }
}

#[derive(Debug)]
pub struct BranchesCommandBuilder<'a> {
    service: &'a RepositoryService,
    disable_cache: bool,
}

impl<'a> BranchesCommandBuilder<'a> {
    pub(crate) const fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            disable_cache: false,
        }
    }

    pub const fn set_disable_cache(&mut self, disable: bool) -> &mut Self {
        self.disable_cache = disable;
        self
    }

    pub const fn reset(&mut self) -> &mut Self {
        self.disable_cache = false;
        self
    }

    /// # Errors
    ///
    /// `NoResult` if the backend reports no branches, or the backend's own
    /// error.
    pub fn get_branches(&self) -> ScmResult<Branches> {
        let service = self.service;
        let repository = service.repository();
        debug!(repository = %repository.display_name(), "branches");

        let key = (!self.disable_cache).then(|| CacheKey::new(&repository.id, ()));
        fetch(&service.caches().branches, key, Command::Branches, || {
            service
                .provider()?
                .branches_command()?
                .branches(&service.context())
        })
    }
}
