// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exchange with another repository.
//!
//! Incoming and outgoing results are cached per remote and page. A pull
//! changes the local repository, so it drops every cached result of it.
//!
//! ```text
//! remote is a managed repository --> READ on it (WRITE for push)
//! pull                           --> WRITE on the local repository
//! ```

use tracing::{debug, info};

use super::caches::{Cache, CacheKey, fetch};
use super::{BuilderOptions, Command, RepositoryService};
use crate::error::{CommandError, ScmResult};
use crate::repository::Repository;
use crate::repository::changeset::{ChangesetPagingResult, PullResponse, PushResponse};
use crate::security::PermissionType;
use crate::spi::{PagedRemoteCommandRequest, RemoteCommandRequest};

/// Shared state of the incoming and outgoing builders.
#[derive(Debug)]
struct Comparison<'a> {
    service: &'a RepositoryService,
    command: Command,
    request: PagedRemoteCommandRequest,
    options: BuilderOptions,
}

impl<'a> Comparison<'a> {
    fn new(service: &'a RepositoryService, command: Command) -> Self {
        Self {
            service,
            command,
            request: PagedRemoteCommandRequest::default(),
            options: BuilderOptions::default(),
        }
    }

    fn cache(&self) -> &'a Cache<PagedRemoteCommandRequest, ChangesetPagingResult> {
        let caches = self.service.caches();
        if self.command == Command::Incoming {
            &caches.incoming
        } else {
            &caches.outgoing
        }
    }

    fn get_changesets(&self) -> ScmResult<ChangesetPagingResult> {
        if self.request.remote.is_empty() {
            return Err(missing_remote(self.command));
        }
        let service = self.service;
        service.authorize_remote(&self.request.remote, PermissionType::Read)?;
        let repository = service.repository();
        debug!(
            repository = %repository.display_name(),
            command = %self.command,
            remote = %self.request.remote,
            "comparing with remote"
        );

        let key = (!self.options.disable_cache)
            .then(|| CacheKey::new(&repository.id, self.request.clone()));
        let mut result = fetch(self.cache(), key, self.command, || {
            let provider = service.provider()?;
            let context = service.context();
            if self.command == Command::Incoming {
                provider.incoming_command()?.incoming(&context, &self.request)
            } else {
                provider.outgoing_command()?.outgoing(&context, &self.request)
            }
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
}

/// Changesets of a remote that are missing locally.
#[derive(Debug)]
pub struct IncomingCommandBuilder<'a>(Comparison<'a>);

/// Local changesets that are missing in a remote.
#[derive(Debug)]
pub struct OutgoingCommandBuilder<'a>(Comparison<'a>);

impl<'a> IncomingCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self(Comparison::new(service, Command::Incoming))
    }
}

impl<'a> OutgoingCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self(Comparison::new(service, Command::Outgoing))
    }
}

macro_rules! comparison_builder {
    ($builder:ident) => {
        impl $builder<'_> {
            /// URL or path of the other repository.
            pub fn set_remote(&mut self, remote: &str) -> &mut Self {
                self.0.request.remote = remote.to_string();
                self
            }

            /// Compare with the managed repository `remote`.
            ///
            /// # Errors
            ///
            /// `NotFound` or `PermissionDenied` without READ on `remote`.
            pub fn set_remote_repository(&mut self, remote: &Repository) -> ScmResult<&mut Self> {
                self.0.request.remote = self.0.service.remote_location(remote)?;
                Ok(self)
            }

            pub const fn set_paging_start(&mut self, start: usize) -> &mut Self {
                self.0.request.paging_start = start;
                self
            }

            /// `None` returns every missing changeset.
            pub const fn set_paging_limit(&mut self, limit: Option<usize>) -> &mut Self {
                self.0.request.paging_limit = limit;
                self
            }

            pub const fn set_disable_cache(&mut self, disable: bool) -> &mut Self {
                self.0.options.disable_cache = disable;
                self
            }

            pub const fn set_disable_pre_processors(&mut self, disable: bool) -> &mut Self {
                self.0.options.disable_pre_processors = disable;
                self
            }

            pub const fn set_disable_escaping(&mut self, disable: bool) -> &mut Self {
                self.0.options.disable_escaping = disable;
                self
            }

            pub fn reset(&mut self) -> &mut Self {
                self.0.request.reset();
                self.0.options = BuilderOptions::default();
                self
            }

            /// # Errors
            ///
            /// `InvalidRequest` without a remote, `NoResult` if the backend
            /// reports nothing, or the backend's own error.
            pub fn get_changesets(&self) -> ScmResult<ChangesetPagingResult> {
                self.0.get_changesets()
            }
        }
    };
}

comparison_builder!(IncomingCommandBuilder);
comparison_builder!(OutgoingCommandBuilder);

#[derive(Debug)]
pub struct PushCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: RemoteCommandRequest,
}

impl<'a> PushCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: RemoteCommandRequest::default(),
        }
    }

    pub fn set_remote(&mut self, remote: &str) -> &mut Self {
        self.request.remote = remote.to_string();
        self
    }

    /// Push to the managed repository `remote`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied` without READ on `remote`.
    pub fn set_remote_repository(&mut self, remote: &Repository) -> ScmResult<&mut Self> {
        self.request.remote = self.service.remote_location(remote)?;
        Ok(self)
    }

    /// Push every local changeset the remote lacks.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` without a remote, `PermissionDenied` without WRITE
    /// on a managed remote, or the backend's own error.
    pub fn push(&self) -> ScmResult<PushResponse> {
        if self.request.remote.is_empty() {
            return Err(missing_remote(Command::Push));
        }
        let service = self.service;
        service.authorize_remote(&self.request.remote, PermissionType::Write)?;
        let response = service
            .provider()?
            .push_command()?
            .push(&service.context(), &self.request)?;
        info!(
            repository = %service.repository().display_name(),
            remote = %self.request.remote,
            changesets = response.changesets,
            "pushed"
        );
        Ok(response)
    }
}

#[derive(Debug)]
pub struct PullCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: RemoteCommandRequest,
}

impl<'a> PullCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: RemoteCommandRequest::default(),
        }
    }

    pub fn set_remote(&mut self, remote: &str) -> &mut Self {
        self.request.remote = remote.to_string();
        self
    }

    /// Pull from the managed repository `remote`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `PermissionDenied` without READ on `remote`.
    pub fn set_remote_repository(&mut self, remote: &Repository) -> ScmResult<&mut Self> {
        self.request.remote = self.service.remote_location(remote)?;
        Ok(self)
    }

    /// Pull every remote changeset missing locally and drop this
    /// repository's cached results.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` without a remote, `PermissionDenied` without WRITE
    /// here or READ on a managed remote, or the backend's own error.
    pub fn pull(&self) -> ScmResult<PullResponse> {
        if self.request.remote.is_empty() {
            return Err(missing_remote(Command::Pull));
        }
        let service = self.service;
        service.authorize(PermissionType::Write)?;
        service.authorize_remote(&self.request.remote, PermissionType::Read)?;
        let response = service
            .provider()?
            .pull_command()?
            .pull(&service.context(), &self.request)?;
        let cleared = service.invalidate();
        info!(
            repository = %service.repository().display_name(),
            remote = %self.request.remote,
            changesets = response.changesets,
            cleared,
            "pulled"
        );
        Ok(response)
    }
}

fn missing_remote(command: Command) -> crate::error::ScmError {
    CommandError::InvalidRequest {
        command: command.to_string(),
        message: "a remote is required".to_string(),
    }
    .into()
}
