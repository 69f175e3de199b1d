// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Caller-facing command API.
//!
//! ```text
//! RepositoryServiceFactory::create(subject, id)
//!   registry.get (READ) --> backends.resolve --> RepositoryService
//!                                                   |
//!   service.log_command()?        NotSupported unless advertised
//!     .set_paging_limit(Some(2))  fluent, &mut Self
//!     .get_changesets()?          cache --> backend --> pre-processing
//!                                                   |
//!   drop(service) / service.close()   closes the provider exactly once
//! ```
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Command`], [`Commands`], [`Feature`] | Capability vocabulary |
//! | [`RepositoryServiceFactory`] | Opens services, owns the command caches |
//! | [`RepositoryService`] | One open repository and its command builders |
//! | [`CacheKey`] | Repository id plus request snapshot |

mod blame;
mod browse;
pub mod caches;
mod command;
mod content;
mod log;
mod refs;
mod remote;


pub use blame::BlameCommandBuilder;
pub use browse::BrowseCommandBuilder;
pub use caches::{CacheKey, CommandCaches};
pub use command::{Command, Commands, Feature};
pub use content::{CatCommandBuilder, DiffCommandBuilder};
pub use log::LogCommandBuilder;
pub use refs::{BranchesCommandBuilder, TagsCommandBuilder};
pub use remote::{
    IncomingCommandBuilder, OutgoingCommandBuilder, PullCommandBuilder, PushCommandBuilder,
};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheClearHook, CacheManager};
use crate::error::{CommandError, RepositoryError, ScmResult};
use crate::preprocess::PreProcessorPipeline;
use crate::repository::Repository;
use crate::repository::registry::RepositoryRegistry;
use crate::security::{PermissionType, Subject};
use crate::spi::{ExecutionContext, RepositoryServiceProvider, not_supported};

/// Flags shared by the caching builders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BuilderOptions {
    pub(crate) disable_cache: bool,
    pub(crate) disable_pre_processors: bool,
    pub(crate) disable_escaping: bool,
}

impl BuilderOptions {
    /// Whether results are escaped before they are returned.
    pub(crate) const fn escape(self) -> bool {
        !self.disable_escaping
    }
}

/// Opens [`RepositoryService`]s.
///
/// Creating the factory registers a cache invalidation hook with the
/// registry's listeners and hook dispatcher.
pub struct RepositoryServiceFactory {
    registry: Arc<RepositoryRegistry>,
    caches: CommandCaches,
    pipeline: Arc<PreProcessorPipeline>,
    invalidation: Arc<CacheClearHook>,
    timeout: Option<Duration>,
}

impl RepositoryServiceFactory {
    /// # Errors
    ///
    /// Fails if a command cache name is taken by a cache of other types.
    pub fn new(
        registry: Arc<RepositoryRegistry>,
        caches: &CacheManager,
        pipeline: Arc<PreProcessorPipeline>,
    ) -> ScmResult<Self> {
        let caches = CommandCaches::new(caches)?;
        let invalidation = Arc::new(CacheClearHook::new());
        caches.register(&invalidation);
        registry.add_listener(invalidation.clone());
        if let Some(hooks) = registry.hooks() {
            hooks.register(invalidation.clone());
        }
        Ok(Self {
            registry,
            caches,
            pipeline,
            invalidation,
            timeout: None,
        })
    }

    /// Deadline of each backend command; `None` waits forever.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn cache_clear_hook(&self) -> &Arc<CacheClearHook> {
        &self.invalidation
    }

    /// Open the repository with `id`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `PermissionDenied` without READ, or the backend's error.
    pub fn create(&self, subject: &Subject, id: &str) -> ScmResult<RepositoryService> {
        let repository = self
            .registry
            .get(subject, id)?
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })?;
        self.open(subject, repository)
    }

    /// Open the repository `backend/name`.
    ///
    /// # Errors
    ///
    /// Same as [`RepositoryServiceFactory::create`].
    pub fn create_by_name(
        &self,
        subject: &Subject,
        backend: &str,
        name: &str,
    ) -> ScmResult<RepositoryService> {
        let repository = self
            .registry
            .get_by_name(subject, backend, name)?
            .ok_or_else(|| RepositoryError::NameNotFound {
                backend: backend.to_string(),
                name: name.to_string(),
            })?;
        self.open(subject, repository)
    }

    fn open(&self, subject: &Subject, repository: Repository) -> ScmResult<RepositoryService> {
        let provider = self.registry.backends().resolve(&repository)?;
        Ok(RepositoryService {
            repository,
            subject: subject.clone(),
            registry: Arc::clone(&self.registry),
            provider: Some(provider),
            caches: self.caches.clone(),
            pipeline: Arc::clone(&self.pipeline),
            invalidation: Arc::clone(&self.invalidation),
            timeout: self.timeout,
            token: CancellationToken::new(),
        })
    }
}

impl std::fmt::Debug for RepositoryServiceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryServiceFactory")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Command access to one open repository.
///
/// The provider is closed by [`RepositoryService::close`] or on drop; a
/// failing close is logged.
pub struct RepositoryService {
    repository: Repository,
    subject: Subject,
    registry: Arc<RepositoryRegistry>,
    provider: Option<Box<dyn RepositoryServiceProvider>>,
    caches: CommandCaches,
    pipeline: Arc<PreProcessorPipeline>,
    invalidation: Arc<CacheClearHook>,
    timeout: Option<Duration>,
    token: CancellationToken,
}

impl RepositoryService {
    #[must_use]
    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Override the command deadline for this service.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token cancelling every running and future command of this service.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Commands the backend advertises.
    #[must_use]
    pub fn commands(&self) -> Commands {
        self.provider
            .as_deref()
            .map_or_else(Commands::empty, RepositoryServiceProvider::commands)
    }

    #[must_use]
    pub fn supports(&self, command: Command) -> bool {
        self.provider
            .as_deref()
            .is_some_and(|provider| provider.supports(command))
    }

    #[must_use]
    pub fn supports_feature(&self, feature: &Feature) -> bool {
        self.provider
            .as_deref()
            .is_some_and(|provider| provider.supports_feature(feature))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises LOG.
    pub fn log_command(&self) -> ScmResult<LogCommandBuilder<'_>> {
        self.require(Command::Log)?;
        Ok(LogCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises BLAME.
    pub fn blame_command(&self) -> ScmResult<BlameCommandBuilder<'_>> {
        self.require(Command::Blame)?;
        Ok(BlameCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises BROWSE.
    pub fn browse_command(&self) -> ScmResult<BrowseCommandBuilder<'_>> {
        self.require(Command::Browse)?;
        Ok(BrowseCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises CAT.
    pub fn cat_command(&self) -> ScmResult<CatCommandBuilder<'_>> {
        self.require(Command::Cat)?;
        Ok(CatCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises DIFF.
    pub fn diff_command(&self) -> ScmResult<DiffCommandBuilder<'_>> {
        self.require(Command::Diff)?;
        Ok(DiffCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises TAGS.
    pub fn tags_command(&self) -> ScmResult<TagsCommandBuilder<'_>> {
        self.require(Command::Tags)?;
        Ok(TagsCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises BRANCHES.
    pub fn branches_command(&self) -> ScmResult<BranchesCommandBuilder<'_>> {
        self.require(Command::Branches)?;
        Ok(BranchesCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises INCOMING.
    pub fn incoming_command(&self) -> ScmResult<IncomingCommandBuilder<'_>> {
        self.require(Command::Incoming)?;
        Ok(IncomingCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises OUTGOING.
    pub fn outgoing_command(&self) -> ScmResult<OutgoingCommandBuilder<'_>> {
        self.require(Command::Outgoing)?;
        Ok(OutgoingCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises PUSH.
    pub fn push_command(&self) -> ScmResult<PushCommandBuilder<'_>> {
        self.require(Command::Push)?;
        Ok(PushCommandBuilder::new(self))
    }

    /// # Errors
    ///
    /// `NotSupported` unless the backend advertises PULL.
    pub fn pull_command(&self) -> ScmResult<PullCommandBuilder<'_>> {
        self.require(Command::Pull)?;
        Ok(PullCommandBuilder::new(self))
    }

    /// Close the provider now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns the provider's close error.
    pub fn close(mut self) -> ScmResult<()> {
        match self.provider.take() {
            Some(mut provider) => {
                debug!(repository = %self.repository.display_name(), "closing service provider");
                provider.close()
            }
            None => Ok(()),
        }
    }

    fn require(&self, command: Command) -> ScmResult<()> {
        let provider = self.provider()?;
        if provider.supports(command) {
            Ok(())
        } else {
            Err(not_supported(provider.backend(), command))
        }
    }

    pub(crate) fn provider(&self) -> ScmResult<&dyn RepositoryServiceProvider> {
        self.provider.as_deref().ok_or_else(|| {
            CommandError::Closed {
                repository: self.repository.display_name(),
            }
            .into()
        })
    }

    pub(crate) fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.timeout).with_token(self.token.child_token())
    }

    pub(crate) const fn caches(&self) -> &CommandCaches {
        &self.caches
    }

    pub(crate) fn pipeline(&self) -> &PreProcessorPipeline {
        &self.pipeline
    }

    /// Fail unless the subject holds `permission` on this repository.
    pub(crate) fn authorize(&self, permission: PermissionType) -> ScmResult<()> {
        self.registry
            .permissions()
            .check(&self.subject, &self.repository, permission)
    }

    /// Fail if `remote` is a managed repository the subject lacks
    /// `permission` on.
    pub(crate) fn authorize_remote(
        &self,
        remote: &str,
        permission: PermissionType,
    ) -> ScmResult<()> {
        let base = self.registry.directory(&self.repository)?;
        self.registry
            .get_by_location(&self.subject, &base, remote, permission)?;
        Ok(())
    }

    /// Storage location of the managed `remote`, usable as a remote.
    pub(crate) fn remote_location(&self, remote: &Repository) -> ScmResult<String> {
        let remote = self
            .registry
            .get(&self.subject, &remote.id)?
            .ok_or_else(|| RepositoryError::NotFound {
                id: remote.id.clone(),
            })?;
        Ok(self
            .registry
            .directory(&remote)?
            .to_string_lossy()
            .into_owned())
    }

    /// Drop every cached result of this repository.
    pub(crate) fn invalidate(&self) -> usize {
        self.invalidation.clear(&self.repository.id)
    }
}

impl Drop for RepositoryService {
    fn drop(&mut self) {
        if let Some(mut provider) = self.provider.take()
            && let Err(e) = provider.close()
        {
            warn!(
                repository = %self.repository.display_name(),
                error = %e,
                "failed to close service provider"
            );
        }
    }
}

impl std::fmt::Debug for RepositoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryService")
            .field("repository", &self.repository.display_name())
            .field("commands", &self.commands())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
