// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Application wiring.
//!
//! ```text
//! Config
//!   |
//!   +-- WorkerPool(hooks.workers) --> EventBus
//!   |         |
//!   |         v
//!   +-- HookDispatcher <-- PreProcessorPipeline, ExecHook per [[hooks.exec]]
//!   |         |
//!   |         v
//!   +-- RepositoryRegistry <-- JsonFileStore, BackendRegistry(git)
//!   |         |
//!   |         v
//!   +-- RepositoryServiceFactory <-- CacheManager
//!   |
//!   +-- HookUrlResolver
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::RepositoryServiceFactory;
use crate::backend::BackendRegistry;
use crate::cache::{CacheManager, CacheSettings};
use crate::config::Config;
use crate::error::ScmResult;
use crate::event::{EventBus, EventChannel};
use crate::git::{GIT_TYPE, GitRepositoryHandler, HookScripts};
use crate::hook::dispatch::HookDispatcher;
use crate::hook::exec::ExecHook;
use crate::hook::url::HookUrlResolver;
use crate::pool::WorkerPool;
use crate::preprocess::PreProcessorPipeline;
use crate::repository::registry::RepositoryRegistry;
use crate::repository::store::JsonFileStore;
use crate::security::{DefaultPermissionChecker, Principal, Subject};

/// Every long-lived component, wired from one [`Config`].
pub struct ScmContext {
    config: Config,
    pool: Arc<WorkerPool>,
    events: Arc<EventBus>,
    hooks: Arc<HookDispatcher>,
    caches: CacheManager,
    registry: Arc<RepositoryRegistry>,
    services: RepositoryServiceFactory,
    hook_url: HookUrlResolver,
}

impl ScmContext {
    /// Wire the components described by `config`.
    ///
    /// `config_file` is handed to installed hook scripts so their callbacks
    /// load the same configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot start, an exec hook or
    /// keyword link is invalid, or the metadata store cannot be read.
    pub fn from_config(config: Config, config_file: Option<PathBuf>) -> ScmResult<Self> {
        let pool = Arc::new(WorkerPool::new("scm-hooks", config.hooks.workers)?);
        let events = Arc::new(EventBus::new(pool.clone()));
        let event_channel: Arc<dyn EventChannel> = events.clone();
        let pipeline = Arc::new(PreProcessorPipeline::from_config(&config.preprocess)?);

        let hooks = Arc::new(
            HookDispatcher::new(pool.clone())
                .with_pipeline(pipeline.clone())
                .with_events(event_channel.clone()),
        );
        for exec in &config.hooks.exec {
            hooks.register(Arc::new(ExecHook::from_config(exec)?));
        }

        let backends = Arc::new(BackendRegistry::new());
        backends.register(Arc::new(
            GitRepositoryHandler::new(config.repositories.directory.join(GIT_TYPE))
                .with_hook_scripts(hook_scripts(&config, config_file)),
        ))?;

        let store = Arc::new(JsonFileStore::open(config.repositories.store_path())?);
        let permissions = Arc::new(
            DefaultPermissionChecker::new()
                .with_anonymous_access(config.security.anonymous_access),
        );
        let registry = Arc::new(
            RepositoryRegistry::new(store, backends, permissions)
                .with_events(event_channel)
                .with_hooks(hooks.clone())
                .with_archive_policy(config.repositories.archive_before_delete),
        );

        let caches = CacheManager::new(CacheSettings::new(
            config.cache.max_entries,
            config.cache.time_to_live(),
        ));
        let services = RepositoryServiceFactory::new(registry.clone(), &caches, pipeline)?
            .with_timeout(config.commands.timeout());
        let hook_url = HookUrlResolver::from_config(&config.hooks);

        debug!(
            directory = %config.repositories.directory.display(),
            workers = config.hooks.workers,
            "context ready"
        );
        Ok(Self {
            config,
            pool,
            events,
            hooks,
            caches,
            registry,
            services,
            hook_url,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<RepositoryRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn services(&self) -> &RepositoryServiceFactory {
        &self.services
    }

    #[must_use]
    pub const fn hooks(&self) -> &Arc<HookDispatcher> {
        &self.hooks
    }

    #[must_use]
    pub const fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    #[must_use]
    pub const fn caches(&self) -> &CacheManager {
        &self.caches
    }

    #[must_use]
    pub const fn hook_url(&self) -> &HookUrlResolver {
        &self.hook_url
    }

    /// Subject acting for the local user `name`.
    ///
    /// Administrators are taken from `security.admin_users`; with none
    /// configured every local user is one.
    #[must_use]
    pub fn subject(&self, name: &str) -> Subject {
        let principal = Principal::new(name).with_admin(self.config.is_admin(name, &[]));
        Subject::authenticated(principal)
    }

    /// Release backend resources and drain pending asynchronous hooks.
    pub fn close(&self) {
        self.registry.backends().close_all();
        self.pool.shutdown();
        info!("context closed");
    }
}

impl std::fmt::Debug for ScmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScmContext")
            .field("registry", &self.registry)
            .field("hooks", &self.hooks)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn hook_scripts(config: &Config, config_file: Option<PathBuf>) -> Option<HookScripts> {
    if !config.hooks.install_scripts {
        return None;
    }
    match std::env::current_exe() {
        Ok(program) => Some(HookScripts::new(program).with_config(config_file)),
        Err(e) => {
            debug!(error = %e, "hook scripts disabled, cannot locate executable");
            None
        }
    }
}
