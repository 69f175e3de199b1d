// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Ordered dispatch of hook events.
//!
//! Pre-receive dispatch cannot be cancelled once started; every interested
//! hook runs until the first veto.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use super::{RepositoryHook, RepositoryHookEvent, RepositoryHookType};
use crate::error::{HookError, ScmError, ScmResult};
use crate::event::{EventChannel, ScmEvent};
use crate::pool::WorkerPool;
use crate::preprocess::PreProcessorPipeline;

/// Runs registered hooks for hook events.
pub struct HookDispatcher {
    hooks: RwLock<Vec<Arc<dyn RepositoryHook>>>,
    pool: Arc<WorkerPool>,
    pipeline: Option<Arc<PreProcessorPipeline>>,
    events: Option<Arc<dyn EventChannel>>,
}

impl HookDispatcher {
    #[must_use]
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
            pool,
            pipeline: None,
            events: None,
        }
    }

    /// Pre-process hook changesets with `pipeline`.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<PreProcessorPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Publish every dispatched event on `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventChannel>) -> Self {
        self.events = Some(events);
        self
    }

    /// Add a hook after the already registered ones.
    pub fn register(&self, hook: Arc<dyn RepositoryHook>) {
        debug!(hook = hook.name(), types = ?hook.hook_types(), "registering hook");
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Remove every hook named `name`; returns `true` if one was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let before = hooks.len();
        hooks.retain(|hook| hook.name() != name);
        hooks.len() != before
    }

    /// Hooks interested in `hook_type`, in registration order.
    #[must_use]
    pub fn hooks_for(&self, hook_type: RepositoryHookType) -> Vec<Arc<dyn RepositoryHook>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|hook| hook.hook_types().contains(&hook_type))
            .cloned()
            .collect()
    }

    /// Dispatch `event` to the interested hooks.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Rejected` naming the first pre-receive hook that
    /// failed. Post-receive failures are logged and never returned.
    pub fn fire(&self, event: RepositoryHookEvent) -> ScmResult<()> {
        let event = match &self.pipeline {
            Some(pipeline) if event.pipeline.is_none() => event.with_pipeline(Arc::clone(pipeline)),
            _ => event,
        };
        let hooks = self.hooks_for(event.hook_type());
        info!(
            repository = %event.repository().display_name(),
            hook_type = %event.hook_type(),
            user = %event.subject(),
            hooks = hooks.len(),
            "firing hook event"
        );

        if event.hook_type().is_pre() {
            Self::run_pre(&hooks, &event)?;
        } else {
            self.run_post(hooks, &event);
        }

        if let Some(events) = &self.events {
            events.publish(ScmEvent::Hook(event));
        }
        Ok(())
    }

    fn run_pre(hooks: &[Arc<dyn RepositoryHook>], event: &RepositoryHookEvent) -> ScmResult<()> {
        for hook in hooks {
            if let Err(e) = hook.on_event(event) {
                warn!(
                    hook = hook.name(),
                    repository = %event.repository().display_name(),
                    error = %e,
                    "pre-receive hook rejected change"
                );
                return Err(HookError::Rejected {
                    hook: hook.name().to_string(),
                    message: rejection_message(e),
                }
                .into());
            }
        }
        Ok(())
    }

    fn run_post(&self, hooks: Vec<Arc<dyn RepositoryHook>>, event: &RepositoryHookEvent) {
        for hook in hooks {
            if hook.is_async() {
                let name = hook.name().to_string();
                let job_event = event.clone();
                let submitted = self.pool.submit_as(event.subject().clone(), move || {
                    if let Err(e) = hook.on_event(&job_event) {
                        error!(hook = hook.name(), error = %e, "async post-receive hook failed");
                    }
                });
                if let Err(e) = submitted {
                    error!(hook = %name, error = %e, "could not schedule post-receive hook");
                }
            } else if let Err(e) = hook.on_event(event) {
                error!(hook = hook.name(), error = %e, "post-receive hook failed");
            }
        }
    }
}

/// The hook's own message, without nesting an earlier rejection.
fn rejection_message(error: ScmError) -> String {
    match error {
        ScmError::Hook(hook_error) => match *hook_error {
            HookError::Rejected { message, .. } | HookError::ExecFailed { message, .. } => {
                message
            }
            other => other.to_string(),
        },
        other => other.to_string(),
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks: Vec<String> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|hook| hook.name().to_string())
            .collect();
        f.debug_struct("HookDispatcher")
            .field("hooks", &hooks)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
