// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository hooks.
//!
//! ```text
//! backend hook script ---> RepositoryRegistry::fire_hook_event(subject, id, type, ctx)
//!                                   |
//!                                   v
//!                           HookDispatcher::fire(RepositoryHookEvent)
//!                                   |
//!            PRE_RECEIVE            |            POST_RECEIVE
//!   every hook, calling thread,     |   sync hooks inline, errors logged
//!   registration order; first       |   async hooks --> WorkerPool
//!   error --> HookError::Rejected   |     (triggering Subject bound)
//!                                   v
//!                        EventChannel::publish(ScmEvent::Hook)
//! ```
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`RepositoryHookType`] | `PRE_RECEIVE` or `POST_RECEIVE` |
//! | [`HookContext`] | Ref updates plus lazily loaded changesets |
//! | [`RepositoryHookEvent`] | What a hook receives |
//! | [`RepositoryHook`] | Hook implementation |
//! | [`dispatch::HookDispatcher`] | Ordered sync/async dispatch |
//! | [`exec::ExecHook`] | External command hook |
//! | [`url::HookUrlResolver`] | Callback URL for installed hook scripts |

pub mod dispatch;
pub mod exec;
pub mod url;


use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HookError, ScmResult};
use crate::preprocess::PreProcessorPipeline;
use crate::repository::Repository;
use crate::repository::changeset::Changeset;
use crate::security::Subject;

/// Hook points around an incoming change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryHookType {
    /// Before the change is applied; hooks may veto.
    PreReceive,
    /// After the change is durable.
    PostReceive,
}

impl RepositoryHookType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreReceive => "PRE_RECEIVE",
            Self::PostReceive => "POST_RECEIVE",
        }
    }

    /// Name of the matching git hook script.
    #[must_use]
    pub const fn script_name(&self) -> &'static str {
        match self {
            Self::PreReceive => "pre-receive",
            Self::PostReceive => "post-receive",
        }
    }

    #[must_use]
    pub const fn is_pre(&self) -> bool {
        matches!(self, Self::PreReceive)
    }

    /// Map a backend's native hook name onto a hook type.
    ///
    /// Accepts git (`pre-receive`), mercurial (`pretxnchangegroup`) and the
    /// canonical names.
    #[must_use]
    pub fn from_backend_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "pre_receive" | "pretxnchangegroup" => Some(Self::PreReceive),
            "post_receive" | "changegroup" => Some(Self::PostReceive),
            _ => None,
        }
    }
}

impl fmt::Display for RepositoryHookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RepositoryHookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_backend_name(s).ok_or_else(|| format!("unknown hook type '{s}'"))
    }
}

/// One updated reference, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefUpdate {
    pub old: String,
    pub new: String,
    pub reference: String,
}

impl RefUpdate {
    pub fn new(
        old: impl Into<String>,
        new: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            reference: reference.into(),
        }
    }

    /// Parse one `<old> <new> <ref>` line as written by git to hook stdin.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let old = parts.next()?;
        let new = parts.next()?;
        let reference = parts.next()?;
        Some(Self::new(old, new, reference))
    }

    /// Whether the update deletes the reference (all-zero new id).
    #[must_use]
    pub fn is_delete(&self) -> bool {
        is_null_id(&self.new)
    }

    /// Whether the update creates the reference (all-zero old id).
    #[must_use]
    pub fn is_create(&self) -> bool {
        is_null_id(&self.old)
    }
}

fn is_null_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b == b'0')
}

impl fmt::Display for RefUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.old, self.new, self.reference)
    }
}

/// Backend-specific source of the changesets a hook trigger introduces.
pub trait HookChangesetProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns the backend error if the changesets cannot be read.
    fn changesets(&self, updates: &[RefUpdate]) -> ScmResult<Vec<Changeset>>;
}

/// Backend context of a hook trigger.
///
/// Changesets are loaded at most once, on first access, and pre-processed
/// before they are cached in the context.
pub struct HookContext {
    ref_updates: Vec<RefUpdate>,
    provider: Option<Box<dyn HookChangesetProvider>>,
    changesets: OnceLock<Vec<Changeset>>,
    loading: Mutex<()>,
}

impl HookContext {
    #[must_use]
    pub fn new(ref_updates: Vec<RefUpdate>) -> Self {
        Self {
            ref_updates,
            provider: None,
            changesets: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn HookChangesetProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn ref_updates(&self) -> &[RefUpdate] {
        &self.ref_updates
    }

    #[must_use]
    pub fn has_changesets(&self) -> bool {
        self.provider.is_some()
    }

    /// Changesets of the trigger, loaded and processed on first call.
    ///
    /// A failed load is not cached; the next call retries.
    fn changesets(
        &self,
        repository: &Repository,
        pipeline: Option<&PreProcessorPipeline>,
    ) -> ScmResult<&[Changeset]> {
        if let Some(loaded) = self.changesets.get() {
            return Ok(loaded);
        }

        let _guard = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = self.changesets.get() {
            return Ok(loaded);
        }

        let provider = self.provider.as_ref().ok_or_else(|| HookError::NoChangesets {
            repository: repository.display_name(),
        })?;
        let mut changesets = provider.changesets(&self.ref_updates)?;
        if let Some(pipeline) = pipeline {
            pipeline.process_changesets(repository, &mut changesets, false);
        }
        debug!(
            repository = %repository.display_name(),
            changesets = changesets.len(),
            "loaded hook changesets"
        );
        Ok(self.changesets.get_or_init(|| changesets))
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("ref_updates", &self.ref_updates)
            .field("has_provider", &self.provider.is_some())
            .field("loaded", &self.changesets.get().map(Vec::len))
            .finish()
    }
}

/// A hook trigger for one repository.
#[derive(Debug, Clone)]
pub struct RepositoryHookEvent {
    repository: Repository,
    hook_type: RepositoryHookType,
    context: Arc<HookContext>,
    subject: Subject,
    pipeline: Option<Arc<PreProcessorPipeline>>,
}

impl RepositoryHookEvent {
    #[must_use]
    pub fn new(
        repository: Repository,
        hook_type: RepositoryHookType,
        context: Arc<HookContext>,
        subject: Subject,
    ) -> Self {
        Self {
            repository,
            hook_type,
            context,
            subject,
            pipeline: None,
        }
    }

    /// Pipeline applied to the changesets on first load.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<PreProcessorPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    #[must_use]
    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    #[must_use]
    pub const fn hook_type(&self) -> RepositoryHookType {
        self.hook_type
    }

    #[must_use]
    pub fn context(&self) -> &HookContext {
        &self.context
    }

    /// Identity of the push that triggered the hook.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Changesets introduced by the trigger.
    ///
    /// # Errors
    ///
    /// Returns `HookError::NoChangesets` if the backend attached no provider,
    /// or the provider's error.
    pub fn changesets(&self) -> ScmResult<&[Changeset]> {
        self.context
            .changesets(&self.repository, self.pipeline.as_deref())
    }
}

/// A hook implementation.
pub trait RepositoryHook: Send + Sync {
    /// Name used in logs and rejection messages.
    fn name(&self) -> &str;

    /// Hook points this hook wants.
    fn hook_types(&self) -> &[RepositoryHookType];

    /// Run post-receive invocations on the worker pool.
    ///
    /// Ignored for pre-receive, which is always synchronous.
    fn is_async(&self) -> bool {
        false
    }

    /// Handle one event. On pre-receive an error vetoes the change.
    ///
    /// # Errors
    ///
    /// Any error; the dispatcher reports or logs it.
    fn on_event(&self, event: &RepositoryHookEvent) -> ScmResult<()>;
}

type HookFn = dyn Fn(&RepositoryHookEvent) -> ScmResult<()> + Send + Sync;

/// Hook backed by a closure.
pub struct FnHook {
    name: String,
    hook_types: Vec<RepositoryHookType>,
    is_async: bool,
    handler: Box<HookFn>,
}

impl FnHook {
    pub fn new(
        name: impl Into<String>,
        hook_types: Vec<RepositoryHookType>,
        handler: impl Fn(&RepositoryHookEvent) -> ScmResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            hook_types,
            is_async: false,
            handler: Box::new(handler),
        }
    }

    #[must_use]
    pub const fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

impl RepositoryHook for FnHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn hook_types(&self) -> &[RepositoryHookType] {
        &self.hook_types
    }

    fn is_async(&self) -> bool {
        self.is_async
    }

    fn on_event(&self, event: &RepositoryHookEvent) -> ScmResult<()> {
        (self.handler)(event)
    }
}

impl fmt::Debug for FnHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook")
            .field("name", &self.name)
            .field("hook_types", &self.hook_types)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}
