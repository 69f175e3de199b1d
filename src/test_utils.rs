// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared test doubles.
//!
//! A scripted backend that records storage calls and counts command
//! invocations, plus log capture for asserting on warnings.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{TimeZone, Utc};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::api::Commands;
use crate::backend::{RepositoryHandler, StorageProvisioner};
use crate::error::{RepositoryError, ScmError, ScmResult};
use crate::repository::changeset::{
    BlameLine, BlameResult, Branch, Branches, BrowserResult, Changeset, ChangesetPagingResult,
    FileObject, Person, Tag, Tags,
};
use crate::repository::{BackendType, Repository};
use crate::security::{PermissionType, Principal, Subject};
use crate::spi::{
    BlameCommand, BlameCommandRequest, BranchesCommand, BrowseCommand, BrowseCommandRequest,
    CatCommand, CatCommandRequest, ExecutionContext, LogCommand, LogCommandRequest,
    RepositoryServiceProvider, TagsCommand,
};

/// Marker file identifying a mock repository directory.
pub(crate) const MARKER: &str = "MOCK_REPOSITORY";

/// Five changesets, newest first, with HTML in their descriptions.
pub(crate) fn sample_changesets() -> Vec<Changeset> {
    (1..=5)
        .rev()
        .map(|i| {
            Changeset::new(
                format!("c{i}"),
                Utc.with_ymd_and_hms(2026, 1, i, 12, 0, 0).single().unwrap_or_default(),
                Person::new("Trillian <t>", Some("trillian@hitchhiker.com".to_string())),
                format!("change {i} for <b>#{i}</b>"),
            )
        })
        .collect()
}

pub(crate) fn admin() -> Subject {
    Subject::authenticated(Principal::new("zaphod").with_admin(true))
}

pub(crate) fn user(name: &str) -> Subject {
    Subject::authenticated(Principal::new(name))
}

pub(crate) fn repository(name: &str) -> Repository {
    Repository::builder().name(name).backend("mock").build()
}

/// `repository(name)` with a user permission entry.
pub(crate) fn repository_with(name: &str, user: &str, kind: PermissionType) -> Repository {
    let mut repository = repository(name);
    repository
        .permissions
        .push(crate::repository::Permission::user(user, kind));
    repository
}

/// Counters shared by a handler and every provider it opens.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) storage_calls: Mutex<Vec<String>>,
    pub(crate) log_calls: AtomicUsize,
    pub(crate) changeset_calls: AtomicUsize,
    pub(crate) blame_calls: AtomicUsize,
    pub(crate) browse_calls: AtomicUsize,
    pub(crate) tags_calls: AtomicUsize,
    pub(crate) closed: AtomicUsize,
    pub(crate) fail_create: AtomicBool,
    pub(crate) fail_close: AtomicBool,
    pub(crate) empty_tags: AtomicBool,
}

impl MockState {
    pub(crate) fn storage_calls(&self) -> Vec<String> {
        self.storage_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: String) {
        self.storage_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Handler of the `mock` backend type.
pub(crate) struct MockHandler {
    backend_type: BackendType,
    base: PathBuf,
    configured: bool,
    pub(crate) state: Arc<MockState>,
}

impl MockHandler {
    pub(crate) fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            backend_type: BackendType::new("mock", "Mock"),
            base: base.into(),
            configured: true,
            state: Arc::new(MockState::default()),
        }
    }

    pub(crate) const fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }
}

impl StorageProvisioner for MockHandler {
    fn create(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        self.state.record(format!("create {}", repository.name));
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage {
                operation: "create",
                name: repository.name.clone(),
                message: "disk full".to_string(),
            }
            .into());
        }
        std::fs::create_dir_all(directory)?;
        std::fs::write(directory.join(MARKER), b"")?;
        Ok(())
    }

    fn modify(&self, repository: &Repository, _directory: &Path) -> ScmResult<()> {
        self.state.record(format!("modify {}", repository.name));
        Ok(())
    }

    fn delete(&self, repository: &Repository, directory: &Path) -> ScmResult<()> {
        self.state.record(format!("delete {}", repository.name));
        if directory.exists() {
            std::fs::remove_dir_all(directory)?;
        }
        Ok(())
    }

    fn is_repository(&self, directory: &Path) -> bool {
        directory.join(MARKER).is_file()
    }
}

impl RepositoryHandler for MockHandler {
    fn backend_type(&self) -> &BackendType {
        &self.backend_type
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn base_directory(&self) -> &Path {
        &self.base
    }

    fn open(&self, _repository: &Repository) -> ScmResult<Box<dyn RepositoryServiceProvider>> {
        Ok(Box::new(MockProvider {
            state: Arc::clone(&self.state),
            changesets: sample_changesets(),
        }))
    }
}

/// Provider of LOG, BLAME, BROWSE, CAT, TAGS and BRANCHES.
pub(crate) struct MockProvider {
    state: Arc<MockState>,
    changesets: Vec<Changeset>,
}

impl LogCommand for MockProvider {
    fn changesets(
        &self,
        context: &ExecutionContext,
        request: &LogCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>> {
        context.check("log")?;
        self.state.log_calls.fetch_add(1, Ordering::SeqCst);
        let mut result =
            ChangesetPagingResult::new(self.changesets.len(), request.page(&self.changesets));
        result.branch.clone_from(&request.branch);
        Ok(Some(result))
    }

    fn changeset(&self, _context: &ExecutionContext, id: &str) -> ScmResult<Option<Changeset>> {
        self.state.changeset_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.changesets.iter().find(|c| c.id == id).cloned())
    }
}

impl BlameCommand for MockProvider {
    fn blame(
        &self,
        _context: &ExecutionContext,
        request: &BlameCommandRequest,
    ) -> ScmResult<Option<BlameResult>> {
        self.state.blame_calls.fetch_add(1, Ordering::SeqCst);
        let line = BlameLine {
            line_number: 1,
            revision: request.revision.clone().unwrap_or_else(|| "c5".to_string()),
            author: Person::new("Ford", None),
            when: None,
            description: Some("see #5".to_string()),
            code: "if a < b {".to_string(),
        };
        Ok(Some(BlameResult { lines: vec![line] }))
    }
}

impl BrowseCommand for MockProvider {
    fn browse(
        &self,
        _context: &ExecutionContext,
        request: &BrowseCommandRequest,
    ) -> ScmResult<Option<BrowserResult>> {
        self.state.browse_calls.fetch_add(1, Ordering::SeqCst);
        let mut root = FileObject::directory(request.path.clone().unwrap_or_default());
        root.children.push(FileObject {
            name: "<README>".to_string(),
            path: "<README>".to_string(),
            length: Some(42),
            ..FileObject::default()
        });
        Ok(Some(BrowserResult {
            revision: request.revision.clone().unwrap_or_else(|| "c5".to_string()),
            file: root,
        }))
    }
}

impl CatCommand for MockProvider {
    fn cat(
        &self,
        _context: &ExecutionContext,
        request: &CatCommandRequest,
        output: &mut dyn Write,
    ) -> ScmResult<()> {
        if request.path != "README" {
            return Err(crate::error::CommandError::PathNotFound {
                path: request.path.clone(),
            }
            .into());
        }
        output.write_all(b"Don't panic.\n")?;
        Ok(())
    }
}

impl TagsCommand for MockProvider {
    fn tags(&self, _context: &ExecutionContext) -> ScmResult<Option<Tags>> {
        self.state.tags_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.empty_tags.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Tags {
            tags: vec![Tag {
                name: "1.0".to_string(),
                revision: "c3".to_string(),
            }],
        }))
    }
}

impl BranchesCommand for MockProvider {
    fn branches(&self, _context: &ExecutionContext) -> ScmResult<Option<Branches>> {
        Ok(Some(Branches {
            branches: vec![Branch {
                name: "main".to_string(),
                revision: "c5".to_string(),
                default: true,
            }],
        }))
    }
}

impl RepositoryServiceProvider for MockProvider {
    fn backend(&self) -> &str {
        "mock"
    }

    fn commands(&self) -> Commands {
        Commands::LOG
            | Commands::BLAME
            | Commands::BROWSE
            | Commands::CAT
            | Commands::TAGS
            | Commands::BRANCHES
    }

    fn log_command(&self) -> ScmResult<&dyn LogCommand> {
        Ok(self)
    }

    fn blame_command(&self) -> ScmResult<&dyn BlameCommand> {
        Ok(self)
    }

    fn browse_command(&self) -> ScmResult<&dyn BrowseCommand> {
        Ok(self)
    }

    fn cat_command(&self) -> ScmResult<&dyn CatCommand> {
        Ok(self)
    }

    fn tags_command(&self) -> ScmResult<&dyn TagsCommand> {
        Ok(self)
    }

    fn branches_command(&self) -> ScmResult<&dyn BranchesCommand> {
        Ok(self)
    }

    fn close(&mut self) -> ScmResult<()> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(ScmError::other("handle already released"));
        }
        Ok(())
    }
}

// --- Log capture ---

#[derive(Clone)]
struct BufferWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| std::io::Error::other("buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct BufferMakeWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for BufferMakeWriter {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter {
            buffer: self.buffer.clone(),
        }
    }
}

/// Runs `f` while capturing `WARN` and above on this thread.
pub(crate) fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_writer(BufferMakeWriter {
            buffer: buffer.clone(),
        })
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.lock().unwrap_or_else(PoisonError::into_inner))
        .to_string();
    (result, logs)
}
