// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!                ScmError (~24 bytes)
//!                       |
//!   +--------+-------+--+-----+------+-----+----+
//!   |        |       |        |      |     |    |
//!   v        v       v        v      v     v    v
//! Repo    Command Security  Hook  Config  Git  Io/Other
//! Box      Box     Box      Box    Box    Box  Box<str>
//!
//! Sub-errors (unboxed internally):
//!   Repository NotFound, AlreadyExists, Validation, NotArchived
//!   Command    NotSupported, ChangesetNotFound, NoResult, Timeout
//!   Security   PermissionDenied, AdminRequired
//!   Hook       Rejected, ExecFailed, PoolShutdown
//!   Config     ParseError, MissingKey, InvalidValue
//!   Git        Gix, CommandFailed, ExecutableNotFound
//!
//! ScmError::kind() --> ErrorKind (caller-facing taxonomy)
//! ```

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`ScmError`].
pub type ScmResult<T> = std::result::Result<T, ScmError>;

/// Top-level library error type.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum ScmError {
    /// Repository registry or store error.
    #[error("repository error: {0}")]
    Repository(#[from] Box<RepositoryError>),

    /// Command dispatch or backend command error.
    #[error("command error: {0}")]
    Command(#[from] Box<CommandError>),

    /// Authorization error.
    #[error("security error: {0}")]
    Security(#[from] Box<SecurityError>),

    /// Hook dispatch error.
    #[error("hook error: {0}")]
    Hook(#[from] Box<HookError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Git backend error.
    #[error("git error: {0}")]
    Git(#[from] Box<GitError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

/// Caller-facing classification of an [`ScmError`].
///
/// Callers branch on the kind instead of matching backend diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend does not support the requested command or feature.
    NotSupportedFeature,
    /// A repository, changeset, or path is absent.
    NotFound,
    /// The caller lacks the required permission.
    PermissionDenied,
    /// Malformed input.
    Validation,
    /// The backend or the metadata store failed to do I/O.
    BackendIo,
    /// Delete attempted on a repository that is not archived.
    ArchivePolicyViolation,
    /// A repository with the same type and name already exists.
    AlreadyExists,
    /// A pre-receive hook vetoed the change.
    HookRejected,
    /// Invalid configuration.
    Configuration,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Returns a short lowercase name for log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotSupportedFeature => "not-supported",
            Self::NotFound => "not-found",
            Self::PermissionDenied => "permission-denied",
            Self::Validation => "validation",
            Self::BackendIo => "backend-io",
            Self::ArchivePolicyViolation => "archive-policy",
            Self::AlreadyExists => "already-exists",
            Self::HookRejected => "hook-rejected",
            Self::Configuration => "configuration",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ScmError {
    /// Create a generic [`ScmError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into().into_boxed_str())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(e) => e.kind(),
            Self::Command(e) => e.kind(),
            Self::Security(_) => ErrorKind::PermissionDenied,
            Self::Hook(e) => e.kind(),
            Self::Config(_) => ErrorKind::Configuration,
            Self::Git(e) => e.kind(),
            Self::Io(_) => ErrorKind::BackendIo,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Returns `true` if this error is of the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for ScmError {
                fn from(err: $error) -> Self {
                    ScmError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    RepositoryError => Repository,
    CommandError => Command,
    SecurityError => Security,
    HookError => Hook,
    ConfigError => Config,
    GitError => Git,
    std::io::Error => Io,
}

// --- Repository Errors ---

/// Repository registry and metadata store errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No repository with this id.
    #[error("repository '{id}' not found")]
    NotFound { id: String },

    /// No repository with this type and name.
    #[error("repository '{backend}/{name}' not found")]
    NameNotFound { backend: String, name: String },

    /// A repository with this type and name is already registered.
    #[error("repository '{backend}/{name}' already exists")]
    AlreadyExists { backend: String, name: String },

    /// A required field is missing or malformed.
    #[error("invalid repository field '{field}': {message}")]
    Validation { field: String, message: String },

    /// The archive policy requires archiving before delete.
    #[error("repository '{name}' must be archived before it can be deleted")]
    NotArchived { name: String },

    /// No handler is registered for this backend type.
    #[error("unknown repository type '{backend}'")]
    UnknownType { backend: String },

    /// The handler for this backend type is registered but not usable.
    #[error("handler for type '{backend}' is not configured")]
    NotConfigured { backend: String },

    /// A handler for this backend type was registered twice.
    #[error("handler for type '{backend}' is already registered")]
    HandlerAlreadyRegistered { backend: String },

    /// Backend storage could not be provisioned, modified, or removed.
    #[error("storage operation '{operation}' failed for '{name}': {message}")]
    Storage {
        operation: &'static str,
        name: String,
        message: String,
    },

    /// The metadata store failed.
    #[error("repository store failure: {message}")]
    Store { message: String },
}

impl RepositoryError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NameNotFound { .. } | Self::UnknownType { .. } => {
                ErrorKind::NotFound
            }
            Self::AlreadyExists { .. } | Self::HandlerAlreadyRegistered { .. } => {
                ErrorKind::AlreadyExists
            }
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotConfigured { .. } => ErrorKind::Configuration,
            Self::NotArchived { .. } => ErrorKind::ArchivePolicyViolation,
            Self::Storage { .. } | Self::Store { .. } => ErrorKind::BackendIo,
        }
    }
}

// --- Command Errors ---

/// Command dispatch errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The backend does not implement the command or feature.
    #[error("'{what}' is not supported by the '{backend}' backend")]
    NotSupported { what: String, backend: String },

    /// The requested changeset does not exist.
    #[error("could not find changeset '{id}'")]
    ChangesetNotFound { id: String },

    /// The requested path does not exist at the given revision.
    #[error("path '{path}' not found")]
    PathNotFound { path: String },

    /// The backend returned no data for the command.
    #[error("command '{command}' returned no result")]
    NoResult { command: String },

    /// The request is incomplete or contradictory.
    #[error("invalid '{command}' request: {message}")]
    InvalidRequest { command: String, message: String },

    /// The backend failed while executing the command.
    #[error("command '{command}' failed: {message}")]
    Backend { command: String, message: String },

    /// The command did not finish before its deadline.
    #[error("command '{command}' timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    /// The command was cancelled by the caller.
    #[error("command '{command}' was cancelled")]
    Cancelled { command: String },

    /// The repository service was already closed.
    #[error("repository service for '{repository}' is closed")]
    Closed { repository: String },
}

impl CommandError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSupported { .. } => ErrorKind::NotSupportedFeature,
            Self::ChangesetNotFound { .. } | Self::PathNotFound { .. } | Self::NoResult { .. } => {
                ErrorKind::NotFound
            }
            Self::InvalidRequest { .. } => ErrorKind::Validation,
            Self::Backend { .. } | Self::Timeout { .. } => ErrorKind::BackendIo,
            Self::Cancelled { .. } | Self::Closed { .. } => ErrorKind::Other,
        }
    }
}

// --- Security Errors ---

/// Authorization errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The subject lacks a permission on a repository.
    #[error("user '{user}' has no {permission} permission on '{repository}'")]
    PermissionDenied {
        user: String,
        permission: String,
        repository: String,
    },

    /// The operation requires an administrator.
    #[error("user '{user}' is not an administrator")]
    AdminRequired { user: String },
}

// --- Hook Errors ---

/// Hook dispatch errors.
#[derive(Debug, Error)]
pub enum HookError {
    /// A pre-receive hook vetoed the change.
    #[error("change rejected by hook '{hook}': {message}")]
    Rejected { hook: String, message: String },

    /// An external hook command could not be run.
    #[error("hook command '{command}' failed: {message}")]
    ExecFailed { command: String, message: String },

    /// The hook context carries no changeset provider.
    #[error("hook context of '{repository}' provides no changesets")]
    NoChangesets { repository: String },

    /// The worker pool no longer accepts work.
    #[error("worker pool '{pool}' is shut down")]
    PoolShutdown { pool: String },
}

impl HookError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { .. } => ErrorKind::HookRejected,
            Self::ExecFailed { .. } => ErrorKind::BackendIo,
            Self::NoChangesets { .. } => ErrorKind::NotSupportedFeature,
            Self::PoolShutdown { .. } => ErrorKind::Other,
        }
    }
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Gix Errors ---

/// Wrapper for gix-specific errors.
///
/// Large error types are boxed to keep enum size manageable.
#[derive(Debug, Error)]
pub enum GixError {
    /// Failed to open repository.
    #[error("failed to open repository: {0}")]
    Open(#[from] Box<gix::open::Error>),

    /// Failed to initialize repository.
    #[error("failed to initialize repository: {0}")]
    Init(#[from] Box<gix::init::Error>),
}

// --- Git Errors ---

/// Git backend errors.
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found at the specified path.
    #[error("repository not found: {path}")]
    RepoNotFound { path: String },

    /// Git command execution failed.
    #[error("git command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// The git executable is not on `PATH`.
    #[error("git executable not found (not in PATH)")]
    ExecutableNotFound,

    /// Error from gix library.
    #[error("gix error: {0}")]
    Gix(#[from] GixError),

    /// Git produced output that could not be parsed.
    #[error("unexpected output from {command}: {line}")]
    Parse { command: String, line: String },
}

impl GitError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RepoNotFound { .. } => ErrorKind::NotFound,
            Self::ExecutableNotFound => ErrorKind::Configuration,
            Self::CommandFailed { .. } | Self::Gix(_) | Self::Parse { .. } => ErrorKind::BackendIo,
        }
    }
}
