// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Interfaces implemented by version-control backends.
//!
//! ```text
//! RepositoryHandler::open(repository)
//!         |
//!         v
//! RepositoryServiceProvider  (one per open repository, closed by its owner)
//!   commands()  --> Commands bit set      features() --> [Feature]
//!   log_command() / blame_command() / ...  --> &dyn <Command>Command
//!                                              or NotSupported
//! ```
//!
//! Executors return `Ok(None)` when the backend found nothing to report;
//! the command builders turn that into `CommandError::NoResult`.

pub mod context;
pub mod request;

#[cfg(test)]
mod tests;

use std::io::Write;

pub use context::ExecutionContext;
pub use request::{
    BlameCommandRequest, BrowseCommandRequest, CatCommandRequest, DiffCommandRequest,
    LogCommandRequest, PagedRemoteCommandRequest, RemoteCommandRequest,
};

use crate::api::{Command, Commands, Feature};
use crate::error::{CommandError, ScmError, ScmResult};
use crate::repository::changeset::{
    BlameResult, Branches, BrowserResult, Changeset, ChangesetPagingResult, PullResponse,
    PushResponse, Tags,
};

pub trait LogCommand {
    /// A page of history plus the size of the whole range.
    fn changesets(
        &self,
        context: &ExecutionContext,
        request: &LogCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>>;

    /// A single changeset; `None` if `id` does not exist.
    fn changeset(&self, context: &ExecutionContext, id: &str) -> ScmResult<Option<Changeset>>;
}

pub trait BlameCommand {
    fn blame(
        &self,
        context: &ExecutionContext,
        request: &BlameCommandRequest,
    ) -> ScmResult<Option<BlameResult>>;
}

pub trait BrowseCommand {
    fn browse(
        &self,
        context: &ExecutionContext,
        request: &BrowseCommandRequest,
    ) -> ScmResult<Option<BrowserResult>>;
}

pub trait CatCommand {
    /// Stream the file content into `output`.
    fn cat(
        &self,
        context: &ExecutionContext,
        request: &CatCommandRequest,
        output: &mut dyn Write,
    ) -> ScmResult<()>;
}

pub trait DiffCommand {
    /// Stream a unified diff into `output`.
    fn diff(
        &self,
        context: &ExecutionContext,
        request: &DiffCommandRequest,
        output: &mut dyn Write,
    ) -> ScmResult<()>;
}

pub trait TagsCommand {
    fn tags(&self, context: &ExecutionContext) -> ScmResult<Option<Tags>>;
}

pub trait BranchesCommand {
    fn branches(&self, context: &ExecutionContext) -> ScmResult<Option<Branches>>;
}

pub trait IncomingCommand {
    /// Changesets of the remote that are missing locally.
    fn incoming(
        &self,
        context: &ExecutionContext,
        request: &PagedRemoteCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>>;
}

pub trait OutgoingCommand {
    /// Local changesets that are missing in the remote.
    fn outgoing(
        &self,
        context: &ExecutionContext,
        request: &PagedRemoteCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>>;
}

pub trait PushCommand {
    fn push(
        &self,
        context: &ExecutionContext,
        request: &RemoteCommandRequest,
    ) -> ScmResult<PushResponse>;
}

pub trait PullCommand {
    fn pull(
        &self,
        context: &ExecutionContext,
        request: &RemoteCommandRequest,
    ) -> ScmResult<PullResponse>;
}

/// Capability table of one open repository.
///
/// Every command accessor fails with `CommandError::NotSupported` unless the
/// backend overrides it; the advertised [`Commands`] must match the
/// overridden accessors.
pub trait RepositoryServiceProvider: Send {
    /// Name of the backend type, e.g. `git`.
    fn backend(&self) -> &str;

    fn commands(&self) -> Commands;

    fn features(&self) -> &[Feature] {
        &[]
    }

    fn supports(&self, command: Command) -> bool {
        self.commands().supports(command)
    }

    fn supports_feature(&self, feature: &Feature) -> bool {
        self.features().contains(feature)
    }

    fn log_command(&self) -> ScmResult<&dyn LogCommand> {
        Err(not_supported(self.backend(), Command::Log))
    }

    fn blame_command(&self) -> ScmResult<&dyn BlameCommand> {
        Err(not_supported(self.backend(), Command::Blame))
    }

    fn browse_command(&self) -> ScmResult<&dyn BrowseCommand> {
        Err(not_supported(self.backend(), Command::Browse))
    }

    fn cat_command(&self) -> ScmResult<&dyn CatCommand> {
        Err(not_supported(self.backend(), Command::Cat))
    }

    fn diff_command(&self) -> ScmResult<&dyn DiffCommand> {
        Err(not_supported(self.backend(), Command::Diff))
    }

    fn tags_command(&self) -> ScmResult<&dyn TagsCommand> {
        Err(not_supported(self.backend(), Command::Tags))
    }

    fn branches_command(&self) -> ScmResult<&dyn BranchesCommand> {
        Err(not_supported(self.backend(), Command::Branches))
    }

    fn incoming_command(&self) -> ScmResult<&dyn IncomingCommand> {
        Err(not_supported(self.backend(), Command::Incoming))
    }

    fn outgoing_command(&self) -> ScmResult<&dyn OutgoingCommand> {
        Err(not_supported(self.backend(), Command::Outgoing))
    }

    fn push_command(&self) -> ScmResult<&dyn PushCommand> {
        Err(not_supported(self.backend(), Command::Push))
    }

    fn pull_command(&self) -> ScmResult<&dyn PullCommand> {
        Err(not_supported(self.backend(), Command::Pull))
    }

    /// Release backend handles. Called once by the owner.
    fn close(&mut self) -> ScmResult<()> {
        Ok(())
    }
}

/// `NotSupported` error for `what` on `backend`.
pub fn not_supported(backend: &str, what: impl ToString) -> ScmError {
    CommandError::NotSupported {
        what: what.to_string(),
        backend: backend.to_string(),
    }
    .into()
}
