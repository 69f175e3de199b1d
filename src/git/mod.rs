// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reference git backend.
//!
//! ```text
//!             BackendRegistry
//!                   |
//!                   v
//!      ,-------------------------,
//!      |  GitRepositoryHandler   |
//!      '---+----------------+----'
//!          |                |
//!          v                v
//!      query.rs         provider.rs
//!    (gix, storage)   (git CLI, commands)
//!      init_bare        GitServiceProvider
//!      open / HEAD        via GitShell
//!                           |
//!                           v
//!                       parse.rs
//! ```
//!
//! **gix** serves storage queries without a subprocess. **git CLI** runs the
//! commands, each bounded by the deadline and cancellation token of its
//! [`crate::spi::ExecutionContext`].

pub mod handler;
pub mod hook;
pub mod parse;
pub mod provider;
pub mod query;
mod shell;

#[cfg(test)]
mod tests;

pub use handler::{GitRepositoryHandler, HookScripts};
pub use hook::GitHookChangesetProvider;
pub use provider::GitServiceProvider;

/// Backend type name of git repositories.
pub const GIT_TYPE: &str = "git";
