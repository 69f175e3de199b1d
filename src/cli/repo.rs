// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository lifecycle arguments.
//!
//! # Subcommands
//!
//! ```text
//! repo create NAME [-t TYPE] [--contact MAIL] [--description TEXT] [--public]
//!   → provision storage, register
//! repo show NAME | repo list [--order ORDER] [--pattern GLOB]
//! repo modify NAME [--contact ..] [--description ..] [--public BOOL] [--permission ..]
//! repo archive NAME [--undo]
//! repo delete NAME
//! repo import [-t TYPE]
//!   → register existing storage under <directory>/<type>/
//! ```

use clap::{Args, Subcommand, ValueEnum};

use crate::repository::RepositoryOrder;

/// Arguments for the `repo` command.
#[derive(Debug, Clone, Args)]
pub struct RepoArgs {
    /// Repo subcommand.
    #[command(subcommand)]
    pub subcommand: RepoSubcommand,
}

/// Repo subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum RepoSubcommand {
    /// Creates a repository and its storage.
    Create(CreateArgs),

    /// Shows the metadata of a repository as JSON.
    Show(RepositoryRef),

    /// Lists readable repositories.
    List(ListArgs),

    /// Changes the metadata of a repository.
    Modify(ModifyArgs),

    /// Archives a repository, or restores it with --undo.
    Archive(ArchiveArgs),

    /// Deletes a repository and its storage.
    Delete(RepositoryRef),

    /// Registers repositories found in the storage directory.
    Import(ImportArgs),
}

/// A repository addressed by type and name.
#[derive(Debug, Clone, Args)]
pub struct RepositoryRef {
    /// Repository type.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "git")]
    pub backend: String,

    /// Repository name, e.g. `team/project`.
    #[arg(value_name = "NAME")]
    pub name: String,
}

/// Arguments for repo create.
#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Contact mail address.
    #[arg(long, value_name = "MAIL")]
    pub contact: Option<String>,

    /// Free-form description.
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Lets every authenticated user read the repository.
    #[arg(long)]
    pub public: bool,
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListOrder {
    /// By type, then name.
    #[default]
    Name,
    /// Oldest first.
    Created,
    /// Most recently modified first.
    Modified,
}

impl From<ListOrder> for RepositoryOrder {
    fn from(order: ListOrder) -> Self {
        match order {
            ListOrder::Name => Self::Name,
            ListOrder::Created => Self::CreationDate,
            ListOrder::Modified => Self::LastModified,
        }
    }
}

/// Arguments for repo list.
#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    /// Sort order.
    #[arg(long, value_enum, default_value_t)]
    pub order: ListOrder,

    /// Only lists repositories whose name matches the glob.
    #[arg(short = 'p', long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Skips the first N repositories.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub start: usize,

    /// Lists at most N repositories.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments for repo modify.
#[derive(Debug, Clone, Args)]
pub struct ModifyArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Contact mail address.
    #[arg(long, value_name = "MAIL")]
    pub contact: Option<String>,

    /// Free-form description.
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Whether every authenticated user may read the repository.
    #[arg(long, value_name = "BOOL")]
    pub public: Option<bool>,

    /// Grants a permission, e.g. `alice=write` or `@devs=read`.
    /// Can be specified multiple times.
    #[arg(long = "permission", value_name = "ENTRY", action = clap::ArgAction::Append)]
    pub permissions: Vec<String>,
}

/// Arguments for repo archive.
#[derive(Debug, Clone, Args)]
pub struct ArchiveArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Restores an archived repository.
    #[arg(long)]
    pub undo: bool,
}

/// Arguments for repo import.
#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// Repository type.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "git")]
    pub backend: String,
}
