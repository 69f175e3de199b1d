// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository command arguments.
//!
//! ```text
//! log NAME [--revision R] [--until R] [--branch B] [--path P] [--start N] [--limit N]
//! blame NAME PATH [--revision R]
//! browse NAME [PATH] [--revision R] [-r]
//! cat NAME PATH [--revision R]
//! diff NAME REVISION [PATH]
//! tags NAME | branches NAME
//! incoming NAME REMOTE | outgoing NAME REMOTE
//! push NAME REMOTE | pull NAME REMOTE
//! ```

use clap::Args;

use crate::cli::repo::RepositoryRef;

/// Output switches shared by the query commands.
#[derive(Debug, Clone, Default, Args)]
pub struct QueryOptions {
    /// Bypasses the result cache.
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Skips pre-processors such as keyword links.
    #[arg(long = "raw")]
    pub raw: bool,

    /// Prints results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `log` command.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Newest changeset to list.
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,

    /// Oldest changeset to list.
    #[arg(long, value_name = "REVISION")]
    pub until: Option<String>,

    /// Branch to list.
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Only lists changesets touching this path.
    #[arg(short = 'p', long, value_name = "PATH")]
    pub path: Option<String>,

    /// Skips the first N changesets.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub start: usize,

    /// Lists at most N changesets.
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub query: QueryOptions,
}

/// Arguments for the `blame` command.
#[derive(Debug, Clone, Args)]
pub struct BlameArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// File to annotate.
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Revision to annotate, defaults to the head.
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,

    #[command(flatten)]
    pub query: QueryOptions,
}

/// Arguments for the `browse` command.
#[derive(Debug, Clone, Args)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Directory to list, defaults to the root.
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Revision to list, defaults to the head.
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,

    /// Lists subdirectories too.
    #[arg(short = 'r', long)]
    pub recursive: bool,

    #[command(flatten)]
    pub query: QueryOptions,
}

/// Arguments for the `cat` command.
#[derive(Debug, Clone, Args)]
pub struct CatArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// File to print.
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Revision to read, defaults to the head.
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,
}

/// Arguments for the `diff` command.
#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Revision whose changes are printed.
    #[arg(value_name = "REVISION")]
    pub revision: String,

    /// Only prints changes below this path.
    #[arg(value_name = "PATH")]
    pub path: Option<String>,
}

/// Arguments for the `tags` and `branches` commands.
#[derive(Debug, Clone, Args)]
pub struct RefsArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    #[command(flatten)]
    pub query: QueryOptions,
}

/// Arguments for the `incoming` and `outgoing` commands.
#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Remote URL or path.
    #[arg(value_name = "REMOTE")]
    pub remote: String,

    /// Skips the first N changesets.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub start: usize,

    /// Lists at most N changesets.
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub query: QueryOptions,
}

/// Arguments for the `push` and `pull` commands.
#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    #[command(flatten)]
    pub repository: RepositoryRef,

    /// Remote URL or path.
    #[arg(value_name = "REMOTE")]
    pub remote: String,
}
