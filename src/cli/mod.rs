// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for scm-hub using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! scm-hub [global options] <command>
//! version | options | types
//! repo {create|show|list|modify|archive|delete|import}
//! log | blame | browse | cat | diff | tags | branches
//! incoming | outgoing | push | pull
//! hook {pre-receive|post-receive} <type> <name>
//! hook-url
//! ```

pub mod command;
pub mod global;
pub mod hook;
pub mod repo;


use crate::cli::command::{
    BlameArgs, BrowseArgs, CatArgs, DiffArgs, LogArgs, RefsArgs, RemoteArgs, TransferArgs,
};
use crate::cli::global::GlobalOptions;
use crate::cli::hook::{HookArgs, HookUrlArgs};
use crate::cli::repo::RepoArgs;
use clap::{Parser, Subcommand};

/// Repository management over version-control backends.
#[derive(Debug, Parser)]
#[command(
    name = "scm-hub",
    author,
    version,
    about = "Repository management over version-control backends",
    long_about = "scm-hub Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Creates, lists and removes hosted repositories, and queries\n\
                  their history, content and references. See\n\
                  `scm-hub <command> --help` for more information about a command.",
    after_help = "CONFIGURATION:\n\n\
                  scm-hub reads `scm-hub.toml` from the working directory, then every\n\
                  file given with --config, then SCM_<SECTION>__<KEY> environment\n\
                  variables, then --set overrides. Use --no-default-config to skip\n\
                  the working directory file."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their values.
    Options,

    /// Lists the repository types and whether they are usable.
    Types,

    /// Manages repositories.
    Repo(RepoArgs),

    /// Shows the history of a repository.
    Log(LogArgs),

    /// Shows who last changed each line of a file.
    Blame(BlameArgs),

    /// Lists the files of a revision.
    Browse(BrowseArgs),

    /// Prints the content of a file.
    Cat(CatArgs),

    /// Prints the changes of a revision.
    Diff(DiffArgs),

    /// Lists the tags of a repository.
    Tags(RefsArgs),

    /// Lists the branches of a repository.
    Branches(RefsArgs),

    /// Lists changesets a remote has that the repository does not.
    Incoming(RemoteArgs),

    /// Lists changesets the repository has that a remote does not.
    Outgoing(RemoteArgs),

    /// Pushes all branches to a remote.
    Push(TransferArgs),

    /// Pulls all branches and tags from a remote.
    Pull(TransferArgs),

    /// Runs the hooks of a repository; called by installed hook scripts.
    Hook(HookArgs),

    /// Prints the callback URL used by hook scripts.
    #[command(name = "hook-url")]
    HookUrl(HookUrlArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
