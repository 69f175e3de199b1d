// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers --> ScmContext
//!   config, repo, query, hook
//! ```

pub mod config;
pub mod hook;
pub mod query;
pub mod repo;

use crate::api::RepositoryService;
use crate::cli::global::GlobalOptions;
use crate::cli::repo::RepositoryRef;
use crate::context::ScmContext;
use crate::error::Result;
use crate::security::Subject;

/// Subject for the user named on the command line, anonymous without one.
#[must_use]
pub fn subject(context: &ScmContext, global: &GlobalOptions) -> Subject {
    global
        .user_name()
        .map_or_else(Subject::anonymous, |name| context.subject(name))
}

/// Open a service on the repository `reference` names.
fn open_service(
    context: &ScmContext,
    subject: &Subject,
    reference: &RepositoryRef,
) -> Result<RepositoryService> {
    Ok(context
        .services()
        .create_by_name(subject, &reference.backend, &reference.name)?)
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
