// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository lifecycle commands.

use anyhow::anyhow;
use tracing::{info, warn};

use crate::cli::repo::{ModifyArgs, RepoArgs, RepoSubcommand, RepositoryRef};
use crate::cmd::print_json;
use crate::context::ScmContext;
use crate::error::{RepositoryError, Result};
use crate::repository::{Permission, Repository};
use crate::security::{PermissionType, Subject};

/// Main handler for repo command.
///
/// # Errors
///
/// Returns the registry error of the failed operation.
pub fn run_repo_command(args: &RepoArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let registry = context.registry();
    match &args.subcommand {
        RepoSubcommand::Create(create) => {
            let repository = Repository::builder()
                .name(create.repository.name.clone())
                .backend(create.repository.backend.clone())
                .maybe_contact(create.contact.clone())
                .maybe_description(create.description.clone())
                .public_readable(create.public)
                .build();
            let created = registry.create(subject, repository, true)?;
            println!("{} {}", created.id, created.display_name());
            Ok(())
        }
        RepoSubcommand::Show(reference) => print_json(&find(context, subject, reference)?),
        RepoSubcommand::List(list) => {
            let repositories = match &list.pattern {
                Some(pattern) => registry.search(subject, pattern)?,
                None => registry.get_all(subject, list.order.into(), list.start, list.limit)?,
            };
            if repositories.is_empty() {
                println!("No repositories found");
            }
            for repository in repositories {
                let archived = if repository.archived { " (archived)" } else { "" };
                println!(
                    "{:40} {}{archived}",
                    repository.display_name(),
                    repository.description.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        RepoSubcommand::Modify(modify) => {
            let repository = apply_changes(find(context, subject, &modify.repository)?, modify)?;
            let modified = registry.modify(subject, repository)?;
            println!("modified {}", modified.display_name());
            Ok(())
        }
        RepoSubcommand::Archive(archive) => {
            let repository = find(context, subject, &archive.repository)?;
            let modified = registry.archive(subject, &repository.id, !archive.undo)?;
            let state = if modified.archived { "archived" } else { "restored" };
            println!("{state} {}", modified.display_name());
            Ok(())
        }
        RepoSubcommand::Delete(reference) => {
            let repository = find(context, subject, reference)?;
            registry.delete(subject, &repository)?;
            println!("deleted {}", repository.display_name());
            Ok(())
        }
        RepoSubcommand::Import(import) => {
            let handler = registry.backends().configured(&import.backend)?;
            let mut imported = 0usize;
            for name in handler.find_repositories()? {
                if registry.get_by_name(subject, &import.backend, &name)?.is_some() {
                    continue;
                }
                let repository = Repository::builder()
                    .name(name.as_str())
                    .backend(import.backend.as_str())
                    .build();
                match registry.import(subject, repository) {
                    Ok(repository) => {
                        println!("imported {}", repository.display_name());
                        imported += 1;
                    }
                    Err(e) => warn!(name = %name, error = %e, "skipping repository"),
                }
            }
            info!(backend = %import.backend, imported, "import finished");
            Ok(())
        }
    }
}

fn find(context: &ScmContext, subject: &Subject, reference: &RepositoryRef) -> Result<Repository> {
    context
        .registry()
        .get_by_name(subject, &reference.backend, &reference.name)?
        .ok_or_else(|| {
            RepositoryError::NameNotFound {
                backend: reference.backend.clone(),
                name: reference.name.clone(),
            }
            .into()
        })
}

fn apply_changes(mut repository: Repository, modify: &ModifyArgs) -> Result<Repository> {
    if let Some(contact) = &modify.contact {
        repository.contact = Some(contact.clone()).filter(|c| !c.is_empty());
    }
    if let Some(description) = &modify.description {
        repository.description = Some(description.clone()).filter(|d| !d.is_empty());
    }
    if let Some(public) = modify.public {
        repository.public_readable = public;
    }
    for entry in &modify.permissions {
        let permission = parse_permission(entry)?;
        repository
            .permissions
            .retain(|p| p.name != permission.name || p.group != permission.group);
        repository.permissions.push(permission);
    }
    Ok(repository)
}

/// Parse `user=kind` or `@group=kind`.
fn parse_permission(entry: &str) -> Result<Permission> {
    let (name, kind) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid permission '{entry}', expected NAME=read|write|owner"))?;
    let kind: PermissionType = kind.trim().parse().map_err(|e: String| anyhow!(e))?;
    Ok(match name.trim().strip_prefix('@') {
        Some(group) => Permission::group(group, kind),
        None => Permission::user(name.trim(), kind),
    })
}
