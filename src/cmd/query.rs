// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository query and transfer commands.

use std::io::Write;

use crate::cli::command::{
    BlameArgs, BrowseArgs, CatArgs, DiffArgs, LogArgs, RefsArgs, RemoteArgs, TransferArgs,
};
use crate::cmd::{open_service, print_json};
use crate::context::ScmContext;
use crate::error::Result;
use crate::repository::changeset::{ChangesetPagingResult, FileObject};
use crate::security::Subject;

/// Print a page of changesets.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the log fails.
pub fn run_log_command(args: &LogArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let result = {
        let mut log = service.log_command()?;
        log.set_start_changeset(args.revision.as_deref())
            .set_end_changeset(args.until.as_deref())
            .set_branch(args.branch.as_deref())
            .set_path(args.path.as_deref())
            .set_paging_start(args.start)
            .set_paging_limit(args.limit)
            .set_disable_cache(args.query.no_cache)
            .set_disable_pre_processors(args.query.raw)
            .set_disable_escaping(true);
        log.get_changesets()?
    };
    service.close()?;
    print_changesets(&result, args.query.json)
}

/// Print the annotated lines of a file.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or blame fails.
pub fn run_blame_command(args: &BlameArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let result = {
        let mut blame = service.blame_command()?;
        blame
            .set_path(&args.path)
            .set_revision(args.revision.as_deref())
            .set_disable_cache(args.query.no_cache)
            .set_disable_pre_processors(args.query.raw)
            .set_disable_escaping(true);
        blame.get_blame_result()?
    };
    service.close()?;
    if args.query.json {
        return print_json(&result);
    }
    for line in &result.lines {
        println!(
            "{} {:20} {:>5} {}",
            short(&line.revision),
            line.author.name,
            line.line_number,
            line.code
        );
    }
    Ok(())
}

/// Print the files of a directory.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or browsing fails.
pub fn run_browse_command(
    args: &BrowseArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let result = {
        let mut browse = service.browse_command()?;
        browse
            .set_path(args.path.as_deref())
            .set_revision(args.revision.as_deref())
            .set_recursive(args.recursive)
            .set_disable_cache(args.query.no_cache)
            .set_disable_pre_processors(args.query.raw)
            .set_disable_escaping(true);
        browse.get_browser_result()?
    };
    service.close()?;
    if args.query.json {
        return print_json(&result);
    }
    print_files(&result.file.children, 0);
    Ok(())
}

fn print_files(files: &[FileObject], depth: usize) {
    for file in files {
        let length = file.length.map(|l| l.to_string()).unwrap_or_default();
        let suffix = if file.directory { "/" } else { "" };
        println!("{:>10} {}{}{suffix}", length, "  ".repeat(depth), file.name);
        print_files(&file.children, depth + 1);
    }
}

/// Write the content of a file to stdout.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the file is missing.
pub fn run_cat_command(args: &CatArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    {
        let mut cat = service.cat_command()?;
        cat.set_path(&args.path)
            .set_revision(args.revision.as_deref());
        let mut stdout = std::io::stdout().lock();
        cat.retrieve_content(&mut stdout)?;
        stdout.flush()?;
    }
    service.close()?;
    Ok(())
}

/// Write the patch of a revision to stdout.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the diff fails.
pub fn run_diff_command(args: &DiffArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    {
        let mut diff = service.diff_command()?;
        diff.set_revision(&args.revision)
            .set_path(args.path.as_deref());
        let mut stdout = std::io::stdout().lock();
        diff.retrieve_content(&mut stdout)?;
        stdout.flush()?;
    }
    service.close()?;
    Ok(())
}

/// Print the tags of a repository.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or has no tags.
pub fn run_tags_command(args: &RefsArgs, context: &ScmContext, subject: &Subject) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let tags = {
        let mut command = service.tags_command()?;
        command.set_disable_cache(args.query.no_cache);
        command.get_tags()?
    };
    service.close()?;
    if args.query.json {
        return print_json(&tags);
    }
    for tag in &tags.tags {
        println!("{} {}", short(&tag.revision), tag.name);
    }
    Ok(())
}

/// Print the branches of a repository, marking the default one.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or has no branches.
pub fn run_branches_command(
    args: &RefsArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let branches = {
        let mut command = service.branches_command()?;
        command.set_disable_cache(args.query.no_cache);
        command.get_branches()?
    };
    service.close()?;
    if args.query.json {
        return print_json(&branches);
    }
    for branch in &branches.branches {
        let marker = if branch.default { '*' } else { ' ' };
        println!("{marker} {} {}", short(&branch.revision), branch.name);
    }
    Ok(())
}

/// Print changesets the remote has and the repository lacks.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the remote fails.
pub fn run_incoming_command(
    args: &RemoteArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let result = {
        let mut incoming = service.incoming_command()?;
        incoming
            .set_remote(&args.remote)
            .set_paging_start(args.start)
            .set_paging_limit(args.limit)
            .set_disable_cache(args.query.no_cache)
            .set_disable_pre_processors(args.query.raw)
            .set_disable_escaping(true);
        incoming.get_changesets()?
    };
    service.close()?;
    print_changesets(&result, args.query.json)
}

/// Print changesets the repository has and the remote lacks.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the remote fails.
pub fn run_outgoing_command(
    args: &RemoteArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let result = {
        let mut outgoing = service.outgoing_command()?;
        outgoing
            .set_remote(&args.remote)
            .set_paging_start(args.start)
            .set_paging_limit(args.limit)
            .set_disable_cache(args.query.no_cache)
            .set_disable_pre_processors(args.query.raw)
            .set_disable_escaping(true);
        outgoing.get_changesets()?
    };
    service.close()?;
    print_changesets(&result, args.query.json)
}

/// Push every branch to a remote.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the push fails.
pub fn run_push_command(
    args: &TransferArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let response = {
        let mut push = service.push_command()?;
        push.set_remote(&args.remote);
        push.push()?
    };
    service.close()?;
    println!("pushed {} changesets", response.changesets);
    Ok(())
}

/// Pull every branch and tag from a remote.
///
/// # Errors
///
/// Returns an error if the repository cannot be opened or the pull fails.
pub fn run_pull_command(
    args: &TransferArgs,
    context: &ScmContext,
    subject: &Subject,
) -> Result<()> {
    let service = open_service(context, subject, &args.repository)?;
    let response = {
        let mut pull = service.pull_command()?;
        pull.set_remote(&args.remote);
        pull.pull()?
    };
    service.close()?;
    println!("pulled {} changesets", response.changesets);
    Ok(())
}

fn print_changesets(result: &ChangesetPagingResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    for changeset in &result.changesets {
        println!(
            "{} {} {:20} {}",
            short(&changeset.id),
            changeset.date.format("%Y-%m-%d %H:%M"),
            changeset.author.name,
            changeset.summary()
        );
    }
    println!("({} of {})", result.changesets.len(), result.total);
    Ok(())
}

fn short(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
