// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git CLI invocation against one bare repository.
//!
//! ```text
//! GitShell::run(ctx, ["rev-list", "HEAD"])
//!   ctx.check("rev-list")                    Cancelled / Timeout
//!   git rev-list HEAD
//!     cwd = GIT_DIR = <repository>
//!     GIT_TERMINAL_PROMPT=0, GCM_INTERACTIVE=never
//!     deadline = ctx.remaining(), token = ctx.token()
//! ```

use std::path::{Path, PathBuf};

use crate::error::{CommandError, ScmResult};
use crate::process::{ProcessBuilder, ProcessFlags, ProcessOutput};
use crate::repository::changeset::Changeset;
use crate::spi::ExecutionContext;

use super::parse::{LOG_FORMAT, parse_changesets};

/// Runs git commands inside one repository directory.
#[derive(Debug, Clone)]
pub(crate) struct GitShell {
    program: PathBuf,
    directory: PathBuf,
}

impl GitShell {
    pub(crate) fn new(program: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            directory: directory.into(),
        }
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }

    fn builder(&self, args: &[&str]) -> ProcessBuilder {
        let subcommand = args.first().copied().unwrap_or("git");
        ProcessBuilder::new(&self.program)
            .args(args)
            .name(format!("git {subcommand}"))
            .cwd(&self.directory)
            .env("GIT_DIR", &self.directory)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
    }

    fn execute(
        &self,
        context: &ExecutionContext,
        args: &[&str],
        input: Option<&[u8]>,
        flags: ProcessFlags,
    ) -> ScmResult<ProcessOutput> {
        context.check(args.first().copied().unwrap_or("git"))?;
        let mut builder = self
            .builder(args)
            .maybe_timeout(context.remaining())
            .flags(flags);
        if let Some(input) = input {
            builder = builder.stdin(input);
        }
        builder.run(context.token())
    }

    /// Run and fail on a non-zero exit.
    pub(crate) fn run(
        &self,
        context: &ExecutionContext,
        args: &[&str],
    ) -> ScmResult<ProcessOutput> {
        self.execute(context, args, None, ProcessFlags::empty())
    }

    /// Run with `input` on stdin and fail on a non-zero exit.
    pub(crate) fn run_with_input(
        &self,
        context: &ExecutionContext,
        args: &[&str],
        input: &[u8],
    ) -> ScmResult<ProcessOutput> {
        self.execute(context, args, Some(input), ProcessFlags::empty())
    }

    /// Delete every ref below `prefix`.
    pub(crate) fn delete_refs(&self, context: &ExecutionContext, prefix: &str) -> ScmResult<usize> {
        let refs = self.lines(context, &["for-each-ref", "--format=%(refname)", prefix])?;
        if refs.is_empty() {
            return Ok(0);
        }
        let commands: String = refs.iter().map(|name| format!("delete {name}\n")).collect();
        self.run_with_input(context, &["update-ref", "--stdin"], commands.as_bytes())?;
        Ok(refs.len())
    }

    /// Run and hand back the exit code instead of failing.
    pub(crate) fn probe(
        &self,
        context: &ExecutionContext,
        args: &[&str],
    ) -> ScmResult<ProcessOutput> {
        self.execute(context, args, None, ProcessFlags::ALLOW_FAILURE)
    }

    /// Stdout of a successful run, one entry per non-empty line.
    pub(crate) fn lines(
        &self,
        context: &ExecutionContext,
        args: &[&str],
    ) -> ScmResult<Vec<String>> {
        Ok(self
            .run(context, args)?
            .stdout_lossy()
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Full commit id of `revision`, or `None` if it names no commit.
    pub(crate) fn resolve_commit(
        &self,
        context: &ExecutionContext,
        revision: &str,
    ) -> ScmResult<Option<String>> {
        let revision = checked_argument("revision", revision)?;
        let spec = format!("{revision}^{{commit}}");
        let output = self.probe(context, &["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.success() {
            return Ok(None);
        }
        let id = output.stdout_lossy().trim().to_string();
        Ok((!id.is_empty()).then_some(id))
    }

    /// The changesets `ids`, in the given order.
    pub(crate) fn changesets(
        &self,
        context: &ExecutionContext,
        ids: &[String],
    ) -> ScmResult<Vec<Changeset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["log", "--no-walk=unsorted", "--no-color", LOG_FORMAT];
        args.extend(ids.iter().map(String::as_str));
        parse_changesets(&self.run(context, &args)?.stdout_lossy())
    }
}

/// Reject user input git would read as an option.
pub(crate) fn checked_argument<'a>(what: &str, value: &'a str) -> ScmResult<&'a str> {
    if value.starts_with('-') {
        return Err(CommandError::InvalidRequest {
            command: "git".to_string(),
            message: format!("{what} '{value}' must not start with '-'"),
        }
        .into());
    }
    Ok(value)
}
