// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command executors of the git backend.
//!
//! ```text
//! log        rev-list <start|branch|HEAD> [-- path], page, log --no-walk
//! blame      blame --porcelain <commit> -- path
//! browse     ls-tree -l -z [-r -t] <commit>[:path]
//! cat        cat-file blob <commit>:path
//! diff       diff-tree -p --root -r <commit> [-- path]
//! tags       for-each-ref refs/tags        (peeled)
//! branches   for-each-ref refs/heads       default = HEAD (gix)
//! incoming   fetch into refs/scm-hub/remote/<uuid>/*, rev-list remote --not local
//! outgoing   fetch into refs/scm-hub/remote/<uuid>/*, rev-list local --not remote
//!            the namespace is deleted once the comparison is done
//! push       outgoing count, push refs/heads/*
//! pull       incoming count, fetch refs/heads/* refs/tags/*
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::parse::{REF_FORMAT, nest, parse_blame, parse_refs, parse_tree};
use super::query;
use super::shell::{GitShell, checked_argument};
use crate::api::Commands;
use crate::error::{CommandError, ScmResult};
use crate::repository::changeset::{
    BlameResult, Branch, Branches, BrowserResult, Changeset, ChangesetPagingResult, FileObject,
    PullResponse, PushResponse, Tag, Tags,
};
use crate::spi::{
    BlameCommand, BlameCommandRequest, BranchesCommand, BrowseCommand, BrowseCommandRequest,
    CatCommand, CatCommandRequest, DiffCommand, DiffCommandRequest, ExecutionContext,
    IncomingCommand, LogCommand, LogCommandRequest, OutgoingCommand, PagedRemoteCommandRequest,
    PullCommand, PushCommand, RemoteCommandRequest, RepositoryServiceProvider, TagsCommand,
};

/// Root of the per-comparison namespaces holding fetched remote branches.
const REMOTE_NAMESPACE: &str = "refs/scm-hub/remote";

/// Deadline for deleting a comparison namespace.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Service provider of one bare git repository.
#[derive(Debug)]
pub struct GitServiceProvider {
    shell: GitShell,
}

impl GitServiceProvider {
    pub fn new(git: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            shell: GitShell::new(git, directory),
        }
    }

    /// Commit of `revision`, defaulting to HEAD.
    fn commit(&self, context: &ExecutionContext, revision: Option<&str>) -> ScmResult<String> {
        let revision = revision.unwrap_or("HEAD");
        self.shell
            .resolve_commit(context, revision)?
            .ok_or_else(|| {
                CommandError::ChangesetNotFound {
                    id: revision.to_string(),
                }
                .into()
            })
    }

    /// Fail with `PathNotFound` unless `path` exists in `commit`.
    fn require_path(&self, context: &ExecutionContext, commit: &str, path: &str) -> ScmResult<()> {
        let object = format!("{commit}:{path}");
        if self
            .shell
            .probe(context, &["cat-file", "-e", &object])?
            .success()
        {
            Ok(())
        } else {
            Err(CommandError::PathNotFound {
                path: path.to_string(),
            }
            .into())
        }
    }

    fn page(
        &self,
        context: &ExecutionContext,
        ids: &[String],
        start: usize,
        limit: Option<usize>,
    ) -> ScmResult<ChangesetPagingResult> {
        let end = limit.map_or(ids.len(), |limit| start.saturating_add(limit).min(ids.len()));
        let page = ids.get(start.min(ids.len())..end).unwrap_or_default();
        Ok(ChangesetPagingResult::new(
            ids.len(),
            self.shell.changesets(context, page)?,
        ))
    }

    /// Fetch the branches of `remote` into a namespace private to this call.
    fn fetch_remote(
        &self,
        context: &ExecutionContext,
        remote: &str,
    ) -> ScmResult<RemoteSnapshot<'_>> {
        let remote = checked_argument("remote", remote)?;
        let snapshot = RemoteSnapshot {
            shell: &self.shell,
            namespace: format!("{REMOTE_NAMESPACE}/{}", Uuid::new_v4().simple()),
        };
        let refspec = format!("+refs/heads/*:{}/*", snapshot.namespace);
        debug!(
            directory = %self.shell.directory().display(),
            remote,
            namespace = %snapshot.namespace,
            "fetching remote branches for comparison"
        );
        self.shell
            .run(context, &["fetch", "--quiet", "--no-tags", remote, &refspec])?;
        Ok(snapshot)
    }
}

/// Remote branches fetched for one comparison, deleted again on drop.
struct RemoteSnapshot<'a> {
    shell: &'a GitShell,
    namespace: String,
}

impl RemoteSnapshot<'_> {
    fn glob(&self) -> String {
        format!("--glob={}/*", self.namespace)
    }

    /// Commits reachable from the remote branches but not the local ones.
    fn incoming_ids(&self, context: &ExecutionContext) -> ScmResult<Vec<String>> {
        self.shell
            .lines(context, &["rev-list", &self.glob(), "--not", "--branches"])
    }

    /// Commits reachable from the local branches but not the remote ones.
    fn outgoing_ids(&self, context: &ExecutionContext) -> ScmResult<Vec<String>> {
        self.shell
            .lines(context, &["rev-list", "--branches", "--not", &self.glob()])
    }
}

impl Drop for RemoteSnapshot<'_> {
    fn drop(&mut self) {
        // runs after cancellation too, so it gets a context of its own
        let context = ExecutionContext::new(Some(CLEANUP_TIMEOUT));
        if let Err(err) = self.shell.delete_refs(&context, &self.namespace) {
            warn!(
                directory = %self.shell.directory().display(),
                namespace = %self.namespace,
                error = %err,
                "failed to delete fetched remote branches"
            );
        }
    }
}

fn relative(path: &str) -> &str {
    path.trim_matches('/')
}

impl LogCommand for GitServiceProvider {
    fn changesets(
        &self,
        context: &ExecutionContext,
        request: &LogCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>> {
        let revision = request
            .start_changeset
            .as_deref()
            .or(request.branch.as_deref());
        let Some(head) = self.shell.resolve_commit(context, revision.unwrap_or("HEAD"))? else {
            // an empty repository has no history yet
            return Ok(revision.is_none().then(ChangesetPagingResult::default));
        };

        let mut args = vec!["rev-list", head.as_str()];
        if let Some(path) = request.path.as_deref() {
            args.extend(["--", relative(path)]);
        }
        let mut ids = self.shell.lines(context, &args)?;

        if let Some(end) = request.end_changeset.as_deref() {
            let Some(end) = self.shell.resolve_commit(context, end)? else {
                return Ok(None);
            };
            let Some(position) = ids.iter().position(|id| *id == end) else {
                return Ok(None);
            };
            ids.truncate(position + 1);
        }

        let mut result =
            self.page(context, &ids, request.paging_start, request.paging_limit)?;
        result.branch.clone_from(&request.branch);
        Ok(Some(result))
    }

    fn changeset(&self, context: &ExecutionContext, id: &str) -> ScmResult<Option<Changeset>> {
        let Some(commit) = self.shell.resolve_commit(context, id)? else {
            return Ok(None);
        };
        Ok(self.shell.changesets(context, &[commit])?.into_iter().next())
    }
}

impl BlameCommand for GitServiceProvider {
    fn blame(
        &self,
        context: &ExecutionContext,
        request: &BlameCommandRequest,
    ) -> ScmResult<Option<BlameResult>> {
        let commit = self.commit(context, request.revision.as_deref())?;
        let path = relative(&request.path);
        self.require_path(context, &commit, path)?;
        let output = self
            .shell
            .run(context, &["blame", "--porcelain", &commit, "--", path])?;
        Ok(Some(parse_blame(&output.stdout_lossy())?))
    }
}

impl BrowseCommand for GitServiceProvider {
    fn browse(
        &self,
        context: &ExecutionContext,
        request: &BrowseCommandRequest,
    ) -> ScmResult<Option<BrowserResult>> {
        let commit = match self
            .shell
            .resolve_commit(context, request.revision.as_deref().unwrap_or("HEAD"))?
        {
            Some(commit) => commit,
            None if request.revision.is_none() => return Ok(None),
            None => {
                return Err(CommandError::ChangesetNotFound {
                    id: request.revision.clone().unwrap_or_default(),
                }
                .into());
            }
        };
        let path = checked_argument("path", relative(request.path.as_deref().unwrap_or("")))?;

        let tree = if path.is_empty() {
            commit.clone()
        } else {
            self.require_path(context, &commit, path)?;
            let object = format!("{commit}:{path}");
            let kind = self.shell.run(context, &["cat-file", "-t", &object])?;
            if kind.stdout_lossy().trim() != "tree" {
                let entry = self
                    .shell
                    .run(context, &["ls-tree", "-l", "-z", &commit, path])?;
                let file = parse_tree(&entry.stdout_lossy(), "")?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CommandError::PathNotFound {
                        path: path.to_string(),
                    })?;
                return Ok(Some(BrowserResult {
                    revision: commit,
                    file,
                }));
            }
            object
        };

        let mut args = vec!["ls-tree", "-l", "-z"];
        if request.recursive {
            args.extend(["-r", "-t"]);
        }
        args.push(&tree);
        let entries = parse_tree(&self.shell.run(context, &args)?.stdout_lossy(), path)?;

        let mut root = FileObject::directory(path);
        root.children = if request.recursive {
            nest(entries)
        } else {
            entries
        };
        Ok(Some(BrowserResult {
            revision: commit,
            file: root,
        }))
    }
}

impl CatCommand for GitServiceProvider {
    fn cat(
        &self,
        context: &ExecutionContext,
        request: &CatCommandRequest,
        output: &mut dyn Write,
    ) -> ScmResult<()> {
        let commit = self.commit(context, request.revision.as_deref())?;
        let path = relative(&request.path);
        self.require_path(context, &commit, path)?;
        let object = format!("{commit}:{path}");
        let content = self.shell.run(context, &["cat-file", "blob", &object])?;
        output.write_all(content.stdout())?;
        Ok(())
    }
}

impl DiffCommand for GitServiceProvider {
    fn diff(
        &self,
        context: &ExecutionContext,
        request: &DiffCommandRequest,
        output: &mut dyn Write,
    ) -> ScmResult<()> {
        let commit = self.commit(context, Some(&request.revision))?;
        let mut args = vec!["diff-tree", "-p", "--root", "-r", "--no-commit-id", commit.as_str()];
        if let Some(path) = request.path.as_deref() {
            args.extend(["--", relative(path)]);
        }
        let diff = self.shell.run(context, &args)?;
        output.write_all(diff.stdout())?;
        Ok(())
    }
}

impl TagsCommand for GitServiceProvider {
    fn tags(&self, context: &ExecutionContext) -> ScmResult<Option<Tags>> {
        let output = self
            .shell
            .run(context, &["for-each-ref", REF_FORMAT, "refs/tags"])?;
        let tags = parse_refs(&output.stdout_lossy())?
            .into_iter()
            .map(|line| Tag {
                name: line.name,
                revision: line.revision,
            })
            .collect();
        Ok(Some(Tags { tags }))
    }
}

impl BranchesCommand for GitServiceProvider {
    fn branches(&self, context: &ExecutionContext) -> ScmResult<Option<Branches>> {
        let output = self
            .shell
            .run(context, &["for-each-ref", REF_FORMAT, "refs/heads"])?;
        let head = query::head_branch(self.shell.directory());
        let branches = parse_refs(&output.stdout_lossy())?
            .into_iter()
            .map(|line| Branch {
                default: head.as_deref() == Some(line.name.as_str()),
                name: line.name,
                revision: line.revision,
            })
            .collect();
        Ok(Some(Branches { branches }))
    }
}

impl IncomingCommand for GitServiceProvider {
    fn incoming(
        &self,
        context: &ExecutionContext,
        request: &PagedRemoteCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>> {
        let ids = self
            .fetch_remote(context, &request.remote)?
            .incoming_ids(context)?;
        Ok(Some(self.page(
            context,
            &ids,
            request.paging_start,
            request.paging_limit,
        )?))
    }
}

impl OutgoingCommand for GitServiceProvider {
    fn outgoing(
        &self,
        context: &ExecutionContext,
        request: &PagedRemoteCommandRequest,
    ) -> ScmResult<Option<ChangesetPagingResult>> {
        let ids = self
            .fetch_remote(context, &request.remote)?
            .outgoing_ids(context)?;
        Ok(Some(self.page(
            context,
            &ids,
            request.paging_start,
            request.paging_limit,
        )?))
    }
}

impl PushCommand for GitServiceProvider {
    fn push(
        &self,
        context: &ExecutionContext,
        request: &RemoteCommandRequest,
    ) -> ScmResult<PushResponse> {
        let changesets = self
            .fetch_remote(context, &request.remote)?
            .outgoing_ids(context)?
            .len();
        self.shell.run(
            context,
            &["push", "--quiet", &request.remote, "refs/heads/*:refs/heads/*"],
        )?;
        Ok(PushResponse { changesets })
    }
}

impl PullCommand for GitServiceProvider {
    fn pull(
        &self,
        context: &ExecutionContext,
        request: &RemoteCommandRequest,
    ) -> ScmResult<PullResponse> {
        let changesets = self
            .fetch_remote(context, &request.remote)?
            .incoming_ids(context)?
            .len();
        self.shell.run(
            context,
            &[
                "fetch",
                "--quiet",
                "--update-head-ok",
                &request.remote,
                "refs/heads/*:refs/heads/*",
                "refs/tags/*:refs/tags/*",
            ],
        )?;
        Ok(PullResponse { changesets })
    }
}

impl RepositoryServiceProvider for GitServiceProvider {
    fn backend(&self) -> &str {
        super::GIT_TYPE
    }

    fn commands(&self) -> Commands {
        Commands::all()
    }

    fn log_command(&self) -> ScmResult<&dyn LogCommand> {
        Ok(self)
    }

    fn blame_command(&self) -> ScmResult<&dyn BlameCommand> {
        Ok(self)
    }

    fn browse_command(&self) -> ScmResult<&dyn BrowseCommand> {
        Ok(self)
    }

    fn cat_command(&self) -> ScmResult<&dyn CatCommand> {
        Ok(self)
    }

    fn diff_command(&self) -> ScmResult<&dyn DiffCommand> {
        Ok(self)
    }

    fn tags_command(&self) -> ScmResult<&dyn TagsCommand> {
        Ok(self)
    }

    fn branches_command(&self) -> ScmResult<&dyn BranchesCommand> {
        Ok(self)
    }

    fn incoming_command(&self) -> ScmResult<&dyn IncomingCommand> {
        Ok(self)
    }

    fn outgoing_command(&self) -> ScmResult<&dyn OutgoingCommand> {
        Ok(self)
    }

    fn push_command(&self) -> ScmResult<&dyn PushCommand> {
        Ok(self)
    }

    fn pull_command(&self) -> ScmResult<&dyn PullCommand> {
        Ok(self)
    }
}
