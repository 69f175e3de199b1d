// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::parse::{nest, parse_blame, parse_changesets, parse_refs, parse_tree};
use super::*;
use crate::backend::{RepositoryHandler, StorageProvisioner};
use crate::error::ErrorKind;
use crate::hook::RepositoryHookType;
use crate::repository::Repository;
use crate::spi::{ExecutionContext, IncomingCommand, OutgoingCommand, PagedRemoteCommandRequest};

const ID_A: &str = "1111111111111111111111111111111111111111";
const ID_B: &str = "2222222222222222222222222222222222222222";

fn git_repository(name: &str) -> Repository {
    Repository::builder().name(name).backend(GIT_TYPE).build()
}

#[test]
fn test_parse_changesets() {
    let output = format!(
        "{ID_B}\x1fFord Prefect\x1fford@betelgeuse.org\x1f1700000000\x1f{ID_A}\x1fAdd towel\n\nAlways know where it is.\n\x1e\n\
         {ID_A}\x1fArthur\x1f\x1f1600000000\x1f\x1fInitial\n\x1e\n"
    );
    let changesets = parse_changesets(&output).unwrap();
    assert_eq!(changesets.len(), 2);

    let newest = &changesets[0];
    assert_eq!(newest.id, ID_B);
    assert_eq!(newest.author.to_string(), "Ford Prefect <ford@betelgeuse.org>");
    assert_eq!(newest.date.timestamp(), 1_700_000_000);
    assert_eq!(newest.parents, [ID_A]);
    assert_eq!(newest.description, "Add towel\n\nAlways know where it is.");
    assert_eq!(newest.summary(), "Add towel");

    let root = &changesets[1];
    assert_eq!(root.author.mail, None);
    assert!(root.parents.is_empty());
}

#[test]
fn test_parse_changesets_rejects_truncated_record() {
    let err = parse_changesets(&format!("{ID_A}\x1fArthur\x1e")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendIo);
    assert!(
        err.to_string()
            .starts_with("git error: unexpected output from log: 1111"),
        "{err}"
    );
}

#[test]
fn test_parse_refs_peels_annotated_tags() {
    let output = format!("1.0\x1f{ID_A}\x1f\nv2\x1f{ID_A}\x1f{ID_B}\n");
    let refs = parse_refs(&output).unwrap();
    assert_eq!(refs[0].name, "1.0");
    assert_eq!(refs[0].revision, ID_A);
    assert_eq!(refs[1].revision, ID_B);
}

#[test]
fn test_parse_tree_and_nest() {
    let output = format!(
        "100644 blob {ID_A}      42\tREADME\0\
         040000 tree {ID_B}       -\tsrc\0\
         100644 blob {ID_A}     128\tsrc/main.rs\0\
         160000 commit {ID_B}       -\tvendor\0"
    );
    let entries = parse_tree(&output, "").unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].length, Some(42));
    assert!(entries[1].directory);
    assert_eq!(entries[1].length, None);
    assert_eq!(
        entries[3].sub_repository.as_ref().map(|s| s.revision.as_str()),
        Some(ID_B)
    );

    let tree = nest(entries);
    let names: Vec<_> = tree.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(names, ["README", "src", "vendor"]);
    assert_eq!(tree[1].children[0].path, "src/main.rs");
    assert_eq!(tree[1].children[0].name, "main.rs");
}

#[test]
fn test_parse_tree_prefixes_base() {
    let output = format!("100644 blob {ID_A}       7\tlib.rs\0");
    let entries = parse_tree(&output, "src").unwrap();
    assert_eq!(entries[0].path, "src/lib.rs");
    assert_eq!(entries[0].name, "lib.rs");
}

#[test]
fn test_parse_blame_porcelain() {
    let output = format!(
        "{ID_A} 1 1 2\n\
         author Arthur Dent\n\
         author-mail <arthur@earth.com>\n\
         author-time 1600000000\n\
         author-tz +0000\n\
         summary Initial\n\
         filename notes.txt\n\
         \tline one\n\
         {ID_A} 2 2\n\
         \tline two\n\
         {ID_B} 3 3 1\n\
         author Ford\n\
         author-mail <>\n\
         author-time 1700000000\n\
         summary Add towel\n\
         previous {ID_A} notes.txt\n\
         filename notes.txt\n\
         \ttowel\n"
    );
    let blame = parse_blame(&output).unwrap();
    assert_eq!(blame.total(), 3);
    assert_eq!(blame.lines[1].line_number, 2);
    assert_eq!(blame.lines[1].code, "line two");
    assert_eq!(blame.lines[1].author.to_string(), "Arthur Dent <arthur@earth.com>");
    assert_eq!(blame.lines[2].revision, ID_B);
    assert_eq!(blame.lines[2].author.mail, None);
    assert_eq!(blame.lines[2].description.as_deref(), Some("Add towel"));
}

#[test]
fn test_hook_script_content() {
    let scripts = HookScripts::new("/usr/bin/scm-hub")
        .with_config(Some(PathBuf::from("/etc/scm hub/config.toml")));
    let script = scripts.script(RepositoryHookType::PreReceive, &git_repository("it's-mine"));
    insta::assert_snapshot!(script, @r"
    #!/bin/sh
    # managed by scm-hub, rewritten on every repository change
    exec '/usr/bin/scm-hub' --config '/etc/scm hub/config.toml' hook pre-receive git 'it'\''s-mine'
    ");
}

#[test]
fn test_handler_provisions_bare_repository() {
    let root = TempDir::new().unwrap();
    let handler = GitRepositoryHandler::new(root.path())
        .with_git(Some(PathBuf::from("git")))
        .with_hook_scripts(Some(HookScripts::new("/usr/bin/scm-hub")));
    let repository = git_repository("towel");
    let directory = handler.directory(&repository);

    handler.create(&repository, &directory).unwrap();
    assert!(handler.is_repository(&directory));
    assert!(directory.join("hooks/post-receive").is_file());
    // an unborn HEAD still names a branch
    assert!(super::query::head_branch(&directory).is_some());

    let err = handler.create(&repository, &directory).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendIo);

    handler.delete(&repository, &directory).unwrap();
    assert!(!directory.exists());
    handler.delete(&repository, &directory).unwrap();
}

#[test]
fn test_handler_without_git_is_unconfigured() {
    let root = TempDir::new().unwrap();
    let handler = GitRepositoryHandler::new(root.path()).with_git(None);
    assert!(!handler.is_configured());

    let repository = git_repository("towel");
    let directory = handler.directory(&repository);
    handler.create(&repository, &directory).unwrap();
    let Err(err) = handler.open(&repository) else {
        panic!("opening needs a git executable");
    };
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_open_missing_repository() {
    let root = TempDir::new().unwrap();
    let handler = GitRepositoryHandler::new(root.path()).with_git(Some(PathBuf::from("git")));
    let Err(err) = handler.open(&git_repository("ghost")) else {
        panic!("ghost does not exist");
    };
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn git(directory: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(directory)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_NAME", "Arthur Dent")
        .env("GIT_AUTHOR_EMAIL", "arthur@earth.com")
        .env("GIT_COMMITTER_NAME", "Arthur Dent")
        .env("GIT_COMMITTER_EMAIL", "arthur@earth.com")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Non-bare repository with `commits` commits on its current branch.
fn work_repository(root: &Path, name: &str, commits: usize) -> String {
    let work = root.join(name);
    std::fs::create_dir_all(&work).unwrap();
    git(&work, &["init", "-q"]);
    for index in 0..commits {
        std::fs::write(work.join("towel.txt"), format!("{name} {index}\n")).unwrap();
        git(&work, &["add", "towel.txt"]);
        git(
            &work,
            &["commit", "-q", "--no-gpg-sign", "-m", &format!("{name} {index}")],
        );
    }
    work.to_str().unwrap().to_string()
}

fn compare_request(remote: &str) -> PagedRemoteCommandRequest {
    PagedRemoteCommandRequest {
        remote: remote.to_string(),
        paging_start: 0,
        paging_limit: None,
    }
}

#[test]
fn test_concurrent_comparisons_keep_remotes_apart() {
    if which::which("git").is_err() {
        return;
    }
    let root = TempDir::new().unwrap();
    let managed = root.path().join("managed.git");
    git(root.path(), &["init", "-q", "--bare", managed.to_str().unwrap()]);
    let small = work_repository(root.path(), "small", 1);
    let large = work_repository(root.path(), "large", 7);
    let provider = GitServiceProvider::new("git", &managed);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            for (remote, expected) in [(&small, 1), (&large, 7)] {
                let provider = &provider;
                scope.spawn(move || {
                    let context = ExecutionContext::default();
                    let result = provider
                        .incoming(&context, &compare_request(remote))
                        .unwrap()
                        .unwrap();
                    assert_eq!(result.total, expected, "incoming from {remote}");
                });
            }
        }
    });

    // fetched branches do not outlive the comparison
    assert_eq!(git(&managed, &["for-each-ref", "refs/scm-hub"]), "");
}

#[test]
fn test_outgoing_to_empty_remote() {
    if which::which("git").is_err() {
        return;
    }
    let root = TempDir::new().unwrap();
    let source = work_repository(root.path(), "source", 3);
    let managed = root.path().join("managed.git");
    git(
        root.path(),
        &["clone", "-q", "--bare", &source, managed.to_str().unwrap()],
    );
    let empty = root.path().join("empty.git");
    git(root.path(), &["init", "-q", "--bare", empty.to_str().unwrap()]);

    let provider = GitServiceProvider::new("git", &managed);
    let result = provider
        .outgoing(
            &ExecutionContext::default(),
            &compare_request(empty.to_str().unwrap()),
        )
        .unwrap()
        .unwrap();
    assert_eq!(result.total, 3);
    assert_eq!(git(&managed, &["for-each-ref", "refs/scm-hub"]), "");
}
