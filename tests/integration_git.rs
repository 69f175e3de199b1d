// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! End-to-end tests of the git backend.
//!
//! A managed bare repository is filled through a working clone driven by the
//! git CLI, then read back through the repository services. Skipped when git
//! is not installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use scm_hub::config::Config;
use scm_hub::context::ScmContext;
use scm_hub::error::ErrorKind;
use scm_hub::repository::{Permission, Repository};
use scm_hub::security::{PermissionType, Subject};
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    work: PathBuf,
    managed: PathBuf,
    branch: String,
    context: ScmContext,
    admin: Subject,
}

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(directory: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(directory)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_NAME", "Arthur Dent")
        .env("GIT_AUTHOR_EMAIL", "arthur@example.com")
        .env("GIT_COMMITTER_NAME", "Arthur Dent")
        .env("GIT_COMMITTER_EMAIL", "arthur@example.com")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit(work: &Path, file: &str, content: &str, message: &str) -> String {
    let path = work.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    git(work, &["add", file]);
    git(work, &["commit", "-q", "--no-gpg-sign", "-m", message]);
    git(work, &["rev-parse", "HEAD"])
}

/// Managed repository `demo` with three pushed commits and tag `v1.0`.
fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config::parse(
        r#"
[hooks]
workers = 1
install_scripts = false

[security]
admin_users = ["root"]
"#,
    )
    .unwrap();
    config.repositories.directory = root.path().join("repositories");

    let context = ScmContext::from_config(config, None).unwrap();
    let admin = context.subject("root");
    let repository = context
        .registry()
        .create(
            &admin,
            Repository::builder().name("demo").backend("git").build(),
            true,
        )
        .unwrap();
    let managed = context.registry().directory(&repository).unwrap();
    let branch = git(&managed, &["symbolic-ref", "--short", "HEAD"]);

    let work = root.path().join("work");
    git(
        root.path(),
        &["clone", "-q", managed.to_str().unwrap(), work.to_str().unwrap()],
    );
    git(&work, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
    commit(&work, "README.md", "first line\n", "Add readme");
    commit(
        &work,
        "README.md",
        "first line\nsecond line\n",
        "Extend readme",
    );
    commit(&work, "src/main.c", "int main;\n", "Add sources");
    git(&work, &["tag", "v1.0"]);
    git(&work, &["push", "-q", "origin", &branch, "v1.0"]);

    Fixture {
        _root: root,
        work,
        managed,
        branch,
        context,
        admin,
    }
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn test_log_lists_pushed_history() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();

    let result = service.log_command().unwrap().get_changesets().unwrap();
    assert_eq!(result.total, 3);
    let summaries: Vec<&str> = result.changesets.iter().map(|c| c.summary()).collect();
    assert_eq!(summaries, ["Add sources", "Extend readme", "Add readme"]);
    assert_eq!(result.changesets[0].author.name, "Arthur Dent");
    assert_eq!(
        result.changesets[0].author.mail.as_deref(),
        Some("arthur@example.com")
    );

    let page = service
        .log_command()
        .unwrap()
        .set_paging_start(1)
        .set_paging_limit(Some(1))
        .get_changesets()
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.changesets.len(), 1);
    assert_eq!(page.changesets[0].summary(), "Extend readme");

    let readme = service
        .log_command()
        .unwrap()
        .set_path(Some("README.md"))
        .get_changesets()
        .unwrap();
    assert_eq!(readme.total, 2);
    service.close().unwrap();
}

#[test]
fn test_refs_and_content() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();
    let head = git(&fx.managed, &["rev-parse", "HEAD"]);

    let tags = service.tags_command().unwrap().get_tags().unwrap();
    assert_eq!(tags.tags.len(), 1);
    assert_eq!(tags.tags[0].name, "v1.0");
    assert_eq!(tags.tags[0].revision, head);

    let branches = service.branches_command().unwrap().get_branches().unwrap();
    assert_eq!(branches.branches.len(), 1);
    assert_eq!(branches.branches[0].name, fx.branch);
    assert!(branches.branches[0].default);

    let first = git(&fx.managed, &["rev-parse", "HEAD~2"]);
    let content = service
        .cat_command()
        .unwrap()
        .set_path("README.md")
        .set_revision(Some(&first))
        .get_content()
        .unwrap();
    assert_eq!(content, b"first line\n");

    let second = git(&fx.managed, &["rev-parse", "HEAD~1"]);
    let diff = service
        .diff_command()
        .unwrap()
        .set_revision(&second)
        .get_content()
        .unwrap();
    assert!(diff.contains("+second line"), "{diff}");
    assert!(!diff.contains("main.c"));
    service.close().unwrap();
}

#[test]
fn test_browse_and_blame() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();

    let root = service
        .browse_command()
        .unwrap()
        .get_browser_result()
        .unwrap();
    let mut names: Vec<&str> = root.file.children.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["README.md", "src"]);
    let src = root
        .file
        .children
        .iter()
        .find(|f| f.name == "src")
        .unwrap();
    assert!(src.directory);

    let blame = service
        .blame_command()
        .unwrap()
        .set_path("README.md")
        .get_blame_result()
        .unwrap();
    assert_eq!(blame.total(), 2);
    assert_eq!(blame.lines[0].code, "first line");
    assert_eq!(blame.lines[1].code, "second line");
    assert_ne!(blame.lines[0].revision, blame.lines[1].revision);

    let missing = service
        .blame_command()
        .unwrap()
        .set_path("absent.txt")
        .get_blame_result();
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);
    service.close().unwrap();
}

// =============================================================================
// Remote exchange
// =============================================================================

#[test]
fn test_incoming_then_pull() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    commit(&fx.work, "NEWS", "nothing yet\n", "Add news");
    let remote = fx.work.to_str().unwrap().to_string();

    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();

    let incoming = service
        .incoming_command()
        .unwrap()
        .set_remote(&remote)
        .get_changesets()
        .unwrap();
    assert_eq!(incoming.total, 1);
    assert_eq!(incoming.changesets[0].summary(), "Add news");

    let outgoing = service
        .outgoing_command()
        .unwrap()
        .set_remote(&remote)
        .get_changesets()
        .unwrap();
    assert_eq!(outgoing.total, 0);

    // the log is cached until the pull lands
    assert_eq!(
        service.log_command().unwrap().get_changesets().unwrap().total,
        3
    );
    let pulled = service.pull_command().unwrap().set_remote(&remote).pull().unwrap();
    assert_eq!(pulled.changesets, 1);
    assert_eq!(
        service.log_command().unwrap().get_changesets().unwrap().total,
        4
    );
    service.close().unwrap();
}

#[test]
fn test_outgoing_then_push() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let mirror = fx.work.with_file_name("mirror.git");
    git(
        fx.work.parent().unwrap(),
        &["init", "-q", "--bare", mirror.to_str().unwrap()],
    );
    let remote = mirror.to_str().unwrap().to_string();

    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();
    let outgoing = service
        .outgoing_command()
        .unwrap()
        .set_remote(&remote)
        .get_changesets()
        .unwrap();
    assert_eq!(outgoing.total, 3);

    let pushed = service.push_command().unwrap().set_remote(&remote).push().unwrap();
    assert_eq!(pushed.changesets, 3);
    assert_eq!(
        git(&mirror, &["rev-parse", &fx.branch]),
        git(&fx.managed, &["rev-parse", "HEAD"])
    );

    let err = service.push_command().unwrap().push().unwrap_err();
    assert!(err.to_string().contains("a remote is required"), "{err}");
    service.close().unwrap();
}

/// Register an empty managed repository with `permissions`.
fn managed(fx: &Fixture, name: &str, permissions: Vec<Permission>) -> Repository {
    fx.context
        .registry()
        .create(
            &fx.admin,
            Repository::builder()
                .name(name)
                .backend("git")
                .permissions(permissions)
                .build(),
            true,
        )
        .unwrap()
}

#[test]
fn test_exchange_with_managed_repository() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let fork = managed(&fx, "fork", Vec::new());
    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "demo")
        .unwrap();

    let outgoing = service
        .outgoing_command()
        .unwrap()
        .set_remote_repository(&fork)
        .unwrap()
        .get_changesets()
        .unwrap();
    assert_eq!(outgoing.total, 3);

    let pushed = service
        .push_command()
        .unwrap()
        .set_remote_repository(&fork)
        .unwrap()
        .push()
        .unwrap();
    assert_eq!(pushed.changesets, 3);
    let fork_directory = fx.context.registry().directory(&fork).unwrap();
    assert_eq!(
        git(&fork_directory, &["rev-parse", &fx.branch]),
        git(&fx.managed, &["rev-parse", "HEAD"])
    );
    service.close().unwrap();
}

#[test]
fn test_managed_remote_needs_permission() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let marvin = fx.context.subject("marvin");
    let secret = managed(&fx, "secret", Vec::new());
    let shared = managed(
        &fx,
        "shared",
        vec![Permission::user("marvin", PermissionType::Read)],
    );
    let mut demo = fx
        .context
        .registry()
        .get_by_name(&fx.admin, "git", "demo")
        .unwrap()
        .unwrap();
    demo.permissions = vec![Permission::user("marvin", PermissionType::Read)];
    fx.context.registry().modify(&fx.admin, demo).unwrap();

    let service = fx
        .context
        .services()
        .create_by_name(&marvin, "git", "demo")
        .unwrap();
    let secret_directory = fx.context.registry().directory(&secret).unwrap();
    let secret_path = secret_directory.to_str().unwrap();

    // a path into managed storage is checked like the repository itself
    for remote in [secret_path.to_string(), format!("file://{secret_path}")] {
        let err = service
            .incoming_command()
            .unwrap()
            .set_remote(&remote)
            .get_changesets()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{remote}");
    }
    let err = service
        .outgoing_command()
        .unwrap()
        .set_remote(&format!("{secret_path}/refs"))
        .get_changesets()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let Err(err) = service
        .incoming_command()
        .unwrap()
        .set_remote_repository(&secret)
    else {
        panic!("resolved a repository without read access");
    };
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    // reading a remote is not enough to push to it
    let err = service
        .push_command()
        .unwrap()
        .set_remote_repository(&shared)
        .unwrap()
        .push()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    let shared_directory = fx.context.registry().directory(&shared).unwrap();
    assert_eq!(git(&shared_directory, &["for-each-ref"]), "");

    // pulling changes the local repository
    let err = service
        .pull_command()
        .unwrap()
        .set_remote_repository(&shared)
        .unwrap()
        .pull()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let incoming = service
        .incoming_command()
        .unwrap()
        .set_remote_repository(&shared)
        .unwrap()
        .get_changesets()
        .unwrap();
    assert_eq!(incoming.total, 0);
    service.close().unwrap();
}

#[test]
fn test_empty_repository_has_no_history() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    fx.context
        .registry()
        .create(
            &fx.admin,
            Repository::builder().name("empty").backend("git").build(),
            true,
        )
        .unwrap();
    let service = fx
        .context
        .services()
        .create_by_name(&fx.admin, "git", "empty")
        .unwrap();
    let result = service.log_command().unwrap().get_changesets().unwrap();
    assert_eq!(result.total, 0);
    assert!(result.changesets.is_empty());
    service.close().unwrap();
}

#[test]
fn test_private_repository_needs_permission() {
    if !git_available() {
        return;
    }
    let fx = fixture();
    let Err(err) = fx
        .context
        .services()
        .create_by_name(&fx.context.subject("marvin"), "git", "demo")
    else {
        panic!("a stranger opened a private repository");
    };
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}
