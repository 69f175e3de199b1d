// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use super::*;
use crate::error::{ErrorKind, ScmError};
use crate::test_utils::{MockHandler, capture_warnings, repository};

/// A handler whose shutdown always fails.
struct Stubborn {
    backend_type: BackendType,
    base: PathBuf,
}

impl StorageProvisioner for Stubborn {
    fn create(&self, _repository: &Repository, _directory: &Path) -> ScmResult<()> {
        Ok(())
    }

    fn delete(&self, _repository: &Repository, _directory: &Path) -> ScmResult<()> {
        Ok(())
    }

    fn is_repository(&self, _directory: &Path) -> bool {
        false
    }
}

impl RepositoryHandler for Stubborn {
    fn backend_type(&self) -> &BackendType {
        &self.backend_type
    }

    fn base_directory(&self) -> &Path {
        &self.base
    }

    fn open(&self, _repository: &Repository) -> ScmResult<Box<dyn RepositoryServiceProvider>> {
        Err(ScmError::other("no providers here"))
    }

    fn close(&self) -> ScmResult<()> {
        Err(ScmError::other("still busy"))
    }
}

fn stubborn() -> Arc<dyn RepositoryHandler> {
    Arc::new(Stubborn {
        backend_type: BackendType::new("stub", "Stubborn"),
        base: PathBuf::from("/srv/stub"),
    })
}

#[test]
fn test_register_rejects_duplicate_type() {
    let backends = BackendRegistry::new();
    backends.register(Arc::new(MockHandler::new("/srv/a"))).unwrap();

    let err = backends
        .register(Arc::new(MockHandler::new("/srv/b")))
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"repository error: handler for type 'mock' is already registered");
    assert_eq!(
        backends.get("mock").ok().map(|h| h.base_directory().to_path_buf()),
        Some(PathBuf::from("/srv/a"))
    );
}

#[test]
fn test_get_unknown_type() {
    let backends = BackendRegistry::new();
    let Err(err) = backends.get("svn") else {
        panic!("svn is not registered");
    };
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!backends.contains("svn"));
}

#[test]
fn test_configured_filters_unconfigured_handlers() {
    let backends = BackendRegistry::new();
    backends
        .register(Arc::new(MockHandler::new("/srv/mock").unconfigured()))
        .unwrap();
    backends.register(stubborn()).unwrap();

    assert!(backends.get("mock").is_ok());
    let Err(err) = backends.configured("mock") else {
        panic!("mock handler is not configured");
    };
    assert_eq!(err.kind(), ErrorKind::Configuration);
    insta::assert_snapshot!(err.to_string(), @"repository error: handler for type 'mock' is not configured");

    let names: Vec<String> = backends.types().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, ["mock", "stub"]);
    let configured: Vec<String> = backends
        .configured_types()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(configured, ["stub"]);
}

#[test]
fn test_resolve_opens_provider() {
    let backends = BackendRegistry::new();
    backends.register(Arc::new(MockHandler::new("/srv/mock"))).unwrap();

    let Ok(provider) = backends.resolve(&repository("demo")) else {
        panic!("mock repositories resolve");
    };
    assert_eq!(provider.backend(), "mock");
    assert!(provider.supports(crate::api::Command::Log));

    let mut unknown = repository("demo");
    unknown.backend = "svn".to_string();
    assert!(backends.resolve(&unknown).is_err());
}

#[test]
fn test_directory_joins_name() {
    let handler = MockHandler::new("/srv/mock");
    assert_eq!(
        handler.directory(&repository("demo")),
        PathBuf::from("/srv/mock/demo")
    );
}

#[test]
fn test_close_all_logs_failures() {
    let backends = BackendRegistry::new();
    backends.register(Arc::new(MockHandler::new("/srv/mock"))).unwrap();
    backends.register(stubborn()).unwrap();

    let ((), logs) = capture_warnings(|| backends.close_all());
    assert!(logs.contains("failed to close repository handler"), "{logs}");
    assert!(logs.contains("still busy"), "{logs}");
    assert!(!logs.contains("backend=mock"), "{logs}");
}

#[test]
fn test_debug_lists_handler_names() {
    let backends = BackendRegistry::new();
    backends.register(stubborn()).unwrap();
    insta::assert_snapshot!(format!("{backends:?}"), @r#"BackendRegistry { handlers: ["stub"] }"#);
}

#[test]
fn test_find_repositories_skips_plain_directories() {
    let root = tempfile::TempDir::new().unwrap();
    let handler = MockHandler::new(root.path());
    for name in ["zeta", "team/alpha"] {
        let repository = repository(name);
        handler
            .create(&repository, &handler.directory(&repository))
            .unwrap();
    }
    std::fs::create_dir_all(root.path().join("team/empty")).unwrap();
    std::fs::write(root.path().join("notes.txt"), b"").unwrap();

    assert_eq!(handler.find_repositories().unwrap(), ["team/alpha", "zeta"]);
}

#[test]
fn test_find_repositories_without_base_directory() {
    let handler = MockHandler::new("/nonexistent/scm-hub");
    assert!(handler.find_repositories().unwrap().is_empty());
}
