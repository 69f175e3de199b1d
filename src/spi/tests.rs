// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

use super::*;
use crate::spi::request::DEFAULT_PAGING_LIMIT;
use crate::error::ErrorKind;

struct TagsOnly;

impl TagsCommand for TagsOnly {
    fn tags(&self, _context: &ExecutionContext) -> ScmResult<Option<Tags>> {
        Ok(Some(Tags::default()))
    }
}

impl RepositoryServiceProvider for TagsOnly {
    fn backend(&self) -> &str {
        "mock"
    }

    fn commands(&self) -> Commands {
        Commands::TAGS
    }

    fn tags_command(&self) -> ScmResult<&dyn TagsCommand> {
        Ok(self)
    }
}

#[test]
fn test_unsupported_accessors_fail_fast() {
    let provider = TagsOnly;
    assert!(provider.supports(Command::Tags));
    assert!(!provider.supports(Command::Log));
    assert!(provider.tags_command().is_ok());

    let err = provider.log_command().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotSupportedFeature);
    insta::assert_snapshot!(err.to_string(), @"command error: 'log' is not supported by the 'mock' backend");
    assert!(!provider.supports_feature(&crate::api::Feature::COMBINED_DEFAULT_BRANCH));
}

#[test]
fn test_log_request_defaults_and_reset() {
    let mut request = LogCommandRequest {
        branch: Some("develop".to_string()),
        paging_start: 10,
        paging_limit: None,
        ..LogCommandRequest::default()
    };
    assert_ne!(request, LogCommandRequest::default());
    request.reset();
    assert_eq!(request.paging_start, 0);
    assert_eq!(request.paging_limit, Some(DEFAULT_PAGING_LIMIT));
    assert_eq!(request.branch, None);
}

#[test]
fn test_log_request_paging() {
    let items: Vec<u32> = (0..5).collect();
    let mut request = LogCommandRequest {
        paging_limit: Some(2),
        ..LogCommandRequest::default()
    };
    assert_eq!(request.page(&items), [0, 1]);

    request.paging_start = 4;
    assert_eq!(request.page(&items), [4]);

    request.paging_start = 9;
    assert!(request.page(&items).is_empty());

    request.paging_start = 1;
    request.paging_limit = None;
    assert_eq!(request.page(&items), [1, 2, 3, 4]);
}

#[test]
fn test_execution_context_cancel() {
    let context = ExecutionContext::new(None);
    assert!(context.check("log").is_ok());
    assert_eq!(context.remaining(), None);

    context.token().cancel();
    let err = context.check("log").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"command error: command 'log' was cancelled");
}

#[test]
fn test_execution_context_deadline() {
    let context = ExecutionContext::new(Some(Duration::ZERO));
    let err = context.check("blame").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendIo);
    assert_eq!(context.remaining(), Some(Duration::ZERO));
}
