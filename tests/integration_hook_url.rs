// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for hook URL resolution using wiremock.
//!
//! Tests the HTTP probe and the resolver against mock endpoints, covering:
//! - Probe acceptance (`204 No Content` only)
//! - Candidate order and caching of the first answer
//! - Forced base URLs and reset

use std::sync::Arc;
use std::time::Duration;

use scm_hub::config::types::HooksConfig;
use scm_hub::hook::url::{HookUrlResolver, HttpProbe, UrlProbe};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens on port 1 of the loopback interface.
const DEAD_URL: &str = "http://127.0.0.1:1";

async fn hook_server(status: u16, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hook"))
        .and(query_param("ping", "true"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn probe() -> Arc<HttpProbe> {
    Arc::new(HttpProbe::default().with_timeout(Duration::from_secs(2)))
}

// =============================================================================
// HttpProbe
// =============================================================================

#[tokio::test]
async fn test_probe_accepts_no_content() {
    let server = hook_server(204, 1).await;
    assert!(probe().probe(&format!("{}/hook", server.uri())).await);
}

#[tokio::test]
async fn test_probe_rejects_other_answers() {
    for status in [200, 404, 500] {
        let server = hook_server(status, 1).await;
        assert!(
            !probe().probe(&format!("{}/hook", server.uri())).await,
            "status {status}"
        );
    }
    assert!(!probe().probe(&format!("{DEAD_URL}/hook")).await);
}

// =============================================================================
// HookUrlResolver
// =============================================================================

#[tokio::test]
async fn test_resolver_skips_dead_candidates_and_caches() {
    let local = hook_server(404, 1).await;
    let base = hook_server(204, 1).await;
    let resolver = HookUrlResolver::new(base.uri(), false, local.uri(), probe());

    let expected = format!("{}/hook", base.uri());
    assert_eq!(resolver.resolve(Some(DEAD_URL)).await, Some(expected.clone()));
    // cached: neither server sees a second probe
    assert_eq!(resolver.resolve(None).await, Some(expected));
}

#[tokio::test]
async fn test_resolver_prefers_request_url() {
    let request = hook_server(204, 1).await;
    let local = hook_server(204, 0).await;
    let resolver = HookUrlResolver::new("", false, local.uri(), probe());

    let request_url = request.uri();
    assert_eq!(
        resolver.resolve(Some(request_url.as_str())).await,
        Some(format!("{request_url}/hook"))
    );
}

#[tokio::test]
async fn test_resolver_reset_probes_again() {
    let local = hook_server(204, 2).await;
    let resolver = HookUrlResolver::new("", false, local.uri(), probe());

    assert!(resolver.resolve(None).await.is_some());
    resolver.reset();
    assert!(!resolver.is_initialized());
    assert!(resolver.resolve(None).await.is_some());
}

#[tokio::test]
async fn test_resolver_from_config_forced() {
    let config = HooksConfig {
        base_url: "https://scm.example.com/".to_string(),
        force_base_url: true,
        local_url: DEAD_URL.to_string(),
        ..HooksConfig::default()
    };
    let resolver = HookUrlResolver::from_config(&config);
    assert_eq!(
        resolver.resolve(None).await.as_deref(),
        Some("https://scm.example.com/hook")
    );
}

#[tokio::test]
async fn test_resolver_without_answer_disables_hooks() {
    let resolver = HookUrlResolver::new(DEAD_URL, false, DEAD_URL, probe());
    assert_eq!(resolver.resolve(None).await, None);
    assert!(resolver.is_initialized());
}
