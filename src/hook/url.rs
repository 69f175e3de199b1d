// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Callback URL announced to installed hook scripts.
//!
//! ```text
//! resolve(request_url)
//!   initialized? --yes--> cached url            (no lock)
//!        | no
//!        v
//!   init.lock().await
//!   initialized? --yes--> cached url            (lost the race)
//!        | no
//!        v
//!   force_base_url --> <base_url>/hook
//!   else probe in order, first 204 wins:
//!        <request_url>/hook --> <local_url>/hook --> <base_url>/hook
//!   none --> None (hooks disabled)
//!        |
//!        v
//!   store url, initialized = true
//! ```
//!
//! [`HookUrlResolver::reset`] forces the next call to resolve again, e.g.
//! after a configuration change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::types::HooksConfig;

/// Path appended to a base URL to reach the hook endpoint.
pub const HOOK_PATH: &str = "hook";

/// Checks whether a hook endpoint answers.
pub trait UrlProbe: Send + Sync {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool>;
}

fn global_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(format!("scm-hub/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Probe sending `GET <url>?ping=true` and expecting `204 No Content`.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl HttpProbe {
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl UrlProbe for HttpProbe {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let response = global_client()
                .get(format!("{url}?ping=true"))
                .timeout(self.timeout)
                .send()
                .await;
            match response {
                Ok(response) if response.status() == StatusCode::NO_CONTENT => true,
                Ok(response) => {
                    debug!(url, status = %response.status(), "hook url answered unexpectedly");
                    false
                }
                Err(e) => {
                    debug!(url, error = %e, "hook url unreachable");
                    false
                }
            }
        })
    }
}

/// Lazily resolved, shared hook callback URL.
pub struct HookUrlResolver {
    base_url: String,
    force_base_url: bool,
    local_url: String,
    challenge: String,
    probe: Arc<dyn UrlProbe>,
    initialized: AtomicBool,
    url: RwLock<Option<String>>,
    init: tokio::sync::Mutex<()>,
}

impl HookUrlResolver {
    pub fn new(
        base_url: impl Into<String>,
        force_base_url: bool,
        local_url: impl Into<String>,
        probe: Arc<dyn UrlProbe>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            force_base_url,
            local_url: local_url.into(),
            challenge: uuid::Uuid::new_v4().simple().to_string(),
            probe,
            initialized: AtomicBool::new(false),
            url: RwLock::new(None),
            init: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn from_config(config: &HooksConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.force_base_url,
            config.local_url.clone(),
            Arc::new(HttpProbe::default()),
        )
    }

    /// Token that hook scripts echo back to prove they were installed by
    /// this process.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    #[must_use]
    pub fn is_acceptable(&self, challenge: &str) -> bool {
        !challenge.is_empty() && challenge == self.challenge
    }

    /// The hook URL, resolved once; `None` when no endpoint answered.
    ///
    /// `request_url` is the base URL of the request currently being served,
    /// if any; it is only consulted on the first resolution.
    pub async fn resolve(&self, request_url: Option<&str>) -> Option<String> {
        if self.initialized.load(Ordering::Acquire) {
            return self.cached();
        }

        let _guard = self.init.lock().await;
        if self.initialized.load(Ordering::Acquire) {
            return self.cached();
        }

        let url = self.compute(request_url).await;
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.clone();
        self.initialized.store(true, Ordering::Release);
        url
    }

    /// Forget the resolved URL.
    pub fn reset(&self) {
        debug!("resetting hook url");
        self.initialized.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn cached(&self) -> Option<String> {
        self.url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn compute(&self, request_url: Option<&str>) -> Option<String> {
        if self.force_base_url && !self.base_url.is_empty() {
            let url = hook_url(&self.base_url);
            info!(url = %url, "using configured hook url");
            return Some(url);
        }

        let candidates = [
            request_url.unwrap_or_default(),
            self.local_url.as_str(),
            self.base_url.as_str(),
        ];
        for base in candidates.into_iter().filter(|base| !base.is_empty()) {
            let url = hook_url(base);
            if self.probe.probe(&url).await {
                info!(url = %url, "resolved hook url");
                return Some(url);
            }
        }

        warn!("no hook url answered, repository hooks are disabled");
        None
    }
}

impl std::fmt::Debug for HookUrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookUrlResolver")
            .field("base_url", &self.base_url)
            .field("force_base_url", &self.force_base_url)
            .field("local_url", &self.local_url)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// `<base>/hook`, tolerating a trailing slash on `base`.
#[must_use]
pub fn hook_url(base: &str) -> String {
    format!("{}/{HOOK_PATH}", base.trim_end_matches('/'))
}
