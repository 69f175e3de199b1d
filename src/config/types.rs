// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration section types.
//!
//! ```text
//! Config
//!   global        log levels, log file
//!   repositories  storage root, metadata store, archive policy
//!   cache         capacity, time to live
//!   commands      backend timeout
//!   hooks         worker pool, callback url, [[hooks.exec]]
//!   security      administrators, anonymous access
//!   preprocess    [[preprocess.links]] keyword links
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::hook::RepositoryHookType;
use crate::logging::LogLevel;

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for console output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file. Empty disables file logging.
    pub log_file: PathBuf,
    /// Write the log file as JSON lines.
    pub json_log: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::DEBUG,
            log_file: PathBuf::new(),
            json_log: false,
        }
    }
}

/// Repository storage and lifecycle options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoriesConfig {
    /// Root directory; each backend stores repositories in `<directory>/<type>/`.
    pub directory: PathBuf,
    /// JSON file holding repository metadata. Relative paths resolve
    /// against `directory`.
    pub store: PathBuf,
    /// Refuse to delete repositories that are not archived.
    pub archive_before_delete: bool,
}

impl Default for RepositoriesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("repositories"),
            store: PathBuf::from("repositories.json"),
            archive_before_delete: false,
        }
    }
}

impl RepositoriesConfig {
    /// Path of the metadata store file.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        if self.store.is_absolute() {
            self.store.clone()
        } else {
            self.directory.join(&self.store)
        }
    }
}

/// Command result cache options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum entries per named cache before eviction.
    pub max_entries: usize,
    /// Entry lifetime in seconds. Zero keeps entries until evicted.
    pub time_to_live_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            time_to_live_secs: 0,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime, if any.
    #[must_use]
    pub const fn time_to_live(&self) -> Option<Duration> {
        if self.time_to_live_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.time_to_live_secs))
        }
    }
}

/// Backend command options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandsConfig {
    /// Backend command timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl CommandsConfig {
    /// Backend command timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// Hook dispatch options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HooksConfig {
    /// Threads in the asynchronous hook pool.
    pub workers: usize,
    /// Externally reachable base URL of the hook callback.
    pub base_url: String,
    /// Use `base_url` without probing alternatives.
    pub force_base_url: bool,
    /// Local URL probed after the request URL.
    pub local_url: String,
    /// Install pre-receive and post-receive scripts into new repositories.
    pub install_scripts: bool,
    /// External commands run as hooks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exec: Vec<ExecHookConfig>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            base_url: String::new(),
            force_base_url: false,
            local_url: "http://localhost:8080".to_string(),
            install_scripts: true,
            exec: Vec::new(),
        }
    }
}

/// An external command run on hook events.
///
/// ```toml
/// [[hooks.exec]]
/// name = "policy"
/// command = "/usr/local/bin/check-commit"
/// args = ["--strict"]
/// hook_types = ["pre_receive"]
/// repositories = "team/**"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecHookConfig {
    /// Hook name used in logs and rejection messages.
    pub name: String,
    /// Program to execute.
    pub command: PathBuf,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Hook points the command runs on.
    pub hook_types: Vec<RepositoryHookType>,
    /// Run post-receive invocations on the worker pool.
    #[serde(default, rename = "async")]
    pub is_async: bool,
    /// Glob over repository names; absent matches every repository.
    #[serde(default)]
    pub repositories: Option<String>,
    /// Seconds before the command is killed. Zero waits forever.
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Security options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Users with administrator privileges. Empty makes every local user an
    /// administrator.
    pub admin_users: Vec<String>,
    /// Groups with administrator privileges.
    pub admin_groups: Vec<String>,
    /// Let unauthenticated subjects read public repositories.
    pub anonymous_access: bool,
}

/// Result pre-processing options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreProcessConfig {
    /// Keyword links applied to changeset descriptions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<KeywordLinkConfig>,
}

/// Rewrites matches of `pattern` in changeset descriptions to `replacement`.
///
/// `replacement` may reference capture groups (`$1`, `${name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordLinkConfig {
    pub pattern: String,
    pub replacement: String,
}
