// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for scm-hub.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. scm-hub.toml (cwd)
//! 3. --ini FILE (repeatable)
//! 4. SCM_* env vars
//! 5. --set section.key=value
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! SCM_CACHE__MAX_ENTRIES=50            → cache.max_entries = 50
//! SCM_REPOSITORIES__DIRECTORY=/srv/scm → repositories.directory = "/srv/scm"
//! SCM_HOOKS__WORKERS=8                 → hooks.workers = 8
//! ```

pub mod loader;
pub mod types;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, Result};

use loader::ConfigLoader;
use types::{
    CacheConfig, CommandsConfig, GlobalConfig, HooksConfig, PreProcessConfig, RepositoriesConfig,
    SecurityConfig,
};

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "scm-hub.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SCM";

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Global options.
    pub global: GlobalConfig,
    /// Repository storage and lifecycle.
    pub repositories: RepositoriesConfig,
    /// Command result cache.
    pub cache: CacheConfig,
    /// Backend command execution.
    pub commands: CommandsConfig,
    /// Hook dispatch.
    pub hooks: HooksConfig,
    /// Security.
    pub security: SecurityConfig,
    /// Result pre-processing.
    pub preprocess: PreProcessConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use scm_hub::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file("/etc/scm-hub/scm-hub.toml")
    ///     .add_toml_file_optional("scm-hub.toml")
    ///     .with_env_prefix("SCM")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not match the
    /// `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(invalid("cache", "max_entries", "must be at least 1"));
        }
        if self.hooks.workers == 0 {
            return Err(invalid("hooks", "workers", "must be at least 1"));
        }
        if self.hooks.force_base_url && self.hooks.base_url.is_empty() {
            return Err(ConfigError::MissingKey {
                section: "hooks".to_string(),
                key: "base_url".to_string(),
            });
        }
        if self.repositories.directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingKey {
                section: "repositories".to_string(),
                key: "directory".to_string(),
            });
        }
        for hook in &self.hooks.exec {
            if hook.hook_types.is_empty() {
                return Err(invalid(
                    "hooks.exec",
                    "hook_types",
                    &format!("hook '{}' does not name a hook point", hook.name),
                ));
            }
            if let Some(pattern) = &hook.repositories
                && let Err(e) = wax::Glob::new(pattern)
            {
                return Err(invalid("hooks.exec", "repositories", &e.to_string()));
            }
        }
        for link in &self.preprocess.links {
            if let Err(e) = regex::Regex::new(&link.pattern) {
                return Err(invalid("preprocess.links", "pattern", &e.to_string()));
            }
        }
        Ok(())
    }

    /// Whether `user` (or one of `groups`) is configured as administrator.
    #[must_use]
    pub fn is_admin(&self, user: &str, groups: &[String]) -> bool {
        let security = &self.security;
        (security.admin_users.is_empty() && security.admin_groups.is_empty())
            || security.admin_users.iter().any(|u| u == user)
            || groups.iter().any(|g| security.admin_groups.contains(g))
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_repository_options(&mut options);
        self.format_runtime_options(&mut options);
        self.format_hook_options(&mut options);
        self.format_security_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.log_file".into(),
            self.global.log_file.display().to_string(),
        );
        options.insert("global.json_log".into(), self.global.json_log.to_string());
    }

    fn format_repository_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "repositories.directory".into(),
            self.repositories.directory.display().to_string(),
        );
        options.insert(
            "repositories.store".into(),
            self.repositories.store_path().display().to_string(),
        );
        options.insert(
            "repositories.archive_before_delete".into(),
            self.repositories.archive_before_delete.to_string(),
        );
    }

    fn format_runtime_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "cache.max_entries".into(),
            self.cache.max_entries.to_string(),
        );
        options.insert(
            "cache.time_to_live_secs".into(),
            self.cache.time_to_live_secs.to_string(),
        );
        options.insert(
            "commands.timeout_secs".into(),
            self.commands.timeout_secs.to_string(),
        );
        for (i, link) in self.preprocess.links.iter().enumerate() {
            options.insert(format!("preprocess.links.{i}"), link.pattern.clone());
        }
    }

    fn format_hook_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("hooks.workers".into(), self.hooks.workers.to_string());
        if !self.hooks.base_url.is_empty() {
            options.insert("hooks.base_url".into(), self.hooks.base_url.clone());
        }
        options.insert(
            "hooks.force_base_url".into(),
            self.hooks.force_base_url.to_string(),
        );
        options.insert("hooks.local_url".into(), self.hooks.local_url.clone());
        options.insert(
            "hooks.install_scripts".into(),
            self.hooks.install_scripts.to_string(),
        );
        for hook in &self.hooks.exec {
            options.insert(
                format!("hooks.exec.{}", hook.name),
                hook.command.display().to_string(),
            );
        }
    }

    fn format_security_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "security.admin_users".into(),
            self.security.admin_users.join(","),
        );
        options.insert(
            "security.admin_groups".into(),
            self.security.admin_groups.join(","),
        );
        options.insert(
            "security.anonymous_access".into(),
            self.security.anonymous_access.to_string(),
        );
    }
}

fn invalid(section: &str, key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        message: message.to_string(),
    }
}
