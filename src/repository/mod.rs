// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository metadata, lifecycle events and the registry.
//!
//! # Lifecycle
//!
//! ```text
//!   nonexistent --create--> active <--modify--> active
//!                              |
//!                          modify(archived = true)
//!                              v
//!                          archived --delete--> nonexistent
//!
//! every transition fires a pair:  BEFORE_X (pre)  then  X (post)
//! ```
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Repository`] | Metadata record; callers always receive copies |
//! | [`BackendType`] | One supported version-control engine |
//! | [`HandlerEvent`] | Lifecycle event kinds with pre/post flag |
//! | [`RepositoryEvent`] | Event payload delivered to listeners |
//! | [`registry::RepositoryRegistry`] | Permission-gated CRUD |
//! | [`store::RepositoryStore`] | Metadata persistence |

pub mod changeset;
pub mod registry;
pub mod store;


use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use bon::Builder;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, ScmError, ScmResult};
use crate::security::{PermissionType, Subject};

/// A version-control engine known to the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendType {
    name: String,
    display_name: String,
}

impl BackendType {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }

    /// Machine name, used as the repository `type`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.name)
    }
}

/// Grants `kind` to a user or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PermissionType,
    #[serde(default)]
    pub group: bool,
}

impl Permission {
    pub fn user(name: impl Into<String>, kind: PermissionType) -> Self {
        Self {
            name: name.into(),
            kind,
            group: false,
        }
    }

    pub fn group(name: impl Into<String>, kind: PermissionType) -> Self {
        Self {
            name: name.into(),
            kind,
            group: true,
        }
    }
}

/// Repository metadata.
///
/// `id` and `creation_date` are assigned by the registry on create; values
/// supplied by the caller are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct Repository {
    #[builder(default)]
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub backend: String,
    pub contact: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    #[builder(default)]
    #[serde(default)]
    pub archived: bool,
    #[builder(default)]
    #[serde(default)]
    pub public_readable: bool,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

fn compiled(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    pattern: &str,
) -> ScmResult<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| ScmError::other(format!("invalid built-in pattern: {e}")))
}

fn name_pattern() -> ScmResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(
        &PATTERN,
        r"^[A-Za-z0-9][A-Za-z0-9._\-]*(/[A-Za-z0-9][A-Za-z0-9._\-]*)*$",
    )
}

fn mail_pattern() -> ScmResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    compiled(&PATTERN, r"^[^@ \t\r\n]+@[^@ \t\r\n]+\.[^@ \t\r\n]+$")
}

impl Repository {
    /// `type/name`, the human-readable identity.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.backend, self.name)
    }

    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` naming the first invalid field.
    pub fn validate(&self) -> ScmResult<()> {
        if self.backend.trim().is_empty() {
            return Err(invalid("type", "must not be empty"));
        }
        if self.name.is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if !name_pattern()?.is_match(&self.name) {
            return Err(invalid(
                "name",
                "segments must start with a letter or digit and contain only letters, digits, '.', '-' or '_'",
            ));
        }
        if let Some(contact) = self.contact.as_deref()
            && !contact.is_empty()
            && !mail_pattern()?.is_match(contact)
        {
            return Err(invalid("contact", "must be an e-mail address"));
        }
        Ok(())
    }

    /// Whether `uri` (a path below the repository's type) addresses this
    /// repository or a path inside it.
    #[must_use]
    pub fn matches_uri(&self, uri: &str) -> bool {
        let uri = uri.trim_matches('/');
        uri == self.name
            || uri
                .strip_prefix(self.name.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn invalid(field: &str, message: &str) -> ScmError {
    RepositoryError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Ordering for repository listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryOrder {
    /// By type, then name.
    #[default]
    Name,
    /// Oldest first.
    CreationDate,
    /// Most recently modified first.
    LastModified,
}

impl RepositoryOrder {
    #[must_use]
    pub fn compare(self, a: &Repository, b: &Repository) -> Ordering {
        let by_name = || a.backend.cmp(&b.backend).then_with(|| a.name.cmp(&b.name));
        match self {
            Self::Name => by_name(),
            Self::CreationDate => a.creation_date.cmp(&b.creation_date).then_with(by_name),
            Self::LastModified => {
                let a_time = a.last_modified.or(a.creation_date);
                let b_time = b.last_modified.or(b.creation_date);
                b_time.cmp(&a_time).then_with(by_name)
            }
        }
    }
}

/// Lifecycle event kinds.
///
/// `BEFORE_*` events fire before the store is touched; the others fire after
/// the mutation is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerEvent {
    BeforeCreate,
    Create,
    BeforeModify,
    Modify,
    BeforeDelete,
    Delete,
}

impl HandlerEvent {
    /// Whether the event fires after the mutation.
    #[must_use]
    pub const fn is_post(&self) -> bool {
        matches!(self, Self::Create | Self::Modify | Self::Delete)
    }

    /// Whether the event fires before the mutation.
    #[must_use]
    pub const fn is_pre(&self) -> bool {
        !self.is_post()
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeCreate => "BEFORE_CREATE",
            Self::Create => "CREATE",
            Self::BeforeModify => "BEFORE_MODIFY",
            Self::Modify => "MODIFY",
            Self::BeforeDelete => "BEFORE_DELETE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HandlerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event with the repository it concerns.
#[derive(Debug, Clone)]
pub struct RepositoryEvent {
    kind: HandlerEvent,
    repository: Repository,
    old_repository: Option<Repository>,
    subject: Subject,
}

impl RepositoryEvent {
    #[must_use]
    pub const fn new(
        kind: HandlerEvent,
        repository: Repository,
        old_repository: Option<Repository>,
        subject: Subject,
    ) -> Self {
        Self {
            kind,
            repository,
            old_repository,
            subject,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> HandlerEvent {
        self.kind
    }

    #[must_use]
    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    /// The stored state before a modify.
    #[must_use]
    pub const fn old_repository(&self) -> Option<&Repository> {
        self.old_repository.as_ref()
    }

    /// Identity that triggered the change.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.subject
    }
}

/// Generates repository ids.
pub trait KeyGenerator: Send + Sync {
    fn create_key(&self) -> String;
}

/// Random UUID v4 keys in simple (hyphen-less) form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn create_key(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
