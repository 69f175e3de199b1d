// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Identity and authorization.
//!
//! ```text
//! Subject (cheap clone, Arc<Principal>)
//!    |  passed explicitly to every registry / service call
//!    |  Subject::scope(|| ...) binds it to the current thread
//!    v
//! PermissionChecker::has_permission(subject, repo, READ|WRITE|OWNER)
//!    DefaultPermissionChecker:
//!      admin                          --> everything
//!      READ on public_readable repo   --> allowed (anonymous if enabled)
//!      Permission entries (user/group) with kind >= requested
//! ```
//!
//! Identity crosses thread boundaries by value: asynchronous work captures a
//! clone of the triggering [`Subject`] and re-binds it with
//! [`Subject::scope`] on the worker thread.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ScmResult, SecurityError};
use crate::repository::Repository;

#[cfg(test)]
mod tests;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    groups: Vec<String>,
    admin: bool,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            admin: false,
        }
    }

    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub const fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin
    }
}

/// The identity on whose behalf an operation runs.
///
/// Anonymous when no principal is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    principal: Option<Arc<Principal>>,
}

/// Name reported for subjects without a principal.
pub const ANONYMOUS: &str = "anonymous";

thread_local! {
    static CURRENT: RefCell<Option<Subject>> = const { RefCell::new(None) };
}

impl Subject {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { principal: None }
    }

    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(Arc::new(principal)),
        }
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_deref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.principal().is_some_and(Principal::is_admin)
    }

    /// User name, or [`ANONYMOUS`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.principal().map_or(ANONYMOUS, Principal::name)
    }

    /// Run `f` with this subject bound to the current thread.
    ///
    /// The previous binding is restored afterwards, also on unwind.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore(Option<Subject>);

        impl Drop for Restore {
            fn drop(&mut self) {
                let previous = self.0.take();
                CURRENT.with(|current| *current.borrow_mut() = previous);
            }
        }

        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        let _restore = Restore(previous);
        f()
    }

    /// The subject bound to the current thread, anonymous if none.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|current| current.borrow().clone().unwrap_or_default())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Permission levels, ordered by strength.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    #[default]
    Read,
    Write,
    Owner,
}

impl PermissionType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Owner => "owner",
        }
    }

    /// Whether holding `self` implies `requested`.
    #[must_use]
    pub fn implies(self, requested: Self) -> bool {
        self >= requested
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("expected 'read', 'write' or 'owner', got '{s}'")),
        }
    }
}

/// Decides whether a subject may act on a repository.
pub trait PermissionChecker: Send + Sync {
    /// Whether `subject` holds at least `kind` on `repository`.
    fn has_permission(&self, subject: &Subject, repository: &Repository, kind: PermissionType)
    -> bool;

    /// Whether `subject` has administrator privileges.
    fn is_admin(&self, subject: &Subject) -> bool {
        subject.is_admin()
    }

    /// Fail with `PermissionDenied` unless `subject` holds `kind`.
    ///
    /// # Errors
    ///
    /// Returns `SecurityError::PermissionDenied` when the check fails.
    fn check(
        &self,
        subject: &Subject,
        repository: &Repository,
        kind: PermissionType,
    ) -> ScmResult<()> {
        if self.has_permission(subject, repository, kind) {
            Ok(())
        } else {
            Err(SecurityError::PermissionDenied {
                user: subject.name().to_string(),
                permission: kind.to_string(),
                repository: repository.display_name(),
            }
            .into())
        }
    }

    /// Fail with `AdminRequired` unless `subject` is an administrator.
    ///
    /// # Errors
    ///
    /// Returns `SecurityError::AdminRequired` when the check fails.
    fn check_admin(&self, subject: &Subject) -> ScmResult<()> {
        if self.is_admin(subject) {
            Ok(())
        } else {
            Err(SecurityError::AdminRequired {
                user: subject.name().to_string(),
            }
            .into())
        }
    }
}

/// Permission checker backed by the repository's own permission entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPermissionChecker {
    anonymous_access: bool,
}

impl DefaultPermissionChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            anonymous_access: false,
        }
    }

    /// Let anonymous subjects read public repositories.
    #[must_use]
    pub const fn with_anonymous_access(mut self, enabled: bool) -> Self {
        self.anonymous_access = enabled;
        self
    }
}

impl PermissionChecker for DefaultPermissionChecker {
    fn has_permission(
        &self,
        subject: &Subject,
        repository: &Repository,
        kind: PermissionType,
    ) -> bool {
        let Some(principal) = subject.principal() else {
            return kind == PermissionType::Read
                && repository.public_readable
                && self.anonymous_access;
        };
        if principal.is_admin() {
            return true;
        }
        if kind == PermissionType::Read && repository.public_readable {
            return true;
        }
        repository.permissions.iter().any(|permission| {
            permission.kind.implies(kind)
                && if permission.group {
                    principal.groups().contains(&permission.name)
                } else {
                    permission.name == principal.name()
                }
        })
    }
}
