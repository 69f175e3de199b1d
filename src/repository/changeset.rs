// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command result models.
//!
//! ```text
//! log / incoming / outgoing --> ChangesetPagingResult { total, [Changeset] }
//! blame                     --> BlameResult  { [BlameLine] }
//! browse                    --> BrowserResult { revision, FileObject tree }
//! tags / branches           --> Tags / Branches
//! push / pull               --> PushResponse / PullResponse
//! ```
//!
//! Results are plain values: cached as returned by the backend and cloned
//! before pre-processing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
}

impl Person {
    pub fn new(name: impl Into<String>, mail: Option<String>) -> Self {
        Self {
            name: name.into(),
            mail: mail.filter(|m| !m.is_empty()),
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mail {
            Some(mail) => write!(f, "{} <{mail}>", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Paths touched by a changeset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifications {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

/// A single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub id: String,
    pub date: DateTime<Utc>,
    pub author: Person,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Modifications>,
}

impl Changeset {
    pub fn new(
        id: impl Into<String>,
        date: DateTime<Utc>,
        author: Person,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            author,
            description: description.into(),
            parents: Vec::new(),
            branches: Vec::new(),
            tags: Vec::new(),
            modifications: None,
        }
    }

    /// First line of the description.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or_default()
    }
}

/// One page of changesets plus the size of the full range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangesetPagingResult {
    pub total: usize,
    pub changesets: Vec<Changeset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ChangesetPagingResult {
    #[must_use]
    pub const fn new(total: usize, changesets: Vec<Changeset>) -> Self {
        Self {
            total,
            changesets,
            branch: None,
        }
    }
}

/// Attribution of one line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    pub line_number: usize,
    pub revision: String,
    pub author: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code: String,
}

/// Line attributions of a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlameResult {
    pub lines: Vec<BlameLine>,
}

impl BlameResult {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.lines.len()
    }
}

/// A nested repository reference inside a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRepository {
    pub revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A file or directory in a browse result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileObject {
    pub name: String,
    pub path: String,
    pub directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_repository: Option<SubRepository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileObject>,
}

impl FileObject {
    /// A directory node with the given path.
    pub fn directory(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.rsplit('/').next().unwrap_or_default().to_string(),
            path,
            directory: true,
            ..Self::default()
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Self)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// Tree of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrowserResult {
    pub revision: String,
    pub file: FileObject,
}

/// A tag and the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tags {
    pub tags: Vec<Tag>,
}

/// A branch head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub revision: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Branches {
    pub branches: Vec<Branch>,
}

/// Outcome of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PushResponse {
    pub changesets: usize,
}

/// Outcome of a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullResponse {
    pub changesets: usize,
}
