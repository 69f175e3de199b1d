// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command request objects.
//!
//! Requests are plain values: every field that changes a command's result
//! takes part in `Eq` and `Hash`, so a request can be cloned into a cache key
//! as is.

/// Page size of log requests unless set otherwise.
pub const DEFAULT_PAGING_LIMIT: usize = 20;

/// Changeset history request.
///
/// `paging_limit` of `None` returns the whole range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogCommandRequest {
    pub start_changeset: Option<String>,
    pub end_changeset: Option<String>,
    pub branch: Option<String>,
    pub path: Option<String>,
    pub paging_start: usize,
    pub paging_limit: Option<usize>,
}

impl Default for LogCommandRequest {
    fn default() -> Self {
        Self {
            start_changeset: None,
            end_changeset: None,
            branch: None,
            path: None,
            paging_start: 0,
            paging_limit: Some(DEFAULT_PAGING_LIMIT),
        }
    }
}

impl LogCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply paging to a full, newest-first history.
    #[must_use]
    pub fn page<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.paging_start.min(items.len());
        let end = self
            .paging_limit
            .map_or(items.len(), |limit| start.saturating_add(limit).min(items.len()));
        items[start..end].to_vec()
    }
}

/// Line attribution request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlameCommandRequest {
    pub path: String,
    pub revision: Option<String>,
}

impl BlameCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Tree listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BrowseCommandRequest {
    pub path: Option<String>,
    pub revision: Option<String>,
    pub recursive: bool,
}

impl BrowseCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// File content request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatCommandRequest {
    pub path: String,
    pub revision: Option<String>,
}

impl CatCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Patch request for one changeset, optionally limited to a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DiffCommandRequest {
    pub revision: String,
    pub path: Option<String>,
}

impl DiffCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Request against another repository, addressed by URL or local path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RemoteCommandRequest {
    pub remote: String,
}

impl RemoteCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Changesets missing on one side of a remote comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PagedRemoteCommandRequest {
    pub remote: String,
    pub paging_start: usize,
    pub paging_limit: Option<usize>,
}

impl Default for PagedRemoteCommandRequest {
    fn default() -> Self {
        Self {
            remote: String::new(),
            paging_start: 0,
            paging_limit: Some(DEFAULT_PAGING_LIMIT),
        }
    }
}

impl PagedRemoteCommandRequest {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
