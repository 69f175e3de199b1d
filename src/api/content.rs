// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! File content and diffs.
//!
//! Both stream into a writer and are never cached.

use std::io::Write;

use tracing::debug;

use super::{Command, RepositoryService};
use crate::error::{CommandError, ScmResult};
use crate::spi::{CatCommandRequest, DiffCommandRequest};

#[derive(Debug)]
pub struct CatCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: CatCommandRequest,
}

impl<'a> CatCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: CatCommandRequest::default(),
        }
    }

    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.request.path = path.to_string();
        self
    }

    pub fn set_revision(&mut self, revision: Option<&str>) -> &mut Self {
        self.request.revision = revision.map(str::to_string);
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.request.reset();
        self
    }

    /// Write the file content to `output`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` without a path, `PathNotFound`, or the backend's
    /// own error.
    pub fn retrieve_content(&self, output: &mut dyn Write) -> ScmResult<()> {
        if self.request.path.is_empty() {
            return Err(invalid(Command::Cat, "a path is required"));
        }
        let service = self.service;
        debug!(
            repository = %service.repository().display_name(),
            path = %self.request.path,
            "cat"
        );
        service
            .provider()?
            .cat_command()?
            .cat(&service.context(), &self.request, output)
    }

    /// # Errors
    ///
    /// Same as [`CatCommandBuilder::retrieve_content`].
    pub fn get_content(&self) -> ScmResult<Vec<u8>> {
        let mut content = Vec::new();
        self.retrieve_content(&mut content)?;
        Ok(content)
    }
}

#[derive(Debug)]
pub struct DiffCommandBuilder<'a> {
    service: &'a RepositoryService,
    request: DiffCommandRequest,
}

impl<'a> DiffCommandBuilder<'a> {
    pub(crate) fn new(service: &'a RepositoryService) -> Self {
        Self {
            service,
            request: DiffCommandRequest::default(),
        }
    }

    /// Changeset to diff against its parent.
    pub fn set_revision(&mut self, revision: &str) -> &mut Self {
        self.request.revision = revision.to_string();
        self
    }

    /// Restrict the diff to `path`.
    pub fn set_path(&mut self, path: Option<&str>) -> &mut Self {
        self.request.path = path.map(str::to_string);
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.request.reset();
        self
    }

    /// Write the diff in unified format to `output`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` without a revision, or the backend's own error.
    pub fn retrieve_content(&self, output: &mut dyn Write) -> ScmResult<()> {
        if self.request.revision.is_empty() {
            return Err(invalid(Command::Diff, "a revision is required"));
        }
        let service = self.service;
        debug!(
            repository = %service.repository().display_name(),
            revision = %self.request.revision,
            path = ?self.request.path,
            "diff"
        );
        service
            .provider()?
            .diff_command()?
            .diff(&service.context(), &self.request, output)
    }

    /// # Errors
    ///
    /// Same as [`DiffCommandBuilder::retrieve_content`].
    pub fn get_content(&self) -> ScmResult<String> {
        let mut content = Vec::new();
        self.retrieve_content(&mut content)?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

fn invalid(command: Command, message: &str) -> crate::error::ScmError {
    CommandError::InvalidRequest {
        command: command.to_string(),
        message: message.to_string(),
    }
    .into()
}
