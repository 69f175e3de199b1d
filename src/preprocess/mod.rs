// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Post-retrieval transformation of command results.
//!
//! ```text
//! cached / fresh result (clone)
//!        |
//!        v
//!  1. HTML escaping          (skipped when the caller disables escaping)
//!  2. stateless processors   (registration order)
//!  3. factories              create(repository) --> bound processor
//!        |
//!        v
//!  caller
//! ```
//!
//! Results are stored in the cache unprocessed, so a caller that disables
//! escaping or pre-processing never affects what other callers see. Running
//! the pipeline twice over the same value escapes twice; `&amp;` becomes
//! `&amp;amp;`. Builders always start from a fresh clone, so this only
//! happens when a caller re-feeds processed output.

pub mod link;


use std::sync::Arc;

use crate::config::types::PreProcessConfig;
use crate::error::ScmResult;
use crate::repository::Repository;
use crate::repository::changeset::{BlameLine, BlameResult, BrowserResult, Changeset, FileObject};

pub use link::KeywordLinkPreProcessor;

/// Transforms one item in place.
pub trait PreProcessor<T>: Send + Sync {
    fn process(&self, item: &mut T);
}

impl<T, F> PreProcessor<T> for F
where
    F: Fn(&mut T) + Send + Sync,
{
    fn process(&self, item: &mut T) {
        self(item);
    }
}

/// Creates a processor bound to one repository.
///
/// Returning `None` skips the factory for that repository.
pub trait PreProcessorFactory<T>: Send + Sync {
    fn create(&self, repository: &Repository) -> Option<Box<dyn PreProcessor<T>>>;
}

struct Stage<T> {
    processors: Vec<Arc<dyn PreProcessor<T>>>,
    factories: Vec<Arc<dyn PreProcessorFactory<T>>>,
}

impl<T> Default for Stage<T> {
    fn default() -> Self {
        Self {
            processors: Vec::new(),
            factories: Vec::new(),
        }
    }
}

impl<T> Stage<T> {
    /// Processors for one repository, factories resolved once.
    fn bind(&self, repository: &Repository) -> Bound<'_, T> {
        Bound {
            processors: &self.processors,
            bound: self
                .factories
                .iter()
                .filter_map(|factory| factory.create(repository))
                .collect(),
        }
    }
}

struct Bound<'a, T> {
    processors: &'a [Arc<dyn PreProcessor<T>>],
    bound: Vec<Box<dyn PreProcessor<T>>>,
}

impl<T> Bound<'_, T> {
    fn process(&self, item: &mut T) {
        for processor in self.processors {
            processor.process(item);
        }
        for processor in &self.bound {
            processor.process(item);
        }
    }
}

/// Ordered processors for changesets, blame lines and file objects.
#[derive(Default)]
pub struct PreProcessorPipeline {
    changesets: Stage<Changeset>,
    blame_lines: Stage<BlameLine>,
    files: Stage<FileObject>,
}

impl PreProcessorPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with the keyword links of `config`.
    ///
    /// # Errors
    ///
    /// Returns a config error if a link pattern is not a valid regex.
    pub fn from_config(config: &PreProcessConfig) -> ScmResult<Self> {
        let mut pipeline = Self::new();
        for link in &config.links {
            let processor = Arc::new(KeywordLinkPreProcessor::new(
                &link.pattern,
                &link.replacement,
            )?);
            let changesets: Arc<dyn PreProcessor<Changeset>> = Arc::<KeywordLinkPreProcessor>::clone(&processor);
            pipeline = pipeline
                .with_changeset_processor(changesets)
                .with_blame_processor(processor);
        }
        Ok(pipeline)
    }

    #[must_use]
    pub fn with_changeset_processor(mut self, processor: Arc<dyn PreProcessor<Changeset>>) -> Self {
        self.changesets.processors.push(processor);
        self
    }

    #[must_use]
    pub fn with_changeset_factory(
        mut self,
        factory: Arc<dyn PreProcessorFactory<Changeset>>,
    ) -> Self {
        self.changesets.factories.push(factory);
        self
    }

    #[must_use]
    pub fn with_blame_processor(mut self, processor: Arc<dyn PreProcessor<BlameLine>>) -> Self {
        self.blame_lines.processors.push(processor);
        self
    }

    #[must_use]
    pub fn with_blame_factory(mut self, factory: Arc<dyn PreProcessorFactory<BlameLine>>) -> Self {
        self.blame_lines.factories.push(factory);
        self
    }

    #[must_use]
    pub fn with_file_processor(mut self, processor: Arc<dyn PreProcessor<FileObject>>) -> Self {
        self.files.processors.push(processor);
        self
    }

    #[must_use]
    pub fn with_file_factory(mut self, factory: Arc<dyn PreProcessorFactory<FileObject>>) -> Self {
        self.files.factories.push(factory);
        self
    }

    pub fn process_changesets(
        &self,
        repository: &Repository,
        changesets: &mut [Changeset],
        escape: bool,
    ) {
        let stage = self.changesets.bind(repository);
        for changeset in changesets {
            if escape {
                escape_changeset(changeset);
            }
            stage.process(changeset);
        }
    }

    pub fn process_changeset(
        &self,
        repository: &Repository,
        changeset: &mut Changeset,
        escape: bool,
    ) {
        self.process_changesets(repository, std::slice::from_mut(changeset), escape);
    }

    pub fn process_blame(&self, repository: &Repository, result: &mut BlameResult, escape: bool) {
        let stage = self.blame_lines.bind(repository);
        for line in &mut result.lines {
            if escape {
                escape_blame_line(line);
            }
            stage.process(line);
        }
    }

    /// Process the root file object and every descendant.
    pub fn process_browse(
        &self,
        repository: &Repository,
        result: &mut BrowserResult,
        escape: bool,
    ) {
        let stage = self.files.bind(repository);
        result.file.walk_mut(&mut |file| {
            if escape {
                escape_file(file);
            }
            stage.process(file);
        });
    }
}

impl std::fmt::Debug for PreProcessorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreProcessorPipeline")
            .field("changeset_processors", &self.changesets.processors.len())
            .field("changeset_factories", &self.changesets.factories.len())
            .field("blame_processors", &self.blame_lines.processors.len())
            .field("blame_factories", &self.blame_lines.factories.len())
            .field("file_processors", &self.files.processors.len())
            .field("file_factories", &self.files.factories.len())
            .finish()
    }
}

/// Escape `<`, `>`, `&`, `"` and `'` for HTML output.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_in_place(value: &mut String) {
    if value.contains(['<', '>', '&', '"', '\'']) {
        *value = escape_html(value);
    }
}

fn escape_changeset(changeset: &mut Changeset) {
    escape_in_place(&mut changeset.description);
    escape_in_place(&mut changeset.author.name);
    if let Some(mail) = changeset.author.mail.as_mut() {
        escape_in_place(mail);
    }
}

fn escape_blame_line(line: &mut BlameLine) {
    escape_in_place(&mut line.code);
    escape_in_place(&mut line.author.name);
    if let Some(description) = line.description.as_mut() {
        escape_in_place(description);
    }
}

fn escape_file(file: &mut FileObject) {
    escape_in_place(&mut file.name);
    if let Some(description) = file.description.as_mut() {
        escape_in_place(description);
    }
}
