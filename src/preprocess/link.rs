// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keyword links in commit messages, e.g. `#42` to an issue tracker URL.

use regex::Regex;

use super::PreProcessor;
use crate::error::{ConfigError, ScmResult};
use crate::repository::changeset::{BlameLine, Changeset};

/// Replaces every match of a pattern in descriptions.
///
/// The replacement may use `$1`, `${name}` group references.
#[derive(Debug, Clone)]
pub struct KeywordLinkPreProcessor {
    pattern: Regex,
    replacement: String,
}

impl KeywordLinkPreProcessor {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `pattern` does not compile.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> ScmResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            section: "preprocess.links".to_string(),
            key: "pattern".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    fn replace(&self, text: &mut String) {
        if let std::borrow::Cow::Owned(replaced) =
            self.pattern.replace_all(text, self.replacement.as_str())
        {
            *text = replaced;
        }
    }
}

impl PreProcessor<Changeset> for KeywordLinkPreProcessor {
    fn process(&self, changeset: &mut Changeset) {
        self.replace(&mut changeset.description);
    }
}

impl PreProcessor<BlameLine> for KeywordLinkPreProcessor {
    fn process(&self, line: &mut BlameLine) {
        if let Some(description) = line.description.as_mut() {
            self.replace(description);
        }
    }
}
