// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Parsers for git plumbing output.
//!
//! ```text
//! log --format=LOG_FORMAT   id 1F name 1F mail 1F time 1F parents 1F body 1E
//! for-each-ref REF_FORMAT   name 1F object 1F peeled
//! ls-tree -l -z             mode SP type SP object SP+ size TAB path NUL
//! blame --porcelain         header / key value / TAB code
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{GitError, ScmResult};
use crate::repository::changeset::{
    BlameLine, BlameResult, Changeset, FileObject, Person, SubRepository,
};

/// Pretty format of `git log` matching [`parse_changesets`].
pub const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%at%x1f%P%x1f%B%x1e";

/// `for-each-ref` format matching [`parse_refs`].
pub const REF_FORMAT: &str = "--format=%(refname:short)%1f%(objectname)%1f%(*objectname)";

const FIELD: char = '\x1f';
const RECORD: char = '\x1e';

fn parse_error(command: &str, line: &str) -> crate::error::ScmError {
    GitError::Parse {
        command: command.to_string(),
        line: line.lines().next().unwrap_or_default().to_string(),
    }
    .into()
}

fn timestamp(value: &str) -> Option<DateTime<Utc>> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Parse records written with [`LOG_FORMAT`].
///
/// # Errors
///
/// Returns `GitError::Parse` for a record with missing fields or a bad
/// timestamp.
pub fn parse_changesets(output: &str) -> ScmResult<Vec<Changeset>> {
    output
        .split(RECORD)
        .map(str::trim_start)
        .filter(|record| !record.is_empty())
        .map(parse_changeset)
        .collect()
}

fn parse_changeset(record: &str) -> ScmResult<Changeset> {
    let fields: Vec<&str> = record.splitn(6, FIELD).collect();
    let [id, name, mail, time, parents, body] = fields[..] else {
        return Err(parse_error("log", record));
    };
    let date = timestamp(time).ok_or_else(|| parse_error("log", record))?;

    let mut changeset = Changeset::new(
        id,
        date,
        Person::new(name, Some(mail.to_string())),
        body.trim_end(),
    );
    changeset.parents = parents.split_whitespace().map(str::to_string).collect();
    Ok(changeset)
}

/// One line of [`REF_FORMAT`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefLine {
    pub name: String,
    /// Commit id, peeled through annotated tags.
    pub revision: String,
}

/// Parse `for-each-ref` output written with [`REF_FORMAT`].
///
/// # Errors
///
/// Returns `GitError::Parse` for a line without an object id.
pub fn parse_refs(output: &str) -> ScmResult<Vec<RefLine>> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split(FIELD);
            let (Some(name), Some(object)) = (fields.next(), fields.next()) else {
                return Err(parse_error("for-each-ref", line));
            };
            if object.is_empty() {
                return Err(parse_error("for-each-ref", line));
            }
            let peeled = fields.next().filter(|peeled| !peeled.is_empty());
            Ok(RefLine {
                name: name.to_string(),
                revision: peeled.unwrap_or(object).to_string(),
            })
        })
        .collect()
}

/// Parse `ls-tree -l -z` output; entry paths are prefixed with `base`.
///
/// # Errors
///
/// Returns `GitError::Parse` for a malformed entry.
pub fn parse_tree(output: &str, base: &str) -> ScmResult<Vec<FileObject>> {
    output
        .split('\0')
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_tree_entry(entry, base))
        .collect()
}

fn parse_tree_entry(entry: &str, base: &str) -> ScmResult<FileObject> {
    let (meta, name) = entry
        .split_once('\t')
        .ok_or_else(|| parse_error("ls-tree", entry))?;
    let mut meta = meta.split_whitespace();
    let (Some(_mode), Some(kind), Some(object), Some(size)) =
        (meta.next(), meta.next(), meta.next(), meta.next())
    else {
        return Err(parse_error("ls-tree", entry));
    };

    let path = if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    };
    Ok(FileObject {
        name: path.rsplit('/').next().unwrap_or_default().to_string(),
        path,
        directory: kind == "tree",
        length: size.parse().ok(),
        sub_repository: (kind == "commit").then(|| SubRepository {
            revision: object.to_string(),
            url: None,
        }),
        ..FileObject::default()
    })
}

/// Nest a flat, parent-first entry list into a tree.
#[must_use]
pub fn nest(entries: Vec<FileObject>) -> Vec<FileObject> {
    let mut roots = Vec::new();
    for entry in entries {
        insert(&mut roots, entry);
    }
    roots
}

fn insert(level: &mut Vec<FileObject>, entry: FileObject) {
    let parent = level.iter_mut().find(|candidate| {
        candidate.directory
            && entry
                .path
                .strip_prefix(candidate.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    });
    match parent {
        Some(parent) => insert(&mut parent.children, entry),
        None => level.push(entry),
    }
}

#[derive(Debug, Default)]
struct CommitInfo {
    author: String,
    mail: Option<String>,
    time: Option<DateTime<Utc>>,
    summary: Option<String>,
}

/// Parse `git blame --porcelain` output.
///
/// # Errors
///
/// Returns `GitError::Parse` for a code line before any header.
pub fn parse_blame(output: &str) -> ScmResult<BlameResult> {
    let mut commits: HashMap<String, CommitInfo> = HashMap::new();
    let mut current: Option<(String, usize)> = None;
    let mut lines = Vec::new();

    for line in output.lines() {
        if let Some(code) = line.strip_prefix('\t') {
            let (revision, line_number) = current
                .as_ref()
                .ok_or_else(|| parse_error("blame", line))?;
            let info = commits.entry(revision.clone()).or_default();
            lines.push(BlameLine {
                line_number: *line_number,
                revision: revision.clone(),
                author: Person::new(info.author.clone(), info.mail.clone()),
                when: info.time,
                description: info.summary.clone(),
                code: code.to_string(),
            });
        } else if let Some(header) = blame_header(line) {
            commits.entry(header.0.clone()).or_default();
            current = Some(header);
        } else if let Some((revision, _)) = &current
            && let Some((key, value)) = line.split_once(' ')
        {
            let info = commits.entry(revision.clone()).or_default();
            match key {
                "author" => info.author = value.to_string(),
                "author-mail" => {
                    info.mail = Some(value.trim_matches(['<', '>']).to_string());
                }
                "author-time" => info.time = timestamp(value),
                "summary" => info.summary = Some(value.to_string()),
                _ => {}
            }
        }
    }
    Ok(BlameResult { lines })
}

/// `<id> <original line> <final line> [<group size>]`
fn blame_header(line: &str) -> Option<(String, usize)> {
    let mut parts = line.split(' ');
    let id = parts.next()?;
    if !matches!(id.len(), 40 | 64) || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let _original: usize = parts.next()?.parse().ok()?;
    let line_number = parts.next()?.parse().ok()?;
    Some((id.to_string(), line_number))
}
