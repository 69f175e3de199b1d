// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commands and features a backend can advertise.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Repository operations known to every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Blame,
    Browse,
    Cat,
    Diff,
    Log,
    Tags,
    Branches,
    Incoming,
    Outgoing,
    Push,
    Pull,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Blame,
        Self::Browse,
        Self::Cat,
        Self::Diff,
        Self::Log,
        Self::Tags,
        Self::Branches,
        Self::Incoming,
        Self::Outgoing,
        Self::Push,
        Self::Pull,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blame => "blame",
            Self::Browse => "browse",
            Self::Cat => "cat",
            Self::Diff => "diff",
            Self::Log => "log",
            Self::Tags => "tags",
            Self::Branches => "branches",
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    /// The single-bit set holding this command.
    #[must_use]
    pub const fn flag(self) -> Commands {
        match self {
            Self::Blame => Commands::BLAME,
            Self::Browse => Commands::BROWSE,
            Self::Cat => Commands::CAT,
            Self::Diff => Commands::DIFF,
            Self::Log => Commands::LOG,
            Self::Tags => Commands::TAGS,
            Self::Branches => Commands::BRANCHES,
            Self::Incoming => Commands::INCOMING,
            Self::Outgoing => Commands::OUTGOING,
            Self::Push => Commands::PUSH,
            Self::Pull => Commands::PULL,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown command '{s}'"))
    }
}

bitflags! {
    /// A set of [`Command`]s, as advertised by a service provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Commands: u16 {
        const BLAME = 1 << 0;
        const BROWSE = 1 << 1;
        const CAT = 1 << 2;
        const DIFF = 1 << 3;
        const LOG = 1 << 4;
        const TAGS = 1 << 5;
        const BRANCHES = 1 << 6;
        const INCOMING = 1 << 7;
        const OUTGOING = 1 << 8;
        const PUSH = 1 << 9;
        const PULL = 1 << 10;
    }
}

impl Commands {
    /// Whether `command` is in the set.
    #[must_use]
    pub const fn supports(self, command: Command) -> bool {
        self.contains(command.flag())
    }

    /// The contained commands in declaration order.
    pub fn commands(self) -> impl Iterator<Item = Command> {
        Command::ALL
            .into_iter()
            .filter(move |command| self.supports(*command))
    }
}

impl From<Command> for Commands {
    fn from(command: Command) -> Self {
        command.flag()
    }
}

/// A backend-specific capability beyond the command set.
///
/// Features are open-ended: backends define their own next to the shared
/// constants below.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Feature(Cow<'static, str>);

impl Feature {
    /// The default branch is part of every log request unless one is named.
    pub const COMBINED_DEFAULT_BRANCH: Self = Self::from_static("combined-default-branch");

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
