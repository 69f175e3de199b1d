// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hook callback arguments.
//!
//! ```text
//! hook pre-receive git team/project   < "<old> <new> <ref>" lines
//!   → exit 1 with the rejection message when a hook vetoes
//! hook post-receive git team/project  < "<old> <new> <ref>" lines
//! hook-url [--request-url URL]
//! ```

use clap::{Args, ValueEnum};

use crate::hook::RepositoryHookType;

/// Hook points a backend script can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookPoint {
    /// Before the pushed references are updated.
    PreReceive,
    /// After the pushed references were updated.
    PostReceive,
}

impl From<HookPoint> for RepositoryHookType {
    fn from(point: HookPoint) -> Self {
        match point {
            HookPoint::PreReceive => Self::PreReceive,
            HookPoint::PostReceive => Self::PostReceive,
        }
    }
}

/// Arguments for the `hook` command.
#[derive(Debug, Clone, Args)]
pub struct HookArgs {
    /// Hook point being reported.
    #[arg(value_enum)]
    pub point: HookPoint,

    /// Repository type.
    #[arg(value_name = "TYPE")]
    pub backend: String,

    /// Repository name.
    #[arg(value_name = "NAME")]
    pub name: String,
}

/// Arguments for the `hook-url` command.
#[derive(Debug, Clone, Default, Args)]
pub struct HookUrlArgs {
    /// Base URL of the request being served, probed after hooks.base_url.
    #[arg(long = "request-url", value_name = "URL")]
    pub request_url: Option<String>,
}
