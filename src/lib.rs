// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |                     |
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |   context (ScmContext)    |
//!              '--+-----------+--------+---'
//!                 |           |        |
//!                 v           v        v
//!               api       repository   hook
//!          builders,     registry,   dispatch,
//!            caches      store, events  exec, url
//!                 |           |
//!                 v           v
//!                spi <---- backend
//!                 ^           |
//!                 +---- git --+
//!
//!   +---------------------------------------------------+
//!   |  runtime   pool, event, process, preprocess, cache |
//!   +---------------------------------------------------+
//!   |  foundation   error, logging, config, security     |
//!   +---------------------------------------------------+
//! ```

pub mod api;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod git;
pub mod hook;
pub mod logging;
pub mod pool;
pub mod preprocess;
pub mod process;
pub mod repository;
pub mod security;
pub mod spi;

#[cfg(test)]
pub(crate) mod test_utils;
