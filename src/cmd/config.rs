// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands for scm-hub.

use crate::config::Config;
use crate::context::ScmContext;

/// Display current configuration options.
pub fn run_options_command(config: &Config, config_files: &[String]) {
    if config_files.is_empty() {
        println!("# no configuration files loaded");
    } else {
        for line in config_files {
            println!("# {line}");
        }
    }
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Display registered repository types.
pub fn run_types_command(context: &ScmContext) {
    let registry = context.registry();
    let configured = registry.configured_types();
    for backend_type in registry.types() {
        let state = if configured.contains(&backend_type) {
            "configured"
        } else {
            "not configured"
        };
        println!(
            "{:10} {:20} {state}",
            backend_type.name(),
            backend_type.display_name()
        );
    }
}
