// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> ScmContext --> Command Dispatch
//!   Version | Options | Types | Repo | Log | .. | Hook | HookUrl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use scm_hub::cli::global::GlobalOptions;
use scm_hub::cli::{self, Command};
use scm_hub::cmd::config::{run_options_command, run_types_command};
use scm_hub::cmd::hook::{run_hook_command, run_hook_url_command};
use scm_hub::cmd::query::{
    run_blame_command, run_branches_command, run_browse_command, run_cat_command,
    run_diff_command, run_incoming_command, run_log_command, run_outgoing_command,
    run_pull_command, run_push_command, run_tags_command,
};
use scm_hub::cmd::repo::run_repo_command;
use scm_hub::cmd::subject;
use scm_hub::config::loader::ConfigLoader;
use scm_hub::config::{Config, DEFAULT_CONFIG_FILE, ENV_PREFIX};
use scm_hub::context::ScmContext;
use scm_hub::logging::{LogConfig, init_logging};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    if matches!(cli.command, Some(Command::Version)) {
        handle_version_command();
        return ExitCode::SUCCESS;
    }

    let loader = match build_config_loader(&cli.global) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let config_files = loader.format_loaded_files();
    // hook scripts run inside the repository, so they need an absolute path
    let config_file = loader
        .file_paths()
        .pop()
        .map(|path| std::fs::canonicalize(&path).unwrap_or(path));
    let config = match loader.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&build_log_config(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(&cli, config, &config_files, config_file).await
}

fn build_log_config(config: &Config) -> LogConfig {
    let global = &config.global;
    LogConfig::builder()
        .with_console_level(global.output_log_level)
        .with_file_level(global.file_log_level)
        .maybe_with_log_file(
            Some(global.log_file.display().to_string()).filter(|path| !path.is_empty()),
        )
        .with_json_file(global.json_log)
        .build()
}

async fn dispatch_command(
    cli: &cli::Cli,
    config: Config,
    config_files: &[String],
    config_file: Option<PathBuf>,
) -> ExitCode {
    let Some(command) = &cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        return ExitCode::FAILURE;
    };
    if matches!(command, Command::Options) {
        run_options_command(&config, config_files);
        return ExitCode::SUCCESS;
    }

    let context = match ScmContext::from_config(config, config_file) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subject = subject(&context, &cli.global);

    let result = match command {
        Command::Version | Command::Options => Ok(()),
        Command::Types => {
            run_types_command(&context);
            Ok(())
        }
        Command::Repo(args) => run_repo_command(args, &context, &subject),
        Command::Log(args) => run_log_command(args, &context, &subject),
        Command::Blame(args) => run_blame_command(args, &context, &subject),
        Command::Browse(args) => run_browse_command(args, &context, &subject),
        Command::Cat(args) => run_cat_command(args, &context, &subject),
        Command::Diff(args) => run_diff_command(args, &context, &subject),
        Command::Tags(args) => run_tags_command(args, &context, &subject),
        Command::Branches(args) => run_branches_command(args, &context, &subject),
        Command::Incoming(args) => run_incoming_command(args, &context, &subject),
        Command::Outgoing(args) => run_outgoing_command(args, &context, &subject),
        Command::Push(args) => run_push_command(args, &context, &subject),
        Command::Pull(args) => run_pull_command(args, &context, &subject),
        Command::Hook(args) => run_hook_command(args, &context, &subject),
        Command::HookUrl(args) => run_hook_url_command(args, &context).await,
    };
    context.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn build_config_loader(global: &GlobalOptions) -> scm_hub::error::Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if !global.no_default_config {
        loader = loader.add_toml_file_optional(DEFAULT_CONFIG_FILE);
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader = loader.with_env_prefix(ENV_PREFIX);
    for option in global.to_config_overrides() {
        loader = loader.set_from_str(&option)?;
    }
    Ok(loader)
}
