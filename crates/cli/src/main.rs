use std::env;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, warn};

use paramgate_cli::cli_args::Args;
use paramgate_cli::runner;
use paramgate_core::config::{self, DEFAULT_SHELL};
use paramgate_core::engine::Engine;
use paramgate_core::error::Result;
use paramgate_core::{execution, file_handling};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn execute(args: &Args) -> Result<()> {
    let engine = Engine::new();

    let config_path = config::get_config_path(&args.config_path);
    debug!("Config path: `{config_path}`");
    let app_config = file_handling::load_app_config(&config_path, engine.registry())?;

    let prepared = runner::prepare(&app_config, &engine, &args.command_line)?;

    if args.dry_run {
        println!("{}", runner::render(&prepared, args.format));
        return Ok(());
    }

    let Some(script) = &prepared.script else {
        warn!("Command `{}` has no start script, nothing to run", prepared.command);
        return Ok(());
    };

    let shell = env::var("SHELL").unwrap_or_else(|_| DEFAULT_SHELL.to_string());
    execution::execute_script(&shell, script, &prepared.environment)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
