//! `tablecrypt` command-line entry point.
//!
//! Startup sequence:
//! 1. Parse arguments, load and validate [`config::Config`] and the engine
//!    settings from environment variables.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Build the encryption policy and schema registry.
//! 4. Run the command and print its output to stdout.

mod cli;
mod commands;
mod config;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use tablecrypt::{EncryptionPolicy, EncryptionSettings, SchemaRegistry};
use tracing::error;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let (cfg, settings) = match config::Config::from_env()
        .and_then(|cfg| Ok((cfg, EncryptionSettings::from_env()?)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("ERROR: tablecrypt configuration invalid: {e:#}");
            return ExitCode::from(2);
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init(&cfg.log_level) {
        eprintln!("ERROR: {e:#}");
        return ExitCode::FAILURE;
    }

    // -----------------------------------------------------------------------
    // 3. Policy and schema registry
    // -----------------------------------------------------------------------
    let mut builder = EncryptionPolicy::builder().settings(&settings);
    match cfg.kek() {
        Ok(Some(kek)) => builder = builder.key(kek),
        Ok(None) => {}
        Err(e) => {
            eprintln!("ERROR: tablecrypt configuration invalid: {e:#}");
            return ExitCode::from(2);
        }
    }
    let policy = builder.build();
    let registry = SchemaRegistry::from_settings(&settings);

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    let result = match &cli.command {
        Command::Encrypt(args) => commands::encrypt(args, &policy, &registry),
        Command::Decrypt(args) => commands::decrypt(args, &policy, &registry),
    };

    match result.map(|output| serde_json::to_string_pretty(&output)) {
        Ok(Ok(text)) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            eprintln!("ERROR [invalid_json]: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "command failed");
            eprintln!("ERROR [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}
