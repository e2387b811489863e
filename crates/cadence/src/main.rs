// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence - a lead nurturing engine.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod adapters;
mod serve;
mod status;

use std::path::PathBuf;

use cadence_config::{CadenceConfig, ConfigError};
use clap::{Parser, Subcommand};

/// Cadence - a lead nurturing engine.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine until interrupted.
    Serve {
        /// JSON file holding the lead records.
        #[arg(long, default_value = "leads.json")]
        leads: PathBuf,
    },
    /// Show the task queue, or one lead's engine state.
    Status {
        /// Show fatigue, conversation, and schedule for this lead.
        #[arg(long)]
        lead: Option<String>,
        /// Output structured JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate configuration and report every error.
    Check,
    /// Print the effective configuration as TOML.
    Show,
}

fn load(path: Option<&PathBuf>) -> Result<CadenceConfig, Vec<ConfigError>> {
    match path {
        Some(path) => cadence_config::load_and_validate_path(path),
        None => cadence_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            cadence_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve { leads }) => serve::run_serve(config, &leads).await,
        Some(Commands::Status { lead, json, plain }) => {
            status::run_status(&config, lead.as_deref(), json, plain).await
        }
        Some(Commands::Config { action }) => match action {
            ConfigCommands::Check => {
                println!(
                    "cadence: config ok (agent.name={}, mode={})",
                    config.agent.name, config.orchestrator.mode
                );
                Ok(())
            }
            ConfigCommands::Show => match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    print!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(cadence_core::CadenceError::Config(format!(
                    "failed to render config: {e}"
                ))),
            },
        },
        None => {
            println!("cadence: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["cadence", "status", "--lead", "lead-1", "--json"]);
        match cli.command {
            Some(Commands::Status { lead, json, plain }) => {
                assert_eq!(lead.as_deref(), Some("lead-1"));
                assert!(json);
                assert!(!plain);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["cadence", "--config", "c.toml", "serve"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { ref leads }) if leads == &PathBuf::from("leads.json")
        ));
    }

    #[test]
    fn default_config_renders_as_toml() {
        let config = cadence_config::load_and_validate_str("").expect("defaults are valid");
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[orchestrator]"));
        assert!(rendered.contains("mode = \"semi_auto\""));
    }
}
