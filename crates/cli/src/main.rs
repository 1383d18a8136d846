mod commands;
mod config;
mod manual;
mod template;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Derive OSM scenario datasets by applying tag modification rules.
#[derive(Parser)]
#[command(
    name = "tagmod",
    version,
    about = "Derive OSM scenario datasets by applying tag modification rules"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file [default: tagmod.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rule file to a way collection and write the scenario
    Apply {
        /// Rule file [default: run.rules, then modifications.txt]
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Input document, .osm/.xml or .json [default: paths.input template]
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output document [default: paths.output template]
        #[arg(long)]
        out: Option<PathBuf>,
        /// Value for ${CITY} in path templates
        #[arg(long)]
        city: Option<String>,
        /// Value for ${SCENARIO} in path templates
        #[arg(long)]
        scenario: Option<String>,
        /// Seed for FREQ draws [default: run.seed, else random]
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Parse a rule file and list its rules
    Check {
        /// Path to the rule file
        rules: PathBuf,
    },

    /// Print the rule language manual
    Manual,
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Apply {
            rules,
            input,
            out,
            city,
            scenario,
            seed,
        } => {
            commands::apply::cmd_apply(
                commands::apply::ApplyOptions {
                    rules,
                    input,
                    out,
                    city,
                    scenario,
                    seed,
                },
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Check { rules } => {
            commands::check::cmd_check(&rules, cli.output, cli.quiet);
        }
        Commands::Manual => {
            print!("{}", manual::MANUAL);
        }
    }
}

/// `RUST_LOG` wins; otherwise `-v`/`-vv`, then `[log] level`, then `warn`.
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.log.level.as_deref().unwrap_or("warn"),
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
