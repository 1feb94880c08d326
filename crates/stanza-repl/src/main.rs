//! stanza entry point.
//!
//! ```bash
//! stanza parse 'd0t.crawl https://x.io → d0t.analyze' --json
//! stanza run 'd0t.crawl https://x.io → d0t.analyze' --registry commands.json
//! stanza repl
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use stanza_repl::cli::{self, RunOptions};
use stanza_repl::config::Config;

#[derive(Debug, Parser)]
#[command(name = "stanza", version, about = "Compose registered commands with stanza operators")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/stanza/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show how a stanza parses, without running it
    Parse {
        stanza: String,
        /// Print the AST as JSON
        #[arg(long)]
        json: bool,
        /// Also print the token stream
        #[arg(long)]
        tokens: bool,
    },
    /// Run a stanza and print its outcome as JSON
    Run {
        stanza: String,
        #[command(flatten)]
        options: RunOptions,
    },
    /// Interactive prompt (the default)
    Repl {
        #[command(flatten)]
        options: RunOptions,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Some(Command::Parse {
            stanza,
            json,
            tokens,
        }) => {
            let (report, parsed) = cli::parse_report(&stanza, json, tokens)?;
            print!("{report}");
            Ok(exit_code(parsed))
        }
        Some(Command::Run { stanza, options }) => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            let (report, parsed) = runtime.block_on(async {
                let cancel = cli::cancel_on_ctrl_c();
                cli::run_report(&stanza, options.kernel_config(&config), cancel).await
            })?;
            println!("{report}");
            Ok(exit_code(parsed))
        }
        Some(Command::Repl { options }) => {
            stanza_repl::run(options.kernel_config(&config))?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            stanza_repl::run(RunOptions::default().kernel_config(&config))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(parsed: bool) -> ExitCode {
    if parsed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
