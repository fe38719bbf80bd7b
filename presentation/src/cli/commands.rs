//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for parley
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about = "Conversation practice with streaming AI personas")]
#[command(long_about = r#"
Parley hosts role-play conversations with an AI persona. Replies stream back
chunk by chunk, and each exchange can be analyzed for feedback or a coaching
suggestion for your next message.

Configuration is merged from (in priority order):
1. PARLEY_* environment variables   e.g. PARLEY_PROVIDER__MODEL=gpt-4o
2. --config <path>                   Explicit config file
3. ./parley.toml                     Project-level config
4. ~/.config/parley/config.toml      Global config

Example:
  parley serve --bind 0.0.0.0:8787
  parley chat --persona barista --system "You are a cheerful barista in Lisbon."
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Talk to a persona in the terminal
    Chat {
        /// Persona identifier
        #[arg(short, long, default_value = "partner")]
        persona: String,

        /// Persona system instruction
        #[arg(
            short,
            long,
            value_name = "TEXT",
            default_value = "You are a friendly conversation partner. Keep replies short and natural."
        )]
        system: String,

        /// Suppress the waiting spinner
        #[arg(short, long)]
        quiet: bool,
    },
}
