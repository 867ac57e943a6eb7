//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// How `ask` prints the answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Answer, reasoning, data points and thoughts
    Full,
    /// Only the answer text
    #[default]
    Answer,
    /// The raw answer envelope as JSON
    Json,
}

/// CLI arguments for orc-server
#[derive(Parser, Debug)]
#[command(name = "orc-server")]
#[command(author, version, about = "Multi-agent group-chat orchestration service")]
#[command(long_about = r#"
orc answers a question by letting a team of agents take turns: retrieval
agents search the knowledge base, query agents inspect and query
datasources, and a closing agent writes the final answer.

Configuration files are loaded from (in priority order):
1. ORC_* environment variables (ORC_MODEL__DEPLOYMENT=gpt-4o)
2. --config <path>            Explicit config file
3. ./orc.toml or ./.orc.toml  Project-level config
4. ~/.config/orc/config.toml  Global config

Example:
  orc-server serve --bind 127.0.0.1:8080
  orc-server ask "How many vacation days do I have?"
  orc-server --strategy nl2sql ask --stream "Top 5 products by revenue"
  orc-server chat
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Strategy to answer with (overrides `orchestration.strategy`)
    #[arg(short, long, global = true, value_name = "NAME")]
    pub strategy: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides `server.bind`)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Answer one question and exit
    Ask {
        question: String,

        /// Continue an existing conversation
        #[arg(long, value_name = "ID")]
        conversation_id: Option<String>,

        /// Print the answer as it is produced
        #[arg(long)]
        stream: bool,

        /// Output format (ignored with --stream)
        #[arg(short, long, value_enum, default_value = "answer")]
        output: OutputFormat,
    },

    /// Interactive console conversation
    Chat {
        /// Continue an existing conversation
        #[arg(long, value_name = "ID")]
        conversation_id: Option<String>,
    },
}
