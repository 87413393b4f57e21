//! CLI argument parsing

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// ModelHub model lifecycle service
#[derive(Debug, Parser)]
#[command(name = "modelhub", version)]
pub struct Cli {
    /// Configuration file (defaults to ./modelhub.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Subcommand to run; `serve` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve(ServeArgs::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Run the REST and JSON-RPC servers
    Serve(ServeArgs),

    /// Write a labelled three-class training set as CSV
    PrepareData {
        /// Destination file
        #[arg(long, short, default_value = "data/train.csv")]
        output: PathBuf,

        /// Seed for the sample generator
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the supported model classes as JSON
    Classes,
}

#[derive(Debug, Clone, Default, PartialEq, ClapArgs)]
pub struct ServeArgs {
    /// Serve only the REST API
    #[arg(long, conflicts_with = "rpc_only")]
    pub rest_only: bool,

    /// Serve only the JSON-RPC API
    #[arg(long)]
    pub rpc_only: bool,

    /// Bind address override
    #[arg(long)]
    pub host: Option<String>,

    /// REST port override
    #[arg(long)]
    pub rest_port: Option<u16>,

    /// JSON-RPC port override
    #[arg(long)]
    pub rpc_port: Option<u16>,
}
