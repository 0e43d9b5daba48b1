use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tmcore", bin_name = "tmcore", version)]
#[command(about = "Inspect threat model documents and run threat generation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the generation rule of every threat type
    Rules {
        /// Model document
        model: PathBuf,
    },

    /// Find identities whose name, description or properties contain a text
    Search {
        /// Model document
        model: PathBuf,

        /// Text to look for, case-insensitive
        filter: String,
    },

    /// Run threat generation
    Generate {
        /// Model document
        model: PathBuf,

        /// Save the generated threat events back into the document
        #[arg(long)]
        write: bool,
    },
}
