use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medcord")]
#[command(author, version, about = "Media ingestion service with image and video variants")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true, env = "MEDCORD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load the configuration and print any warnings
    CheckConfig,

    /// List the external tools medcord depends on
    Tools,
}
