//! CLI module for the document chat engine.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Chat with your documents from the command line.
#[derive(Debug, Parser)]
#[command(name = "docchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a document into a chat session
    Upload(commands::UploadArgs),

    /// Ask a question about the uploaded documents
    Ask(commands::AskArgs),

    /// Clear the session's documents and history
    Reset(commands::ResetArgs),

    /// Show the active session
    Session(commands::SessionArgs),

    /// Check daemon status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),

    /// Run the daemon
    Serve(commands::ServeArgs),
}
