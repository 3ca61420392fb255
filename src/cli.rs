//! Command-line interface definition for Kondate
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the relay server, the interactive chat client,
//! and conversation history management.

use clap::{Parser, Subcommand};

/// Kondate - recipe-suggestion chat relay and terminal client
///
/// Run the relay that proxies chat turns to the vendor AI, or chat with it
/// from the terminal, with conversation history and shopping-list
/// checklists stored locally.
#[derive(Parser, Debug, Clone)]
#[command(name = "kondate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the local data directory
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Kondate
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Override the listen address from config (e.g. 0.0.0.0:3000)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Start the interactive chat client
    Chat {
        /// Override the relay URL from config
        #[arg(short, long)]
        relay_url: Option<String>,

        /// Resume an existing conversation by id or id prefix
        #[arg(long)]
        resume: Option<String>,
    },

    /// Manage stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Show a conversation's messages
    Show {
        /// Conversation id or id prefix
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id or id prefix
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
