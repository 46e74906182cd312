use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use digestigo_core::Category;

#[derive(Parser)]
#[command(name = "digestigo")]
#[command(about = "Digestive health tracking assistant")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base directory (default: ~/.digestigo)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Categorize a message and save tracking entries
    Track {
        /// Message text (e.g., "I ate pizza and got bloated")
        #[arg(required = true)]
        message: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chat with the assistant; each message is answered and tracked
    Chat {
        /// Clear the conversation history before starting
        #[arg(long)]
        reset: bool,
    },

    /// Override the category of a message (validated by the classifier)
    Recategorize {
        /// Requested category (symptom, dietary, trigger, general)
        #[arg(short, long, value_parser = parse_category)]
        category: Category,

        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// List tracking entries
    Entries {
        /// Only show entries in this category
        #[arg(short, long, value_parser = parse_category)]
        category: Option<Category>,

        /// Show only the most recent N entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show aggregated tracking summary
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the generated health insight
    Insights {
        /// Regenerate instead of using the cached text
        #[arg(short, long)]
        refresh: bool,
    },

    /// Print a plain-text health report
    Report {
        /// Additional notes to include (e.g., "Started lactose-free diet on Monday")
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete all tracking data and the cached insight
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Check whether the configured classifier command is available
    Check,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g., classifier.command)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., classifier.args)
        key: String,

        /// Value to set (e.g., "--print,--model,haiku" or "[--print]")
        value: String,
    },

    /// List all config values
    List,

    /// Show config file path
    Path,

    /// Create config file with commented defaults
    Init,
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|e| e.to_string())
}
