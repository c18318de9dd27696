use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jira-digest",
    version,
    about = "Daily Jira issue digest delivered to a Lark group chat"
)]
pub struct Cli {
    /// Output format for previews, dry runs and errors
    #[arg(long, short = 'o', value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// When to colorize output
    #[arg(long, value_enum, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a TOML config file
    #[arg(long, env = "JIRA_DIGEST_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter (e.g. info, debug, jira_backend=trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Without a subcommand the configured run mode decides between `run` and `schedule`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Debug, Copy, Default)]
pub enum ColorChoice {
    /// Colorize output if stderr is a terminal and NO_COLOR is unset
    #[default]
    Auto,
    /// Always colorize output
    Always,
    /// Never colorize output
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and deliver one report, then exit (for cron or CI triggers)
    #[command(visible_alias = "once")]
    Run {
        /// Fetch and render, print the webhook payload, deliver nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Deliver a report on every cron trigger until interrupted
    #[command(visible_alias = "loop")]
    Schedule,
    /// Render the report to stdout without delivering it
    Preview {
        /// Use built-in sample issues instead of querying Jira
        #[arg(long)]
        sample: bool,
    },
    /// Inspect the effective configuration
    #[command(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommands {
    /// Print the merged configuration with secrets masked
    Show,
    /// Print the config file search path
    Path,
    /// Validate the configuration and list the next trigger times
    Check,
}
