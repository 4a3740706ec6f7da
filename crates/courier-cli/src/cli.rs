use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Queue, sync and read direct messages from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a message for delivery
    Send {
        /// Sender user id
        #[arg(long, value_name = "USER")]
        from: String,
        /// Recipient user id
        #[arg(long, value_name = "USER")]
        to: String,
        /// Treat the content as opaque ciphertext
        #[arg(long)]
        ciphertext: bool,
        /// Reuse a client message id (idempotent re-queue)
        #[arg(long, value_name = "ID")]
        client_id: Option<String>,
        /// Message content (read from stdin when omitted)
        content: Vec<String>,
    },
    /// Run one sync cycle for a user
    Sync {
        /// User whose outbox and conversations are synced
        #[arg(long, value_name = "USER")]
        user: String,
        /// Actor token for the message server
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one row per conversation
    Inbox {
        /// Viewing user
        #[arg(long, value_name = "USER")]
        user: String,
        /// Number of conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the messages exchanged with a friend
    #[command(alias = "thread")]
    Conversation {
        /// Viewing user
        #[arg(long, value_name = "USER")]
        user: String,
        /// Conversation partner
        #[arg(long, value_name = "USER")]
        friend: String,
        /// Only messages created after this RFC 3339 time or Unix ms timestamp
        #[arg(long, value_name = "TIME")]
        since: Option<String>,
        /// Number of messages to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a message read and send the read receipt
    Read {
        /// Viewing user (the message recipient)
        #[arg(long, value_name = "USER")]
        user: String,
        /// Local message id or client message id
        message_id: String,
        /// Actor token for the message server
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show outbox counts for a user
    Outbox {
        /// Sending user
        #[arg(long, value_name = "USER")]
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the local friend list
    Friend {
        #[command(subcommand)]
        command: FriendCommands,
    },
    /// Show or update connectivity configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    LocalOnly,
    Hosted,
    SelfHosted,
}

#[derive(Subcommand)]
pub enum FriendCommands {
    /// Record an accepted friendship
    Add {
        /// User who owns the friend list
        #[arg(long, value_name = "USER")]
        user: String,
        /// Friend to add
        friend: String,
    },
    /// List accepted friends
    List {
        /// User who owns the friend list
        #[arg(long, value_name = "USER")]
        user: String,
        /// Number of friends to show
        #[arg(short, long, default_value = "100")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update the stored configuration
    Set {
        /// Connectivity mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Hosted message server base URL
        #[arg(long, value_name = "URL")]
        hosted_url: Option<String>,
        /// Self-hosted message server base URL
        #[arg(long, value_name = "URL")]
        self_hosted_url: Option<String>,
        /// Upper bound for each remote call, in seconds
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Attempts before a retryable delivery is marked failed
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,
    },
}
