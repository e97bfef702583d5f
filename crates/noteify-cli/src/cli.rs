use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "noteify")]
#[command(about = "Manage your Noteify notes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the notes API (e.g. https://notes.example.com/api)
    #[arg(long, global = true, env = "NOTEIFY_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Access token sent as a bearer credential
    #[arg(
        long,
        global = true,
        env = "NOTEIFY_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN"
    )]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes, newest first
    List {
        /// Only notes whose title or content contains this text
        #[arg(short, long, value_name = "QUERY")]
        search: Option<String>,
        /// Only notes carrying at least one of these tags
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Number of notes to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every tag in use
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title (defaults to "Untitled Note")
        #[arg(short, long)]
        title: Option<String>,
        /// Tag to attach; repeat for several
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Note content (read from stdin when piped)
        content: Vec<String>,
    },
    /// Edit an existing note (opens $EDITOR when no field is given)
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
        /// Replace all tags (comma separated)
        #[arg(long, value_delimiter = ',', value_name = "TAGS")]
        tags: Option<Vec<String>>,
    },
    /// Delete an existing note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Print an AI summary of a note
    Summarize {
        /// Note ID or unique ID prefix
        id: String,
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
