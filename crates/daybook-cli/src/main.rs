//! Daybook CLI - a local-first personal mood and activity journal
//!
//! This is the command-line interface for Daybook. It provides a thin,
//! user-friendly surface over the core library: the journal itself,
//! migrations, and statistics all live in `daybook-core`.

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use daybook_core::VERSION;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::{catalog, entries, stats, transfer};

/// Editing tool stamped into edit logs by this binary.
pub const EDITING_TOOL: &str = "cli";

/// Daybook - a local-first personal mood and activity journal
#[derive(Parser)]
#[command(name = "daybook")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the journal database
    #[arg(short, long, global = true, env = "DAYBOOK_PATH")]
    journal: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new journal database
    Init {
        /// Path where the journal will be created
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },

    /// Add a new entry
    Add {
        /// Entry date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Mood name for the entry
        #[arg(short, long)]
        mood: Option<String>,

        /// Note body
        #[arg(short, long)]
        note: Option<String>,

        /// Numeric activity detail, as NAME=AMOUNT (repeatable)
        #[arg(long, value_name = "NAME=AMOUNT")]
        count: Vec<String>,

        /// List activity detail, as NAME=TEXT (repeatable)
        #[arg(long, value_name = "NAME=TEXT")]
        item: Vec<String>,
    },

    /// List entries, newest first
    List {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        since: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        until: Option<String>,

        /// Limit number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single entry
    Show {
        /// Entry ID
        #[arg(value_name = "ID")]
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit an existing entry
    Edit {
        /// Entry ID
        #[arg(value_name = "ID")]
        id: String,

        /// New entry date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New mood name
        #[arg(short, long)]
        mood: Option<String>,

        /// New note body
        #[arg(short, long)]
        note: Option<String>,

        /// Edit session duration in milliseconds
        #[arg(long, default_value_t = 0)]
        duration_ms: u64,
    },

    /// Remove an entry
    Remove {
        /// Entry ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Mutate one entry's activity details
    #[command(subcommand)]
    Detail(DetailCommands),

    /// Manage moods
    #[command(subcommand)]
    Mood(MoodCommands),

    /// Manage activities
    #[command(subcommand)]
    Activity(ActivityCommands),

    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommands),

    /// Show statistics
    Stats {
        /// Rank detail values for this activity instead of the period
        /// overview
        #[arg(long)]
        activity: Option<String>,

        /// Top-N cutoff for rankings
        #[arg(long, default_value_t = daybook_core::stats::DEFAULT_DETAIL_LIMIT)]
        top: usize,

        /// Exclude detail values from rankings (repeatable)
        #[arg(long, value_name = "TEXT")]
        exclude: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the journal to a JSON document
    Export {
        /// Output file path
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Import a JSON export document
    Import {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum DetailCommands {
    /// Add to a numeric detail (creating it at zero when absent)
    AddCount {
        #[arg(value_name = "ENTRY_ID")]
        id: String,
        #[arg(value_name = "ACTIVITY")]
        activity: String,
        #[arg(value_name = "AMOUNT")]
        amount: f64,
    },

    /// Append to a list detail (creating it when absent)
    AddItem {
        #[arg(value_name = "ENTRY_ID")]
        id: String,
        #[arg(value_name = "ACTIVITY")]
        activity: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Replace one list item
    SetItem {
        #[arg(value_name = "ENTRY_ID")]
        id: String,
        #[arg(value_name = "ACTIVITY")]
        activity: String,
        #[arg(value_name = "INDEX")]
        index: usize,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Remove one list item
    RemoveItem {
        #[arg(value_name = "ENTRY_ID")]
        id: String,
        #[arg(value_name = "ACTIVITY")]
        activity: String,
        #[arg(value_name = "INDEX")]
        index: usize,
    },

    /// Delete the detail entirely
    Clear {
        #[arg(value_name = "ENTRY_ID")]
        id: String,
        #[arg(value_name = "ACTIVITY")]
        activity: String,
    },
}

#[derive(Subcommand)]
enum MoodCommands {
    /// Add a mood
    Add {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "EMOJI")]
        emoji: String,
        /// Rating from 1 (worst) to 5 (best)
        #[arg(value_name = "RATING")]
        rating: u8,
    },

    /// List moods
    List,
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// Add an activity
    Add {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "EMOJI")]
        emoji: String,
        /// Optional category
        #[arg(long)]
        category: Option<String>,
    },

    /// List activities
    List {
        /// Include archived activities
        #[arg(long)]
        all: bool,
    },

    /// Archive an activity (kept in history and stats)
    Archive {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Restore an archived activity
    Restore {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note (a trailing "#tag" line sets its path)
    Add {
        /// Note content
        #[arg(value_name = "CONTENT")]
        content: String,

        /// Note date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List notes
    List {
        /// Filter by path
        #[arg(long)]
        path: Option<String>,
    },
}

impl Cli {
    /// Resolve the journal database path: flag/env, then config file,
    /// then the XDG default.
    pub fn journal_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.journal {
            return Ok(PathBuf::from(path));
        }
        let config_path = config::default_config_path()?;
        if config_path.exists() {
            let config = config::read_config(&config_path)?;
            return Ok(PathBuf::from(config.journal.path));
        }
        config::default_journal_path()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init { path } => entries::handle_init(&cli, path.as_deref()),
        Commands::Add {
            date,
            mood,
            note,
            count,
            item,
        } => entries::handle_add(&cli, date.as_deref(), mood.as_deref(), note.as_deref(), count, item),
        Commands::List {
            since,
            until,
            limit,
            json,
        } => entries::handle_list(&cli, since.as_deref(), until.as_deref(), *limit, *json),
        Commands::Show { id, json } => entries::handle_show(&cli, id, *json),
        Commands::Edit {
            id,
            date,
            mood,
            note,
            duration_ms,
        } => entries::handle_edit(
            &cli,
            id,
            date.as_deref(),
            mood.as_deref(),
            note.as_deref(),
            *duration_ms,
        ),
        Commands::Remove { id } => entries::handle_remove(&cli, id),
        Commands::Detail(detail) => match detail {
            DetailCommands::AddCount { id, activity, amount } => {
                entries::handle_detail_add_count(&cli, id, activity, *amount)
            }
            DetailCommands::AddItem { id, activity, text } => {
                entries::handle_detail_add_item(&cli, id, activity, text)
            }
            DetailCommands::SetItem {
                id,
                activity,
                index,
                text,
            } => entries::handle_detail_set_item(&cli, id, activity, *index, text),
            DetailCommands::RemoveItem { id, activity, index } => {
                entries::handle_detail_remove_item(&cli, id, activity, *index)
            }
            DetailCommands::Clear { id, activity } => {
                entries::handle_detail_clear(&cli, id, activity)
            }
        },
        Commands::Mood(mood) => match mood {
            MoodCommands::Add {
                name,
                emoji,
                rating,
            } => catalog::handle_mood_add(&cli, name, emoji, *rating),
            MoodCommands::List => catalog::handle_mood_list(&cli),
        },
        Commands::Activity(activity) => match activity {
            ActivityCommands::Add {
                name,
                emoji,
                category,
            } => catalog::handle_activity_add(&cli, name, emoji, category.clone()),
            ActivityCommands::List { all } => catalog::handle_activity_list(&cli, *all),
            ActivityCommands::Archive { id } => catalog::handle_activity_archive(&cli, id, true),
            ActivityCommands::Restore { id } => catalog::handle_activity_archive(&cli, id, false),
        },
        Commands::Note(note) => match note {
            NoteCommands::Add { content, date } => {
                catalog::handle_note_add(&cli, content, date.as_deref())
            }
            NoteCommands::List { path } => catalog::handle_note_list(&cli, path.as_deref()),
        },
        Commands::Stats {
            activity,
            top,
            exclude,
            json,
        } => stats::handle_stats(&cli, activity.as_deref(), *top, exclude, *json),
        Commands::Export { file } => transfer::handle_export(&cli, file),
        Commands::Import { file } => transfer::handle_import(&cli, file),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
