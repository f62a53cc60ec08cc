use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use drive_core::{BulkOperation, FileFilter, ItemRef, SortKey, Theme, ViewMode};

#[derive(Debug, Parser)]
#[command(name = "drive", version, about = "Command-line client for the drive service")]
pub struct Cli {
    /// Base URL of the REST API.
    #[arg(
        long,
        env = "DRIVE_API_URL",
        default_value = "http://localhost:5000/api",
        global = true
    )]
    pub api_url: String,

    /// Total timeout for ordinary requests, in seconds.
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub timeout_secs: u64,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogTarget::File, global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List a folder (the root when no id is given).
    Ls(LsArgs),
    /// Upload local files into a folder.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Search files and folders by name.
    Search { query: String },
    /// Apply one operation to several items of a folder.
    Bulk(BulkArgs),
    /// Create a folder.
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename a file or folder, given as `file:ID` or `folder:ID`.
    Rename {
        #[arg(value_parser = parse_item)]
        item: ItemRef,
        name: String,
        /// Folder the item lives in; refreshed afterwards.
        #[arg(long)]
        folder: Option<String>,
    },
    #[command(subcommand)]
    Trash(TrashCommand),
    #[command(subcommand)]
    Star(StarCommand),
    #[command(subcommand)]
    Share(ShareCommand),
    #[command(subcommand)]
    Versions(VersionsCommand),
    #[command(subcommand)]
    Ai(AiCommand),
    #[command(subcommand)]
    Tags(TagsCommand),
    /// Every folder with its id, for choosing a move target.
    Folders,
    /// Storage usage summary.
    Analytics,
    /// Recently modified files.
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Preview metadata for a file.
    Preview { id: String },
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Activity(ActivityCommand),
}

#[derive(Debug, Args)]
pub struct LsArgs {
    pub folder: Option<String>,
    #[arg(long, value_enum, default_value_t = SortArg::Name)]
    pub sort: SortArg,
    /// Flip the sort key's default order.
    #[arg(long)]
    pub reverse: bool,
    #[arg(long, value_enum, default_value_t = FilterArg::All)]
    pub filter: FilterArg,
    /// One row per item with size and date.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    #[arg(value_enum)]
    pub operation: BulkArg,
    /// Items as `file:ID` or `folder:ID`.
    #[arg(value_parser = parse_item, required_unless_present = "all")]
    pub items: Vec<ItemRef>,
    /// Select every item of the folder.
    #[arg(long)]
    pub all: bool,
    /// Folder whose items are addressed (root when omitted).
    #[arg(long)]
    pub folder: Option<String>,
    /// Destination folder id for `move`; root when omitted.
    #[arg(long)]
    pub target: Option<String>,
    /// Local directory for `download`.
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Date,
    Size,
    Type,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortKey::Name,
            SortArg::Date => SortKey::Date,
            SortArg::Size => SortKey::Size,
            SortArg::Type => SortKey::Type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    All,
    Images,
    Documents,
    Videos,
    Audio,
    Archives,
}

impl From<FilterArg> for FileFilter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::All => FileFilter::All,
            FilterArg::Images => FileFilter::Images,
            FilterArg::Documents => FileFilter::Documents,
            FilterArg::Videos => FileFilter::Videos,
            FilterArg::Audio => FileFilter::Audio,
            FilterArg::Archives => FileFilter::Archives,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BulkArg {
    Download,
    Trash,
    Delete,
    Star,
    Move,
}

impl BulkArgs {
    pub fn operation(&self) -> BulkOperation {
        match self.operation {
            BulkArg::Download => BulkOperation::Download,
            BulkArg::Trash => BulkOperation::Trash,
            BulkArg::Delete => BulkOperation::Delete,
            BulkArg::Star => BulkOperation::Star,
            BulkArg::Move => BulkOperation::Move {
                target: self.target.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum TrashCommand {
    /// Files in the trash with their remaining retention.
    List,
    /// Move a file to the trash.
    Put { id: String },
    Restore { id: String },
    /// Delete one trashed file for good.
    Purge { id: String },
    /// Delete everything in the trash for good.
    Empty,
}

#[derive(Debug, Subcommand)]
pub enum StarCommand {
    List,
    Toggle { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    Enable { id: String },
    Disable { id: String },
    Status { id: String },
    /// Resolve a public share link.
    Open { link: String },
}

#[derive(Debug, Subcommand)]
pub enum VersionsCommand {
    List {
        id: String,
    },
    /// Upload a local file as the next version.
    Upload {
        id: String,
        file: PathBuf,
    },
    Download {
        id: String,
        version: u32,
        #[arg(long)]
        out: PathBuf,
    },
    Restore {
        id: String,
        version: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum AiCommand {
    /// Ask a question about one file.
    Ask {
        file_path: String,
        question: String,
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Ask one question across several files.
    AskMulti {
        question: String,
        #[arg(long = "file", required = true)]
        files: Vec<String>,
    },
    Summarize {
        file_path: String,
        #[arg(long)]
        file_id: Option<String>,
    },
    AutoTag {
        file_path: String,
        #[arg(long)]
        file_id: Option<String>,
        #[arg(long, default_value_t = 5)]
        max_tags: u32,
    },
    Generate {
        file_path: String,
        #[arg(value_enum)]
        doc_type: DocTypeArg,
        #[arg(long)]
        file_id: Option<String>,
    },
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocTypeArg {
    Summary,
    Report,
    Outline,
    KeyPoints,
}

impl DocTypeArg {
    pub fn wire_name(self) -> &'static str {
        match self {
            DocTypeArg::Summary => "summary",
            DocTypeArg::Report => "report",
            DocTypeArg::Outline => "outline",
            DocTypeArg::KeyPoints => "key_points",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    List,
    Files { tag: String },
    /// Replace a file's tags.
    Set { id: String, tags: Vec<String> },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(long, value_enum)]
    pub theme: Option<ThemeArg>,
    #[arg(long, value_enum)]
    pub view: Option<ViewArg>,
    #[arg(long)]
    pub notifications: Option<bool>,
    #[arg(long)]
    pub auto_delete_trash: Option<bool>,
    #[arg(long)]
    pub trash_retention_days: Option<u32>,
    #[arg(long)]
    pub confirm_before_delete: Option<bool>,
    #[arg(long)]
    pub show_hidden_files: Option<bool>,
    #[arg(long)]
    pub compact_mode: Option<bool>,
    #[arg(long)]
    pub auto_clear_uploads: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Grid,
    List,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Grid => ViewMode::Grid,
            ViewArg::List => ViewMode::List,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    Show,
    Clear,
}

/// Parses `file:ID` or `folder:ID`.
pub fn parse_item(raw: &str) -> Result<ItemRef, String> {
    match raw.split_once(':') {
        Some(("file", id)) if !id.is_empty() => Ok(ItemRef::File(id.to_string())),
        Some(("folder", id)) if !id.is_empty() => Ok(ItemRef::Folder(id.to_string())),
        _ => Err(format!("expected file:ID or folder:ID, got {raw:?}")),
    }
}
