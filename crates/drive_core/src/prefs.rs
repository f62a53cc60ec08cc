use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::ViewMode;

pub const MAX_ACTIVITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// User settings. Loaded once at start-up and saved whenever they change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    pub theme: Theme,
    pub default_view: ViewMode,
    /// When false only error notifications are shown.
    pub notifications: bool,
    pub auto_delete_trash: bool,
    pub trash_retention_days: u32,
    pub confirm_before_delete: bool,
    pub show_hidden_files: bool,
    pub compact_mode: bool,
    /// Drop upload rows as soon as they complete.
    pub auto_clear_uploads: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            default_view: ViewMode::Grid,
            notifications: true,
            auto_delete_trash: true,
            trash_retention_days: 30,
            confirm_before_delete: true,
            show_hidden_files: false,
            compact_mode: false,
            auto_clear_uploads: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Upload,
    Download,
    Rename,
    Move,
    Trash,
    Delete,
    Star,
    Folder,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Upload => "upload",
            ActivityKind::Download => "download",
            ActivityKind::Rename => "rename",
            ActivityKind::Move => "move",
            ActivityKind::Trash => "trash",
            ActivityKind::Delete => "delete",
            ActivityKind::Star => "star",
            ActivityKind::Folder => "folder",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "upload" => ActivityKind::Upload,
            "download" => ActivityKind::Download,
            "rename" => ActivityKind::Rename,
            "move" => ActivityKind::Move,
            "trash" => ActivityKind::Trash,
            "delete" => ActivityKind::Delete,
            "star" => ActivityKind::Star,
            "folder" => ActivityKind::Folder,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub action: String,
    pub file_name: Option<String>,
    pub at: DateTime<Utc>,
}

/// Recent actions, newest first, capped at [`MAX_ACTIVITY`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores entries in newest-first order.
    pub fn from_entries(entries: Vec<ActivityEntry>) -> Self {
        let mut entries: VecDeque<ActivityEntry> = entries.into();
        entries.truncate(MAX_ACTIVITY);
        Self { entries }
    }

    pub fn record(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(MAX_ACTIVITY);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
