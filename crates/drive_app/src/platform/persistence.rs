use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use drive_core::{ActivityEntry, ActivityKind, Theme, UserPreferences, ViewMode};
use drive_engine::{ensure_dir, AtomicFileWriter};
use drive_logging::{drive_error, drive_info, drive_warn};
use serde::{Deserialize, Serialize};

const SETTINGS_FILENAME: &str = "settings.ron";
const APP_DIR: &str = "drive-client";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PersistedTheme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PersistedView {
    Grid,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PersistedPreferences {
    theme: PersistedTheme,
    default_view: PersistedView,
    notifications: bool,
    auto_delete_trash: bool,
    trash_retention_days: u32,
    confirm_before_delete: bool,
    show_hidden_files: bool,
    compact_mode: bool,
    auto_clear_uploads: bool,
}

impl Default for PersistedPreferences {
    fn default() -> Self {
        Self::from(&UserPreferences::default())
    }
}

impl From<&UserPreferences> for PersistedPreferences {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            theme: match prefs.theme {
                Theme::Light => PersistedTheme::Light,
                Theme::Dark => PersistedTheme::Dark,
            },
            default_view: match prefs.default_view {
                ViewMode::Grid => PersistedView::Grid,
                ViewMode::List => PersistedView::List,
            },
            notifications: prefs.notifications,
            auto_delete_trash: prefs.auto_delete_trash,
            trash_retention_days: prefs.trash_retention_days,
            confirm_before_delete: prefs.confirm_before_delete,
            show_hidden_files: prefs.show_hidden_files,
            compact_mode: prefs.compact_mode,
            auto_clear_uploads: prefs.auto_clear_uploads,
        }
    }
}

impl From<PersistedPreferences> for UserPreferences {
    fn from(prefs: PersistedPreferences) -> Self {
        Self {
            theme: match prefs.theme {
                PersistedTheme::Light => Theme::Light,
                PersistedTheme::Dark => Theme::Dark,
            },
            default_view: match prefs.default_view {
                PersistedView::Grid => ViewMode::Grid,
                PersistedView::List => ViewMode::List,
            },
            notifications: prefs.notifications,
            auto_delete_trash: prefs.auto_delete_trash,
            trash_retention_days: prefs.trash_retention_days,
            confirm_before_delete: prefs.confirm_before_delete,
            show_hidden_files: prefs.show_hidden_files,
            compact_mode: prefs.compact_mode,
            auto_clear_uploads: prefs.auto_clear_uploads,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PersistedActivity {
    kind: String,
    action: String,
    file_name: Option<String>,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedSettings {
    preferences: PersistedPreferences,
    activity: Vec<PersistedActivity>,
}

/// Platform config directory for this client, `./.drive-client` when unknown.
pub(crate) fn settings_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => PathBuf::from(".").join(format!(".{APP_DIR}")),
    }
}

/// Missing or unreadable settings fall back to defaults.
pub(crate) fn load_settings(dir: &Path) -> (UserPreferences, Vec<ActivityEntry>) {
    let path = dir.join(SETTINGS_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (UserPreferences::default(), Vec::new());
        }
        Err(err) => {
            drive_warn!("Failed to read settings from {:?}: {}", path, err);
            return (UserPreferences::default(), Vec::new());
        }
    };

    let settings: PersistedSettings = match ron::from_str(&content) {
        Ok(settings) => settings,
        Err(err) => {
            drive_warn!("Failed to parse settings from {:?}: {}", path, err);
            return (UserPreferences::default(), Vec::new());
        }
    };

    let activity = settings
        .activity
        .into_iter()
        .filter_map(|entry| match ActivityKind::parse(&entry.kind) {
            Some(kind) => Some(ActivityEntry {
                kind,
                action: entry.action,
                file_name: entry.file_name,
                at: entry.at,
            }),
            None => {
                drive_warn!("Skipping activity entry of unknown kind {:?}", entry.kind);
                None
            }
        })
        .collect();

    drive_info!("Loaded settings from {:?}", path);
    (settings.preferences.into(), activity)
}

pub(crate) fn save_settings(dir: &Path, preferences: &UserPreferences, activity: &[ActivityEntry]) {
    if let Err(err) = ensure_dir(dir) {
        drive_error!("Failed to ensure settings dir {:?}: {}", dir, err);
        return;
    }

    let settings = PersistedSettings {
        preferences: PersistedPreferences::from(preferences),
        activity: activity
            .iter()
            .map(|entry| PersistedActivity {
                kind: entry.kind.as_str().to_string(),
                action: entry.action.clone(),
                file_name: entry.file_name.clone(),
                at: entry.at,
            })
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&settings, pretty) {
        Ok(text) => text,
        Err(err) => {
            drive_error!("Failed to serialize settings: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(dir.to_path_buf());
    if let Err(err) = writer.write(SETTINGS_FILENAME, &content) {
        drive_error!("Failed to write settings to {:?}: {}", dir, err);
    }
}
