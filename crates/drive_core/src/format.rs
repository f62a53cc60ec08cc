//! Display helpers shared by front ends.

use chrono::{DateTime, Utc};

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human readable size with base 1024, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Shortens `name` to `max_len` characters, keeping the extension.
pub fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    let ext_start = chars
        .iter()
        .rposition(|c| *c == '.')
        .filter(|pos| *pos > 0)
        .unwrap_or(chars.len());
    let extension: String = chars[ext_start..].iter().collect();
    let keep = max_len
        .saturating_sub(extension.chars().count())
        .saturating_sub(3)
        .min(ext_start);
    let stem: String = chars[..keep].iter().collect();
    format!("{stem}...{extension}")
}

/// Icon class for a file, by extension first and MIME type second.
pub fn file_kind(extension: &str, mime_type: &str) -> &'static str {
    let ext = extension.to_ascii_lowercase();
    let by_ext = match ext.as_str() {
        ".jpg" | ".jpeg" | ".png" | ".gif" | ".webp" | ".svg" | ".bmp" => Some("image"),
        ".mp4" | ".avi" | ".mov" | ".mkv" | ".webm" | ".flv" => Some("video"),
        ".mp3" | ".wav" | ".ogg" | ".flac" | ".aac" | ".m4a" => Some("audio"),
        ".pdf" => Some("pdf"),
        ".doc" | ".docx" | ".odt" | ".rtf" => Some("document"),
        ".xls" | ".xlsx" | ".csv" | ".ods" => Some("spreadsheet"),
        ".ppt" | ".pptx" | ".odp" => Some("presentation"),
        ".js" | ".jsx" | ".ts" | ".tsx" | ".py" | ".java" | ".cpp" | ".c" | ".html" | ".css"
        | ".json" | ".xml" | ".yaml" | ".yml" => Some("code"),
        ".txt" | ".md" | ".log" => Some("text"),
        ".zip" | ".rar" | ".7z" | ".tar" | ".gz" | ".bz2" => Some("archive"),
        _ => None,
    };
    if let Some(kind) = by_ext {
        return kind;
    }

    let mime = mime_type;
    if mime.starts_with("image/") {
        "image"
    } else if mime.starts_with("video/") {
        "video"
    } else if mime.starts_with("audio/") {
        "audio"
    } else if mime == "application/pdf" {
        "pdf"
    } else if mime.contains("word") || mime.contains("document") {
        "document"
    } else if mime.contains("sheet") || mime.contains("excel") {
        "spreadsheet"
    } else if mime.contains("presentation") || mime.contains("powerpoint") {
        "presentation"
    } else if mime.starts_with("text/") {
        "text"
    } else if mime.contains("zip") || mime.contains("archive") || mime.contains("compressed") {
        "archive"
    } else {
        "file"
    }
}

/// Coarse relative time: minutes and hours within a day, days within a week,
/// otherwise the calendar date.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(then);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if hours < 24 {
        if hours < 1 {
            if minutes < 1 {
                return "Just now".to_string();
            }
            return plural(minutes, "minute");
        }
        return plural(hours, "hour");
    }
    if days < 7 {
        return plural(days, "day");
    }
    then.format("%b %-d, %Y").to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}
