use std::cmp::Ordering;

use crate::{FileEntry, FolderEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
    Type,
}

impl SortKey {
    /// Date sorts most recent first unless told otherwise.
    pub fn default_order(self) -> SortOrder {
        match self {
            SortKey::Date => SortOrder::Descending,
            SortKey::Name | SortKey::Size | SortKey::Type => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FileFilter {
    #[default]
    All,
    Images,
    Documents,
    Videos,
    Audio,
    Archives,
}

impl FileFilter {
    pub const ALL: [FileFilter; 6] = [
        FileFilter::All,
        FileFilter::Images,
        FileFilter::Documents,
        FileFilter::Videos,
        FileFilter::Audio,
        FileFilter::Archives,
    ];

    fn mime_prefixes(self) -> &'static [&'static str] {
        match self {
            FileFilter::All => &[],
            FileFilter::Images => &["image/"],
            FileFilter::Documents => &[
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats",
                "text/",
            ],
            FileFilter::Videos => &["video/"],
            FileFilter::Audio => &["audio/"],
            FileFilter::Archives => &["application/zip", "application/x-rar", "application/x-7z"],
        }
    }

    pub fn matches(self, file: &FileEntry) -> bool {
        self == FileFilter::All
            || self
                .mime_prefixes()
                .iter()
                .any(|prefix| file.mime_type.starts_with(prefix))
    }

    pub fn label(self) -> &'static str {
        match self {
            FileFilter::All => "All Files",
            FileFilter::Images => "Images",
            FileFilter::Documents => "Documents",
            FileFilter::Videos => "Videos",
            FileFilter::Audio => "Audio",
            FileFilter::Archives => "Archives",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub filter: FileFilter,
}

impl ViewOptions {
    /// Switches the sort key and resets the order to that key's default.
    pub fn sorted_by(self, key: SortKey) -> Self {
        Self {
            sort_by: key,
            sort_order: key.default_order(),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

/// Orders and filters a listing. Pure; ties keep input order.
pub fn project(folders: &[FolderEntry], files: &[FileEntry], options: &ViewOptions) -> Projection {
    let mut folders = folders.to_vec();
    folders.sort_by(|a, b| directed(compare_folders(a, b, options.sort_by), options.sort_order));

    let mut files: Vec<FileEntry> = files
        .iter()
        .filter(|file| options.filter.matches(file))
        .cloned()
        .collect();
    files.sort_by(|a, b| directed(compare_files(a, b, options.sort_by), options.sort_order));

    Projection { folders, files }
}

/// Number of files each filter would keep.
pub fn filter_counts(files: &[FileEntry]) -> Vec<(FileFilter, usize)> {
    FileFilter::ALL
        .iter()
        .map(|filter| (*filter, files.iter().filter(|f| filter.matches(f)).count()))
        .collect()
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_files(a: &FileEntry, b: &FileEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => compare_names(&a.name, &b.name),
        SortKey::Date => a.updated_at.cmp(&b.updated_at),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Type => a.mime_type.cmp(&b.mime_type),
    }
}

fn compare_folders(a: &FolderEntry, b: &FolderEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => compare_names(&a.name, &b.name),
        SortKey::Date => a.updated_at.cmp(&b.updated_at),
        // Folders carry no size or MIME type.
        SortKey::Size | SortKey::Type => Ordering::Equal,
    }
}
