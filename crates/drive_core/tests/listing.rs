use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use drive_core::{
    filter_counts, project, update, AppState, FileEntry, FileFilter, FolderEntry, Listing, Msg,
    SortKey, SortOrder, ViewOptions,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(drive_logging::initialize_for_tests);
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()
}

fn file(name: &str, mime: &str, size: u64, updated: u32) -> FileEntry {
    FileEntry {
        id: name.to_string(),
        name: name.to_string(),
        mime_type: mime.to_string(),
        extension: String::new(),
        size,
        updated_at: day(updated),
        starred: false,
        tags: Vec::new(),
        folder: None,
        path: None,
    }
}

fn folder(name: &str, updated: u32) -> FolderEntry {
    FolderEntry {
        id: name.to_string(),
        name: name.to_string(),
        parent: None,
        updated_at: day(updated),
    }
}

fn names(files: &[FileEntry]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}

fn sample_files() -> Vec<FileEntry> {
    vec![
        file("beta.png", "image/png", 300, 2),
        file("Alpha.pdf", "application/pdf", 100, 5),
        file("alpha.pdf", "application/pdf", 100, 1),
        file("clip.mp4", "video/mp4", 900, 3),
    ]
}

#[test]
fn name_sort_is_case_aware() {
    let projection = project(&[], &sample_files(), &ViewOptions::default());
    assert_eq!(
        names(&projection.files),
        vec!["Alpha.pdf", "alpha.pdf", "beta.png", "clip.mp4"]
    );
}

#[test]
fn date_defaults_to_most_recent_first() {
    let options = ViewOptions::default().sorted_by(SortKey::Date);
    assert_eq!(options.sort_order, SortOrder::Descending);
    let projection = project(&[], &sample_files(), &options);
    assert_eq!(
        names(&projection.files),
        vec!["Alpha.pdf", "clip.mp4", "beta.png", "alpha.pdf"]
    );

    let options = options.sorted_by(SortKey::Size);
    assert_eq!(options.sort_order, SortOrder::Ascending);
}

#[test]
fn size_ties_keep_insertion_order_and_folders_compare_equal() {
    let options = ViewOptions::default().sorted_by(SortKey::Size);
    let folders = vec![folder("zeta", 1), folder("alpha", 2)];
    let projection = project(&folders, &sample_files(), &options);

    assert_eq!(
        names(&projection.files),
        vec!["Alpha.pdf", "alpha.pdf", "beta.png", "clip.mp4"]
    );
    let folder_names: Vec<&str> = projection.folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(folder_names, vec!["zeta", "alpha"]);

    let descending = ViewOptions {
        sort_order: SortOrder::Descending,
        ..options
    };
    let projection = project(&folders, &sample_files(), &descending);
    assert_eq!(
        names(&projection.files),
        vec!["clip.mp4", "beta.png", "Alpha.pdf", "alpha.pdf"]
    );
}

#[test]
fn type_sort_orders_by_mime() {
    let options = ViewOptions::default().sorted_by(SortKey::Type);
    let projection = project(&[], &sample_files(), &options);
    assert_eq!(
        names(&projection.files),
        vec!["Alpha.pdf", "alpha.pdf", "beta.png", "clip.mp4"]
    );
}

#[test]
fn filters_apply_to_files_only() {
    let options = ViewOptions {
        filter: FileFilter::Documents,
        ..ViewOptions::default()
    };
    let folders = vec![folder("docs", 1)];
    let projection = project(&folders, &sample_files(), &options);
    assert_eq!(names(&projection.files), vec!["Alpha.pdf", "alpha.pdf"]);
    assert_eq!(projection.folders.len(), 1);

    let counts = filter_counts(&sample_files());
    assert_eq!(
        counts,
        vec![
            (FileFilter::All, 4),
            (FileFilter::Images, 1),
            (FileFilter::Documents, 2),
            (FileFilter::Videos, 1),
            (FileFilter::Audio, 0),
            (FileFilter::Archives, 0),
        ]
    );
}

#[test]
fn projection_is_pure() {
    let files = sample_files();
    let options = ViewOptions::default().sorted_by(SortKey::Date);
    assert_eq!(project(&[], &files, &options), project(&[], &files, &options));
    assert_eq!(files, sample_files());
}

#[test]
fn view_reflects_sort_and_filter_messages() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::Navigate { folder: None });
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 1,
            folder: None,
            result: Ok(Listing {
                files: sample_files(),
                ..Listing::default()
            }),
        },
    );
    let (state, _) = update(state, Msg::SortChanged(SortKey::Size));
    let (state, _) = update(state, Msg::SortOrderToggled);
    let (state, _) = update(state, Msg::FilterChanged(FileFilter::Images));

    let view = state.view();
    assert!(!view.loading);
    assert_eq!(names(&view.files), vec!["beta.png"]);
    assert_eq!(view.view_options.sort_order, SortOrder::Descending);
}

#[test]
fn listing_for_a_folder_we_left_is_dropped() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::Navigate {
            folder: Some("a".to_string()),
        },
    );
    let (state, _) = update(
        state,
        Msg::Navigate {
            folder: Some("b".to_string()),
        },
    );
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 1,
            folder: Some("a".to_string()),
            result: Ok(Listing {
                files: sample_files(),
                ..Listing::default()
            }),
        },
    );
    assert!(state.listing().is_none());
    assert!(state.view().loading);
}

#[test]
fn listing_failure_keeps_previous_contents() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::Navigate { folder: None });
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 1,
            folder: None,
            result: Ok(Listing {
                files: sample_files(),
                ..Listing::default()
            }),
        },
    );
    let (state, _) = update(state, Msg::Refresh);
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 2,
            folder: None,
            result: Err("network error".to_string()),
        },
    );
    let view = state.view();
    assert_eq!(view.files.len(), 4);
    assert_eq!(view.listing_error.as_deref(), Some("network error"));
}

#[test]
fn older_reload_of_the_same_folder_is_dropped() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::Navigate { folder: None });
    let (state, _) = update(state, Msg::Refresh);
    let (state, _) = update(
        state,
        Msg::ListingLoaded {
            request_id: 2,
            folder: None,
            result: Ok(Listing::default()),
        },
    );
    assert!(!state.view().loading);

    let (state, effects) = update(
        state,
        Msg::ListingLoaded {
            request_id: 1,
            folder: None,
            result: Ok(Listing {
                files: sample_files(),
                ..Listing::default()
            }),
        },
    );
    assert!(effects.is_empty());
    assert!(state.view().files.is_empty());
}
