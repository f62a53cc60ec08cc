use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use drive_core::format::{file_kind, format_file_size, relative_time, truncate_name};
use drive_core::{
    filter_counts, BatchId, Msg, SearchPhase, UploadSource, UploadStatus, UserPreferences,
    SEARCH_DEBOUNCE,
};
use drive_engine::{
    AiAnswer, AtomicFileWriter, CancellationToken, DriveGateway, EngineHandle, GatewaySettings,
    ProgressSink, RemoteFile, ReqwestGateway, UploadRequest,
};
use drive_logging::drive_info;

use super::effects::{map_file, EffectRunner};
use super::persistence;
use super::session::Session;
use crate::cli::{
    ActivityCommand, AiCommand, BulkArgs, Cli, Command, LsArgs, SettingsArgs, SettingsCommand,
    ShareCommand, StarCommand, TagsCommand, TrashCommand, VersionsCommand,
};

const NAME_WIDTH: usize = 40;

pub(crate) fn run(cli: Cli) -> Result<()> {
    let settings = GatewaySettings {
        base_url: cli.api_url.clone(),
        request_timeout: Duration::from_secs(cli.timeout_secs),
        ..GatewaySettings::default()
    };
    let gateway = Arc::new(
        ReqwestGateway::new(settings.clone())
            .with_context(|| format!("cannot use API url {}", cli.api_url))?,
    );
    drive_info!("drive: {:?} against {}", cli.command, settings.base_url);
    let wait = settings.request_timeout * 2;

    match cli.command {
        Command::Ls(args) => list(session(&gateway), args, wait),
        Command::Upload { files, folder } => {
            upload(session(&gateway), files, folder, wait, settings.upload_timeout)
        }
        Command::Search { query } => search(session(&gateway), query, wait),
        Command::Bulk(args) => bulk(session(&gateway), args, wait),
        Command::Mkdir { name, parent } => {
            let mut session = session(&gateway);
            open_folder(&mut session, parent, wait)?;
            session.dispatch(Msg::CreateFolderSubmitted { name });
            finish_mutation(session, wait)
        }
        Command::Rename { item, name, folder } => {
            let mut session = session(&gateway);
            open_folder(&mut session, folder, wait)?;
            session.dispatch(Msg::RenameSubmitted { item, name });
            finish_mutation(session, wait)
        }
        Command::Trash(command) => trash(&gateway, command),
        Command::Star(command) => star(&gateway, command),
        Command::Share(command) => share(&gateway, command),
        Command::Versions(command) => versions(&gateway, command),
        Command::Ai(command) => ai(&gateway, command),
        Command::Tags(command) => tags(&gateway, command),
        Command::Folders => {
            for folder in block_on(gateway.all_folders())?? {
                println!(
                    "{}  folder:{}",
                    folder.path.unwrap_or(folder.name),
                    folder.id
                );
            }
            Ok(())
        }
        Command::Analytics => analytics(&gateway),
        Command::Recent { limit } => {
            let files = block_on(gateway.recent(limit))??;
            print_files(&files);
            Ok(())
        }
        Command::Preview { id } => {
            let preview = block_on(gateway.preview(&id))??;
            println!("type: {}", preview.kind);
            if let Some(url) = preview.url {
                println!("url: {url}");
            }
            if let Some(language) = preview.language {
                println!("language: {language}");
            }
            if let Some(content) = preview.content {
                println!("{content}");
            }
            Ok(())
        }
        Command::Settings(command) => settings_command(session(&gateway), command),
        Command::Activity(command) => activity(session(&gateway), command),
    }
}

fn session(gateway: &Arc<ReqwestGateway>) -> Session {
    let engine = EngineHandle::new(gateway.clone());
    Session::start(EffectRunner::new(engine, persistence::settings_dir()))
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    Ok(runtime.block_on(future))
}

fn open_folder(session: &mut Session, folder: Option<String>, wait: Duration) -> Result<()> {
    session.dispatch(Msg::Navigate { folder });
    if !session.run_until(wait, |state| !state.view().loading) {
        bail!("timed out loading the folder");
    }
    if let Some(err) = session.state().view().listing_error {
        bail!("could not load the folder: {err}");
    }
    Ok(())
}

fn list(mut session: Session, args: LsArgs, wait: Duration) -> Result<()> {
    session.dispatch(Msg::SortChanged(args.sort.into()));
    if args.reverse {
        session.dispatch(Msg::SortOrderToggled);
    }
    session.dispatch(Msg::FilterChanged(args.filter.into()));
    open_folder(&mut session, args.folder, wait)?;

    let view = session.state().view();
    let trail: Vec<&str> = view.breadcrumb.iter().map(String::as_str).collect();
    println!("/{}", trail.join("/"));

    let now = Utc::now();
    for folder in &view.folders {
        if args.long {
            println!(
                "{:>10}  {:<14}  {}/  folder:{}",
                "-",
                relative_time(folder.updated_at, now),
                folder.name,
                folder.id
            );
        } else {
            println!("{}/", folder.name);
        }
    }
    for file in &view.files {
        if args.long {
            println!(
                "{:>10}  {:<14}  {}  file:{}{}",
                format_file_size(file.size),
                relative_time(file.updated_at, now),
                truncate_name(&file.name, NAME_WIDTH),
                file.id,
                if file.starred { "  *" } else { "" }
            );
        } else {
            println!("{}", file.name);
        }
    }

    if args.long {
        if let Some(listing) = session.state().listing() {
            let counts: Vec<String> = filter_counts(&listing.files)
                .into_iter()
                .map(|(filter, count)| format!("{} {count}", filter.label()))
                .collect();
            println!("{}", counts.join(" | "));
        }
    }
    Ok(())
}

fn upload(
    mut session: Session,
    files: Vec<PathBuf>,
    folder: Option<String>,
    wait: Duration,
    upload_timeout: Duration,
) -> Result<()> {
    open_folder(&mut session, folder, wait)?;
    session.report_uploads(true);

    for path in files {
        let byte_len = match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                eprintln!("skipping {}: not a regular file", path.display());
                continue;
            }
            Err(err) => {
                eprintln!("skipping {}: {err}", path.display());
                continue;
            }
        };
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        session.dispatch(Msg::UploadRequested {
            display_name,
            source: UploadSource { path, byte_len },
        });
    }

    if !session.run_until(upload_timeout, |state| !state.uploads().has_active()) {
        bail!("uploads did not finish in time");
    }
    let failed = session
        .state()
        .uploads()
        .tasks()
        .filter(|task| task.status == UploadStatus::Error)
        .count();
    if failed > 0 {
        bail!("{failed} upload(s) failed");
    }
    Ok(())
}

fn search(mut session: Session, query: String, wait: Duration) -> Result<()> {
    session.dispatch(Msg::SearchInputChanged(query));
    let settled = session.run_until(wait + SEARCH_DEBOUNCE, |state| !state.search().is_pending());
    if !settled {
        bail!("search timed out");
    }

    let search = session.state().search();
    match search.phase() {
        SearchPhase::Idle => println!("empty query"),
        SearchPhase::Failed => bail!("search failed"),
        _ => {
            let Some(hits) = search.results() else {
                return Ok(());
            };
            for folder in &hits.folders {
                println!("{}/  folder:{}", folder.name, folder.id);
            }
            for file in &hits.files {
                println!(
                    "{}  file:{}  {}",
                    file.name,
                    file.id,
                    file_kind(&file.extension, &file.mime_type)
                );
            }
            if hits.files.is_empty() && hits.folders.is_empty() {
                println!("no matches");
            }
        }
    }
    Ok(())
}

fn bulk(mut session: Session, args: BulkArgs, wait: Duration) -> Result<()> {
    open_folder(&mut session, args.folder.clone(), wait)?;
    session.runner_mut().set_download_dir(args.dest.clone());

    if args.all {
        session.dispatch(Msg::SelectAllClicked);
    } else {
        for item in &args.items {
            if !session.state().selection().contains(item) {
                session.dispatch(Msg::SelectionToggled(item.clone()));
            }
        }
    }
    if session.state().selection().is_empty() {
        bail!("nothing selected");
    }

    let previous = last_batch(&session);
    session.dispatch(Msg::BulkRequested(args.operation()));
    if !session.run_until(wait, |state| {
        state.view().last_bulk_report.map(|report| report.batch_id) != previous
    }) {
        bail!("bulk operation timed out");
    }

    let Some(report) = session.state().view().last_bulk_report else {
        return Ok(());
    };
    println!("{}", report.summary());
    if report.succeeded.is_empty() {
        bail!("every item failed");
    }
    Ok(())
}

fn last_batch(session: &Session) -> Option<BatchId> {
    session
        .state()
        .view()
        .last_bulk_report
        .map(|report| report.batch_id)
}

fn finish_mutation(mut session: Session, wait: Duration) -> Result<()> {
    if !session.run_until(wait, |state| state.view().mutations_in_flight == 0) {
        bail!("request timed out");
    }
    match session.state().view().last_mutation {
        Some(outcome) => match outcome.result {
            Ok(()) => Ok(()),
            Err(message) => bail!(message),
        },
        None => Ok(()),
    }
}

fn trash(gateway: &ReqwestGateway, command: TrashCommand) -> Result<()> {
    match command {
        TrashCommand::List => {
            let files = block_on(gateway.trash())??;
            for file in files {
                let remaining = file
                    .days_remaining
                    .map(|days| format!("{days} day(s) left"))
                    .unwrap_or_default();
                println!("{}  file:{}  {remaining}", file.original_name, file.id);
            }
        }
        TrashCommand::Put { id } => block_on(gateway.move_to_trash(&id))??,
        TrashCommand::Restore { id } => block_on(gateway.restore_from_trash(&id))??,
        TrashCommand::Purge { id } => block_on(gateway.delete_permanently(&id))??,
        TrashCommand::Empty => block_on(gateway.empty_trash())??,
    }
    Ok(())
}

fn star(gateway: &ReqwestGateway, command: StarCommand) -> Result<()> {
    match command {
        StarCommand::List => print_files(&block_on(gateway.starred())??),
        StarCommand::Toggle { id } => block_on(gateway.toggle_star(&id))??,
    }
    Ok(())
}

fn share(gateway: &ReqwestGateway, command: ShareCommand) -> Result<()> {
    match command {
        ShareCommand::Enable { id } => {
            let status = block_on(gateway.enable_share(&id))??;
            if let Some(url) = status.full_url.or(status.share_link) {
                println!("{url}");
            }
        }
        ShareCommand::Disable { id } => block_on(gateway.disable_share(&id))??,
        ShareCommand::Status { id } => {
            let status = block_on(gateway.share_status(&id))??;
            match (status.is_shared, status.full_url) {
                (true, Some(url)) => println!("shared: {url}"),
                (true, None) => println!("shared"),
                (false, _) => println!("not shared"),
            }
        }
        ShareCommand::Open { link } => {
            let file = block_on(gateway.shared_file(&link))??;
            println!(
                "{}  {}  {}",
                file.file_name,
                format_file_size(file.size),
                file.mime_type
            );
            if let Some(url) = file.download_url {
                println!("{url}");
            }
        }
    }
    Ok(())
}

/// Prints whole-percent progress to stderr.
struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn progress(&self, sent: u64, total: u64) {
        let percent = if total == 0 { 100 } else { sent * 100 / total };
        eprint!("\r{percent:>3}%");
        let _ = std::io::stderr().flush();
    }
}

fn versions(gateway: &ReqwestGateway, command: VersionsCommand) -> Result<()> {
    match command {
        VersionsCommand::List { id } => {
            let now = Utc::now();
            for version in block_on(gateway.versions(&id))?? {
                println!(
                    "v{}  {:>10}  {}{}",
                    version.version_number,
                    format_file_size(version.size),
                    version
                        .created_at
                        .map(|at| relative_time(at, now))
                        .unwrap_or_default(),
                    if version.is_current { "  (current)" } else { "" }
                );
            }
        }
        VersionsCommand::Upload { id, file } => {
            let request = UploadRequest::from_path(file, None);
            let cancel = CancellationToken::new();
            block_on(gateway.upload_version(&id, &request, Arc::new(TerminalProgress), &cancel))??;
            eprintln!();
        }
        VersionsCommand::Download { id, version, out } => {
            let bytes = block_on(gateway.download_version(&id, version))??;
            let dir = out
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), PathBuf::from);
            let name = out
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .context("output path has no file name")?;
            let written = AtomicFileWriter::new(dir).write_bytes(&name, &bytes)?;
            println!("{}", written.display());
        }
        VersionsCommand::Restore { id, version } => {
            block_on(gateway.restore_version(&id, version))??
        }
    }
    Ok(())
}

fn ai(gateway: &ReqwestGateway, command: AiCommand) -> Result<()> {
    match command {
        AiCommand::Ask {
            file_path,
            question,
            file_id,
        } => {
            let answer = block_on(gateway.ask(&file_path, &question, file_id.as_deref()))??;
            print_answer(&answer);
        }
        AiCommand::AskMulti { question, files } => {
            let answer = block_on(gateway.ask_multi(&files, &question))??;
            print_answer(&answer);
        }
        AiCommand::Summarize { file_path, file_id } => {
            println!("{}", block_on(gateway.summarize(&file_path, file_id.as_deref()))??);
        }
        AiCommand::AutoTag {
            file_path,
            file_id,
            max_tags,
        } => {
            let tags = block_on(gateway.auto_tag(&file_path, file_id.as_deref(), max_tags))??;
            println!("{}", tags.tags.join(", "));
        }
        AiCommand::Generate {
            file_path,
            doc_type,
            file_id,
        } => {
            let document = block_on(gateway.generate_document(
                &file_path,
                doc_type.wire_name(),
                file_id.as_deref(),
            ))??;
            println!("{}", document.content);
        }
        AiCommand::Health => {
            if block_on(gateway.ai_available())? {
                println!("available");
            } else {
                bail!("AI service unavailable");
            }
        }
    }
    Ok(())
}

fn print_answer(answer: &AiAnswer) {
    println!("{}", answer.answer);
    for (index, source) in answer.sources.iter().enumerate() {
        println!("  [{}] {}", index + 1, source.text);
    }
}

fn tags(gateway: &ReqwestGateway, command: TagsCommand) -> Result<()> {
    match command {
        TagsCommand::List => {
            for tag in block_on(gateway.tags())?? {
                println!("{}  ({})", tag.name, tag.count);
            }
        }
        TagsCommand::Files { tag } => print_files(&block_on(gateway.files_by_tag(&tag))??),
        TagsCommand::Set { id, tags } => block_on(gateway.set_tags(&id, &tags))??,
    }
    Ok(())
}

fn analytics(gateway: &ReqwestGateway) -> Result<()> {
    let stats = block_on(gateway.analytics())??;
    println!(
        "storage: {} of {} ({:.1}%)",
        format_file_size(stats.total_storage),
        format_file_size(stats.storage_limit),
        stats.storage_used_percent
    );
    println!(
        "files: {}  starred: {}  in trash: {}  uploaded this week: {}",
        stats.total_files, stats.starred_count, stats.trash_count, stats.recent_uploads
    );
    for (kind, usage) in &stats.type_breakdown {
        println!(
            "  {kind:<12} {:>5} file(s)  {:>10}",
            usage.count,
            format_file_size(usage.size)
        );
    }
    if !stats.largest_files.is_empty() {
        println!("largest:");
        for file in &stats.largest_files {
            println!("  {:>10}  {}", format_file_size(file.size), file.original_name);
        }
    }
    Ok(())
}

fn print_files(files: &[RemoteFile]) {
    let now = Utc::now();
    for file in files.iter().cloned().map(map_file) {
        println!(
            "{:>10}  {:<14}  {}  file:{}",
            format_file_size(file.size),
            relative_time(file.updated_at, now),
            truncate_name(&file.name, NAME_WIDTH),
            file.id
        );
    }
}

fn settings_command(mut session: Session, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => print_preferences(session.state().preferences()),
        SettingsCommand::Set(args) => {
            let updated = apply_settings(session.state().preferences().clone(), &args);
            session.dispatch(Msg::PreferencesChanged(updated));
            print_preferences(session.state().preferences());
        }
    }
    Ok(())
}

fn apply_settings(mut prefs: UserPreferences, args: &SettingsArgs) -> UserPreferences {
    if let Some(theme) = args.theme {
        prefs.theme = theme.into();
    }
    if let Some(view) = args.view {
        prefs.default_view = view.into();
    }
    if let Some(value) = args.notifications {
        prefs.notifications = value;
    }
    if let Some(value) = args.auto_delete_trash {
        prefs.auto_delete_trash = value;
    }
    if let Some(days) = args.trash_retention_days {
        prefs.trash_retention_days = days;
    }
    if let Some(value) = args.confirm_before_delete {
        prefs.confirm_before_delete = value;
    }
    if let Some(value) = args.show_hidden_files {
        prefs.show_hidden_files = value;
    }
    if let Some(value) = args.compact_mode {
        prefs.compact_mode = value;
    }
    if let Some(value) = args.auto_clear_uploads {
        prefs.auto_clear_uploads = value;
    }
    prefs
}

fn print_preferences(prefs: &UserPreferences) {
    println!("theme: {:?}", prefs.theme);
    println!("default view: {:?}", prefs.default_view);
    println!("notifications: {}", prefs.notifications);
    println!("auto delete trash: {}", prefs.auto_delete_trash);
    println!("trash retention days: {}", prefs.trash_retention_days);
    println!("confirm before delete: {}", prefs.confirm_before_delete);
    println!("show hidden files: {}", prefs.show_hidden_files);
    println!("compact mode: {}", prefs.compact_mode);
    println!("auto clear uploads: {}", prefs.auto_clear_uploads);
}

fn activity(mut session: Session, command: ActivityCommand) -> Result<()> {
    match command {
        ActivityCommand::Show => {
            let now = Utc::now();
            for entry in session.state().activity().entries() {
                println!(
                    "{:<14}  {:<8}  {}{}",
                    relative_time(entry.at, now),
                    entry.kind.as_str(),
                    entry.action,
                    entry
                        .file_name
                        .as_deref()
                        .map(|name| format!(" \"{name}\""))
                        .unwrap_or_default()
                );
            }
        }
        ActivityCommand::Clear => {
            session.dispatch(Msg::ClearActivity);
            println!("activity cleared");
        }
    }
    Ok(())
}
