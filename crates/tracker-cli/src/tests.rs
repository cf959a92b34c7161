use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use tracker_core::cache::BootstrapCache;
use tracker_core::{Identity, Priority, Record, RecordDraft, RecordId};

use crate::cli::{parse_due_date, Cli, Commands, CompletionShell, PriorityArg};
use crate::commands::add::{build_draft, run_add, AddArgs};
use crate::commands::auth_cmd::{resolve_login_identity, run_login, run_logout};
use crate::commands::common::{format_record_line, resolve_record};
use crate::commands::completions::render_completions;
use crate::commands::edit::{EditArgs, RecordChanges};
use crate::commands::list::ListFilter;
use crate::commands::status::count_upcoming;
use crate::error::CliError;
use crate::identity_store::{clear_identity, load_identity, save_identity, DataPaths};
use crate::session::open_session;

fn record(id: &str, name: &str) -> Record {
    RecordDraft::new(name, "Apple", "Phone")
        .unwrap()
        .into_record(RecordId::parse(id).unwrap(), Utc::now())
}

fn temp_paths(dir: &tempfile::TempDir) -> DataPaths {
    DataPaths::resolve(Some(dir.path().to_path_buf()), None).unwrap()
}

#[test]
fn parse_add_with_all_fields() {
    let cli = Cli::try_parse_from([
        "tracker",
        "add",
        "iPhone 15 Pro",
        "--brand",
        "Apple",
        "--category",
        "Smartphone",
        "--priority",
        "urgent",
        "--due",
        "2025-03-10",
    ])
    .unwrap();

    let Some(Commands::Add {
        name,
        brand,
        priority,
        due,
        notes,
        ..
    }) = cli.command
    else {
        panic!("expected add command");
    };
    assert_eq!(name, "iPhone 15 Pro");
    assert_eq!(brand, "Apple");
    assert_eq!(priority, PriorityArg::Urgent);
    assert_eq!(due, NaiveDate::from_ymd_opt(2025, 3, 10));
    assert_eq!(notes, None);
}

#[test]
fn parse_add_defaults_to_medium_priority() {
    let cli =
        Cli::try_parse_from(["tracker", "add", "Roomba", "-b", "iRobot", "-c", "Robot"]).unwrap();
    let Some(Commands::Add { priority, .. }) = cli.command else {
        panic!("expected add command");
    };
    assert_eq!(Priority::from(priority), Priority::Medium);
}

#[test]
fn parse_edit_rejects_due_and_clear_due_together() {
    let result = Cli::try_parse_from([
        "tracker",
        "edit",
        "0190",
        "--due",
        "2025-03-10",
        "--clear-due",
    ]);
    assert!(result.is_err());
}

#[test]
fn parse_list_rejects_conflicting_filters() {
    assert!(Cli::try_parse_from(["tracker", "list", "--completed", "--pending"]).is_err());
    assert!(Cli::try_parse_from(["tracker", "ls", "--pending", "--json"]).is_ok());
}

#[test]
fn parse_login_requires_uid_or_anonymous() {
    assert!(Cli::try_parse_from(["tracker", "login"]).is_err());
    assert!(Cli::try_parse_from(["tracker", "login", "alice", "--anonymous"]).is_err());
    assert!(Cli::try_parse_from(["tracker", "login", "--anonymous"]).is_ok());
    assert!(Cli::try_parse_from(["tracker", "login", "alice"]).is_ok());
}

#[test]
fn parse_global_paths_after_subcommand() {
    let cli = Cli::try_parse_from(["tracker", "status", "--data-dir", "/tmp/tracker"]).unwrap();
    assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tracker")));
    assert!(matches!(cli.command, Some(Commands::Status)));
}

#[test]
fn parse_due_date_accepts_iso_days_only() {
    assert_eq!(
        parse_due_date(" 2025-12-31 "),
        Ok(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())
    );
    assert!(parse_due_date("31/12/2025").is_err());
    assert!(parse_due_date("2025-02-30").is_err());
}

#[test]
fn list_filter_from_flags() {
    let mut done = record("b", "done");
    done.completed = true;
    let todo = record("a", "todo");

    assert_eq!(ListFilter::from_flags(false, false), ListFilter::All);
    assert!(ListFilter::from_flags(true, false).matches(&done));
    assert!(!ListFilter::from_flags(true, false).matches(&todo));
    assert!(ListFilter::from_flags(false, true).matches(&todo));
    assert!(!ListFilter::from_flags(false, true).matches(&done));
}

#[test]
fn resolve_record_prefers_exact_then_unique_prefix() {
    let records = vec![
        record("0190-aaaa", "first"),
        record("0190-aaab", "second"),
        record("0190-b", "third"),
        record("0190-b2", "fourth"),
    ];

    assert_eq!(
        resolve_record(&records, "0190-b").unwrap().as_str(),
        "0190-b"
    );
    assert_eq!(
        resolve_record(&records, " 0190-aaab ").unwrap().as_str(),
        "0190-aaab"
    );
    assert!(matches!(
        resolve_record(&records, "0190-aa"),
        Err(CliError::AmbiguousRecordId(message)) if message.contains("first")
    ));
    assert!(matches!(
        resolve_record(&records, "ffff"),
        Err(CliError::RecordNotFound(query)) if query == "ffff"
    ));
    assert!(matches!(
        resolve_record(&records, "  "),
        Err(CliError::EmptyRecordId)
    ));
}

#[test]
fn format_record_line_shows_state_and_due_day() {
    let mut item = record("0190-a", "iPhone 15 Pro");
    item.priority = Priority::Urgent;
    let line = format_record_line(&item);
    assert!(line.starts_with("0190-a  [ ]  Urgent"));
    assert!(line.ends_with("iPhone 15 Pro - Apple (Phone)"));

    item.completed = true;
    item.due_date = Some(Utc::now());
    let line = format_record_line(&item);
    assert!(line.contains("[x]"));
    assert!(line.contains("  due "));
}

#[test]
fn upcoming_counts_pending_records_due_ahead() {
    let now = Utc::now();
    let mut ahead = record("a", "ahead");
    ahead.due_date = Some(now + Duration::days(3));
    let mut done = record("b", "done");
    done.due_date = Some(now + Duration::days(3));
    done.completed = true;
    let mut overdue = record("c", "overdue");
    overdue.due_date = Some(now - Duration::days(1));
    let undated = record("d", "undated");

    assert_eq!(count_upcoming(&[ahead, done, overdue, undated], now), 1);
    assert_eq!(count_upcoming(&[], now), 0);
}

#[test]
fn build_draft_validates_and_applies_options() {
    let draft = build_draft(AddArgs {
        name: " Worx Landroid ".to_string(),
        brand: "Worx".to_string(),
        category: "Mower".to_string(),
        priority: Priority::High,
        notes: Some("Cutting precision".to_string()),
        due: NaiveDate::from_ymd_opt(2030, 6, 1),
    })
    .unwrap();
    assert_eq!(draft.name, "Worx Landroid");
    assert_eq!(draft.priority, Priority::High);
    assert_eq!(draft.notes, "Cutting precision");
    assert!(draft.due_date.is_some());

    let empty_brand = build_draft(AddArgs {
        name: "x".to_string(),
        brand: " ".to_string(),
        category: String::new(),
        priority: Priority::Low,
        notes: None,
        due: None,
    });
    assert!(matches!(empty_brand, Err(CliError::Core(_))));
}

#[test]
fn record_changes_require_something_to_change() {
    let result = RecordChanges::from_args(EditArgs::default());
    assert!(matches!(result, Err(CliError::NothingToEdit)));

    let result = RecordChanges::from_args(EditArgs {
        name: Some("  ".to_string()),
        ..EditArgs::default()
    });
    assert!(matches!(result, Err(CliError::Core(_))));
}

#[test]
fn record_changes_apply_only_given_fields() {
    let mut item = record("0190-a", "old");
    item.due_date = Some(Utc::now());
    item.notes = "keep".to_string();

    RecordChanges::from_args(EditArgs {
        name: Some(" new ".to_string()),
        priority: Some(Priority::Low),
        clear_due: true,
        ..EditArgs::default()
    })
    .unwrap()
    .apply(&mut item);

    assert_eq!(item.name, "new");
    assert_eq!(item.brand, "Apple");
    assert_eq!(item.priority, Priority::Low);
    assert_eq!(item.notes, "keep");
    assert_eq!(item.due_date, None);
}

#[test]
fn identity_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("identity.json");

    assert_eq!(load_identity(&path).unwrap(), None);
    let identity = Identity::anonymous("guest-1").unwrap();
    save_identity(&path, &identity).unwrap();
    assert_eq!(load_identity(&path).unwrap(), Some(identity));

    clear_identity(&path).unwrap();
    clear_identity(&path).unwrap();
    assert_eq!(load_identity(&path).unwrap(), None);
}

#[test]
fn identity_file_is_validated_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.json");
    std::fs::write(&path, r#"{"uid":"a/b","is_anonymous":false}"#).unwrap();
    assert!(matches!(load_identity(&path), Err(CliError::Core(_))));
}

#[test]
fn data_paths_default_database_inside_data_dir() {
    let paths = DataPaths::resolve(Some(PathBuf::from("/data/tracker")), None).unwrap();
    assert_eq!(paths.db_path, PathBuf::from("/data/tracker/tracker.db"));
    assert_eq!(
        paths.identity_file(),
        PathBuf::from("/data/tracker/identity.json")
    );

    let paths = DataPaths::resolve(
        Some(PathBuf::from("/data/tracker")),
        Some(PathBuf::from("/shared/records.db")),
    )
    .unwrap();
    assert_eq!(paths.db_path, PathBuf::from("/shared/records.db"));
}

#[test]
fn login_identity_resolution() {
    let guest = resolve_login_identity(None, true).unwrap();
    assert!(guest.is_anonymous);
    assert!(!guest.uid.is_empty());

    let account = resolve_login_identity(Some("alice".to_string()), false).unwrap();
    assert_eq!(account, Identity::new("alice").unwrap());
}

#[test]
fn completions_mention_binary_name() {
    let mut buffer = Vec::new();
    render_completions(CompletionShell::Bash, &mut buffer);
    let script = String::from_utf8(buffer).unwrap();
    assert!(script.contains("tracker"));
}

#[tokio::test]
async fn commands_without_login_fail() {
    let dir = tempfile::tempdir().unwrap();
    let paths = temp_paths(&dir);
    let result = open_session(&paths).await;
    assert!(matches!(result, Err(CliError::NotSignedIn)));
}

#[tokio::test]
async fn guest_login_seeds_then_logout_clears_local_state() {
    let dir = tempfile::tempdir().unwrap();
    let paths = temp_paths(&dir);

    run_login(None, true, &paths).await.unwrap();
    let identity = load_identity(&paths.identity_file()).unwrap().unwrap();
    assert!(identity.is_anonymous);

    let session = open_session(&paths).await.unwrap();
    assert_eq!(session.handle.records().len(), 5);
    session.close().await.unwrap();

    run_add(
        AddArgs {
            name: "Pixel 9".to_string(),
            brand: "Google".to_string(),
            category: "Smartphone".to_string(),
            priority: Priority::High,
            notes: None,
            due: None,
        },
        &paths,
    )
    .await
    .unwrap();

    let session = open_session(&paths).await.unwrap();
    let records = session.handle.records();
    session.close().await.unwrap();
    assert_eq!(records.len(), 6);
    assert!(records.iter().any(|r| r.name == "Pixel 9"));

    let cache = BootstrapCache::new(paths.cache_dir());
    assert!(cache.path_for(&identity).exists());

    run_logout(&paths).await.unwrap();
    assert_eq!(load_identity(&paths.identity_file()).unwrap(), None);
    assert!(!cache.path_for(&identity).exists());
}

#[tokio::test]
async fn account_login_sees_shared_database_records() {
    let dir = tempfile::tempdir().unwrap();
    let paths = temp_paths(&dir);

    run_login(Some("alice".to_string()), false, &paths)
        .await
        .unwrap();
    let session = open_session(&paths).await.unwrap();
    assert!(session.handle.records().is_empty());
    session.close().await.unwrap();
}
