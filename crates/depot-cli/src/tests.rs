use std::path::PathBuf;

use clap::Parser;
use depot_core::models::{DataRef, FailedSyncEntry, Record};
use depot_core::sync::{
    BroadcastAction, DispatchReport, DrainReport, FailedSyncStore, LocalStore, SyncFailure,
    SyncReport, SyncStatus, SyncTimeLedger, TableSyncReport, sync_plan,
};
use depot_core::{ClientConfig, DatabaseService, Error, TableId, UserType, descriptor};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

use crate::cli::{Cli, Commands};
use crate::commands::common::{
    default_db_path, format_dispatch_lines, format_drain_lines, format_failed_lines,
    format_plan_lines, format_sync_report_lines, format_timestamp, normalize_payload,
    read_payload, resolve_db_path, resolve_session,
};
use crate::commands::failed::list_failed;
use crate::commands::status::collect_status;
use crate::error::CliError;

fn config_with_session(user_type: Option<UserType>, user_id: Option<i64>) -> ClientConfig {
    let mut config = ClientConfig::new("https://depot.example.com/api").unwrap();
    config.user_type = user_type;
    config.user_id = user_id;
    config
}

#[test]
fn sync_command_parses_user_type_by_name_or_code() {
    let cli = Cli::try_parse_from([
        "depot",
        "--db-path",
        "/tmp/depot-test.db",
        "sync",
        "--user-type",
        "supplier",
        "--user-id",
        "7",
    ])
    .unwrap();
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/depot-test.db")));
    assert!(matches!(
        cli.command,
        Commands::Sync {
            user_type: Some(UserType::Supplier),
            user_id: Some(7)
        }
    ));

    let cli = Cli::try_parse_from(["depot", "sync", "--user-type", "2"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Sync {
            user_type: Some(UserType::Storekeeper),
            user_id: None
        }
    ));
}

#[test]
fn db_path_is_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from(["depot", "failed", "--json", "--db-path", "/tmp/q.db"]).unwrap();
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/q.db")));
    assert!(matches!(cli.command, Commands::Failed { json: true }));
}

#[test]
fn tables_requires_a_known_user_type() {
    assert!(Cli::try_parse_from(["depot", "tables"]).is_err());
    assert!(Cli::try_parse_from(["depot", "tables", "--user-type", "janitor"]).is_err());
    assert!(Cli::try_parse_from(["depot", "tables", "--user-type", "Driver"]).is_ok());
}

#[test]
fn notify_path_is_optional() {
    let cli = Cli::try_parse_from(["depot", "notify"]).unwrap();
    assert!(matches!(cli.command, Commands::Notify { path: None }));

    let cli = Cli::try_parse_from(["depot", "notify", "push.json"]).unwrap();
    assert!(
        matches!(cli.command, Commands::Notify { path: Some(ref path) } if path == &PathBuf::from("push.json"))
    );
}

#[test]
fn resolve_db_path_prefers_explicit_value() {
    let explicit = PathBuf::from("/var/lib/depot/custom.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn default_db_path_lives_under_depot_directory() {
    let path = default_db_path();
    assert!(path.ends_with("depot/depot.db"));
}

#[test]
fn resolve_session_prefers_flags_over_config() {
    let config = config_with_session(Some(UserType::Admin), Some(1));

    let session = resolve_session(Some(UserType::Driver), Some(42), &config).unwrap();
    assert_eq!(session.user_type, UserType::Driver);
    assert_eq!(session.user_id, 42);

    let session = resolve_session(None, None, &config).unwrap();
    assert_eq!(session.user_type, UserType::Admin);
    assert_eq!(session.user_id, 1);
}

#[test]
fn resolve_session_reports_missing_values() {
    let config = config_with_session(None, Some(3));
    assert!(matches!(
        resolve_session(None, None, &config),
        Err(CliError::MissingUserType)
    ));

    let config = config_with_session(Some(UserType::Biller), None);
    assert!(matches!(
        resolve_session(None, None, &config),
        Err(CliError::MissingUserId)
    ));
}

#[test]
fn read_payload_trims_file_contents() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("push.json");
    std::fs::write(&path, "\n  {\"data\": {\"data_ids\": []}}  \n").unwrap();

    let payload = read_payload(Some(&path)).unwrap();
    assert_eq!(payload, "{\"data\": {\"data_ids\": []}}");
}

#[test]
fn read_payload_rejects_blank_file() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("empty.json");
    std::fs::write(&path, " \n\t").unwrap();

    assert!(matches!(read_payload(Some(&path)), Err(CliError::EmptyPayload)));
    assert_eq!(normalize_payload("  "), None);
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_plan_lines_mark_skipped_tables() {
    let lines = format_plan_lines(&sync_plan(UserType::Supplier));
    assert_eq!(lines.len(), 21);
    assert_eq!(lines[0], "sync  product            /product_downloads");
    assert!(lines.iter().any(|line| line.starts_with("skip  orders ")));
    assert!(lines.iter().any(|line| line.starts_with("sync  suppliers ")));
}

#[test]
fn format_failed_lines_include_last_error() {
    let entries = vec![
        FailedSyncEntry {
            id: 1,
            table_id: TableId::Product,
            data_id: 789,
            created_at: 0,
            attempts: 2,
            last_error: Some("network error: timed out".to_string()),
        },
        FailedSyncEntry {
            id: 2,
            table_id: TableId::Racks,
            data_id: 12,
            created_at: 0,
            attempts: 1,
            last_error: None,
        },
    ];

    let lines = format_failed_lines(&entries);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("product"));
    assert!(lines[0].contains("id=789"));
    assert!(lines[0].contains("attempts=2"));
    assert!(lines[0].ends_with("(network error: timed out)"));
    assert!(!lines[1].contains('('));
}

#[test]
fn format_drain_lines_summarize_outcome() {
    assert_eq!(
        format_drain_lines(&DrainReport::default()),
        vec!["Retry queue is empty.".to_string()]
    );

    let report = DrainReport {
        attempted: 2,
        recovered: vec![(TableId::Product, 1)],
        still_failing: vec![(TableId::Orders, 5)],
        dropped: Vec::new(),
    };
    let lines = format_drain_lines(&report);
    assert_eq!(
        lines[0],
        "Retried 2 queued refresh(es): 1 recovered, 1 still failing"
    );
    assert_eq!(lines[1], "  still failing: orders#5");
}

#[test]
fn format_dispatch_lines_show_actions_and_message() {
    let report = DispatchReport {
        refreshed: vec![DataRef { table: 1, id: 789 }],
        actions: vec![BroadcastAction::ForceLogout],
        show_notification: true,
        message: "Prices updated".to_string(),
        ..DispatchReport::default()
    };

    let lines = format_dispatch_lines(&report);
    assert_eq!(lines[0], "Refreshed 1, queued 0, failed 0, skipped 0");
    assert_eq!(lines[1], "Action: force logout");
    assert_eq!(lines[2], "Message: Prices updated");
}

#[test]
fn format_sync_report_lines_include_failure() {
    let report = SyncReport {
        status: SyncStatus::Errored,
        tables: vec![TableSyncReport {
            table: TableId::Product,
            requests: 3,
            rows: 1000,
            completed: false,
            update_date: None,
        }],
        skipped: vec![TableId::Orders],
        failure: Some(SyncFailure::new(
            Some(TableId::Product),
            &Error::Network("connection reset".to_string()),
        )),
    };

    let lines = format_sync_report_lines(&report);
    assert!(lines[0].starts_with("product"));
    assert!(lines[0].contains("1000 rows"));
    assert!(lines[0].ends_with("partial"));
    assert_eq!(
        lines[1],
        "Sync errored: 1000 rows across 1 table(s), 1 skipped by role"
    );
    assert!(lines[2].starts_with("Failure: product: "));
    assert!(lines[2].contains("connection reset"));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_failed_reads_persisted_queue() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("depot.db");
    {
        let database = DatabaseService::open_path(&db_path).await.unwrap();
        database.insert_failed(TableId::Product, 789).await.unwrap();
        database.insert_failed(TableId::Racks, 4).await.unwrap();
    }

    let entries = list_failed(&db_path).await.unwrap();
    let keys = entries
        .iter()
        .map(|entry| (entry.table_id, entry.data_id))
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![(TableId::Product, 789), (TableId::Racks, 4)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn collect_status_reports_rows_and_stamps() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("depot.db");
    {
        let database = DatabaseService::open_path(&db_path).await.unwrap();
        let products = descriptor(TableId::Product).unwrap();
        let records = (1..=3)
            .map(|id| Record::from_value(json!({"id": id, "name": format!("part {id}")})).unwrap())
            .collect::<Vec<_>>();
        database.upsert_many(products, &records).await.unwrap();
        database
            .record_update_date(TableId::Product, "2024-05-01 12:00:00")
            .await
            .unwrap();
    }

    let items = collect_status(&db_path).await.unwrap();
    assert_eq!(items.len(), 21);

    let product = &items[0];
    assert_eq!(product.table, "product");
    assert_eq!(product.rows, 3);
    assert_eq!(product.last_update_date.as_deref(), Some("2024-05-01 12:00:00"));

    let orders = items.iter().find(|item| item.table == "orders").unwrap();
    assert_eq!(orders.rows, 0);
    assert_eq!(orders.last_update_date, None);

    let json = serde_json::to_value(&items).unwrap();
    assert_eq!(json[0]["table_id"], 1);
}
