use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn run_cmd(db_path: &Path, args: &[&str]) -> String {
    let output = cargo_bin_cmd!("rollcall")
        .args(["--db-path", db_path.to_str().expect("db path")])
        .args(args)
        .output()
        .expect("run command");
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).expect("utf8")
}

fn run_cmd_json(db_path: &Path, args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("rollcall")
        .args(["--db-path", db_path.to_str().expect("db path"), "--json"])
        .args(args)
        .output()
        .expect("run command");
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("parse json")
}

fn column_value(sheet: &Value, column: &str, row: usize) -> String {
    let header = sheet["header"].as_array().expect("header");
    let index = header
        .iter()
        .position(|name| name == column)
        .expect("column present");
    sheet["rows"][row][index]
        .as_str()
        .expect("cell text")
        .to_string()
}

#[test]
fn cli_reconcile_and_apply_identifier_change_flow() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let roster_csv = temp.path().join("roster.csv");
    fs::write(
        &roster_csv,
        "Member ID,First Name,Last Name,Date of Birth,Address\n\
         100,Alex,Lee,1/01/2010,1 A St\n\
         200,Sam,Ng,5/05/2012,2 B St\n",
    )
    .expect("write roster csv");

    let import_csv = temp.path().join("import.csv");
    fs::write(
        &import_csv,
        "Member ID,First Name,Last Name,Date of Birth,Address\n\
         101,Alex,Lee,1/01/2010,1 A St\n\
         200,Sam,Ng,5/05/2012,9 Z St\n\
         ,Kim,Wu,7/07/2014,3 C St\n",
    )
    .expect("write import csv");

    run_cmd(
        &db_path,
        &["import", roster_csv.to_str().unwrap(), "--sheet", "roster"],
    );
    run_cmd(&db_path, &["import", import_csv.to_str().unwrap()]);

    let report = run_cmd_json(&db_path, &["reconcile"]);
    assert_eq!(report["counts"]["incoming_rows"], 3);
    assert_eq!(report["counts"]["new_members"], 1);
    assert_eq!(report["counts"]["identifier_changes"], 1);
    assert_eq!(report["counts"]["updated_rows"], 1);
    assert_eq!(report["queued_identifier_changes"], 1);
    assert_eq!(report["auto_applied"], 0);

    let import_sheet = run_cmd_json(&db_path, &["show", "import"]);
    assert_eq!(column_value(&import_sheet, "Action", 0), "Member ID Changed");
    assert_eq!(column_value(&import_sheet, "Action", 1), "Field Updates");
    assert_eq!(column_value(&import_sheet, "Action", 2), "New Member");

    let pending = run_cmd_json(&db_path, &["ids", "list"]);
    let items = pending.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["old_id"], "100");
    assert_eq!(items[0]["new_id"], "101");
    assert_eq!(items[0]["display_name"], "Alex Lee");

    let applied = run_cmd_json(&db_path, &["ids", "apply", "--all", "--yes"]);
    assert_eq!(applied["applied"].as_array().expect("applied").len(), 1);
    assert_eq!(applied["failed"].as_array().expect("failed").len(), 0);

    let roster_sheet = run_cmd_json(&db_path, &["show", "roster"]);
    assert_eq!(column_value(&roster_sheet, "Member ID", 0), "101");
    assert_eq!(column_value(&roster_sheet, "Member ID", 1), "200");

    let open_after = run_cmd_json(&db_path, &["ids", "list"]);
    assert_eq!(open_after.as_array().expect("array").len(), 0);
}

#[test]
fn cli_reconcile_is_idempotent_about_queued_changes() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let roster_csv = temp.path().join("roster.csv");
    fs::write(
        &roster_csv,
        "Member ID,First Name,Last Name,Date of Birth\n100,Alex,Lee,1/01/2010\n",
    )
    .expect("write roster csv");
    let import_csv = temp.path().join("import.csv");
    fs::write(
        &import_csv,
        "Member ID,First Name,Last Name,Date of Birth\n101,Alex,Lee,1/01/2010\n",
    )
    .expect("write import csv");

    run_cmd(
        &db_path,
        &["import", roster_csv.to_str().unwrap(), "--sheet", "roster"],
    );
    run_cmd(&db_path, &["import", import_csv.to_str().unwrap()]);

    let first = run_cmd_json(&db_path, &["reconcile"]);
    assert_eq!(first["queued_identifier_changes"], 1);

    let second = run_cmd_json(&db_path, &["reconcile"]);
    assert_eq!(second["counts"]["identifier_changes"], 1);
    assert_eq!(second["queued_identifier_changes"], 0);
}

#[test]
fn cli_dry_run_writes_nothing() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let roster_csv = temp.path().join("roster.csv");
    fs::write(
        &roster_csv,
        "Member ID,First Name,Last Name,Date of Birth\n100,Alex,Lee,1/01/2010\n",
    )
    .expect("write roster csv");
    let import_csv = temp.path().join("import.csv");
    fs::write(
        &import_csv,
        "Member ID,First Name,Last Name,Date of Birth\n101,Alex,Lee,1/01/2010\n",
    )
    .expect("write import csv");

    run_cmd(
        &db_path,
        &["import", roster_csv.to_str().unwrap(), "--sheet", "roster"],
    );
    run_cmd(&db_path, &["import", import_csv.to_str().unwrap()]);

    let report = run_cmd_json(&db_path, &["reconcile", "--dry-run"]);
    assert_eq!(report["counts"]["identifier_changes"], 1);
    assert_eq!(report["queued_identifier_changes"], 0);

    let pending = run_cmd_json(&db_path, &["ids", "list"]);
    assert_eq!(pending.as_array().expect("array").len(), 0);

    let import_sheet = run_cmd_json(&db_path, &["show", "import"]);
    let header = import_sheet["header"].as_array().expect("header");
    assert!(!header.iter().any(|name| name == "Action"));
}

#[test]
fn cli_normalize_phones_and_dedupe_contacts() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let import_csv = temp.path().join("import.csv");
    fs::write(
        &import_csv,
        "Member Mobile,Member_Email,Additional Email Addresses,Parent1_Mobile,Parent1_Email,Parent2_Mobile,Parent2_Email\n\
         0412345678,kid@example.com,\"mum@example.com, aunt@example.com\",+61412345678,mum@example.com,,\n",
    )
    .expect("write import csv");

    run_cmd(&db_path, &["import", import_csv.to_str().unwrap()]);

    let phones = run_cmd_json(&db_path, &["normalize-phones"]);
    assert_eq!(phones["changed_cells"], 2);
    assert_eq!(phones["invalid_cells"], 0);

    let sheet = run_cmd_json(&db_path, &["show", "import"]);
    assert_eq!(column_value(&sheet, "Member Mobile", 0), "0412 345 678");
    assert_eq!(column_value(&sheet, "Parent1_Mobile", 0), "0412 345 678");

    let dedupe = run_cmd_json(&db_path, &["dedupe-contacts"]);
    assert_eq!(dedupe["rows_changed"], 1);

    let sheet = run_cmd_json(&db_path, &["show", "import"]);
    // Member mobile duplicated parent1's number and was cleared; the parent
    // email was pruned from the additional list.
    assert_eq!(column_value(&sheet, "Member Mobile", 0), "");
    assert_eq!(
        column_value(&sheet, "Additional Email Addresses", 0),
        "aunt@example.com"
    );
    assert_eq!(column_value(&sheet, "Member_Email", 0), "kid@example.com");
}

#[test]
fn cli_apply_requires_confirmation_flag() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let output = cargo_bin_cmd!("rollcall")
        .args([
            "--db-path",
            db_path.to_str().expect("db path"),
            "ids",
            "apply",
            "--all",
        ])
        .output()
        .expect("run command");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_reconcile_without_roster_fails_not_found() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("rollcall.sqlite3");

    let output = cargo_bin_cmd!("rollcall")
        .args(["--db-path", db_path.to_str().expect("db path"), "reconcile"])
        .output()
        .expect("run command");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}
