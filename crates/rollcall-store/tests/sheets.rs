use chrono::{TimeZone, Utc};
use rollcall_core::normalize::phone::PhoneValidationRule;
use rollcall_core::table::{Cell, Highlight, Table};
use rollcall_store::error::StoreError;
use rollcall_store::Store;

const NOW: i64 = 1_700_000_000;

fn open_store() -> Store {
    let store = Store::open_in_memory().expect("open store");
    store.migrate().expect("migrate");
    store
}

fn roster_table() -> Table {
    let mut table = Table::new(vec![
        "Member ID".to_string(),
        "First Name".to_string(),
        "Joined".to_string(),
        "Score".to_string(),
    ]);
    table.push_row(vec![
        Cell::text("100"),
        Cell::text("Alex"),
        Cell::Date(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        Cell::Number(42.5),
    ]);
    table.push_row(vec![Cell::text("200"), Cell::text("Sam"), Cell::Empty, Cell::Empty]);
    table
}

#[test]
fn replace_and_read_round_trips_cell_kinds() {
    let store = open_store();
    let table = roster_table();
    store
        .sheets()
        .replace_table(NOW, "roster", &table)
        .expect("replace");

    let loaded = store.sheets().read_table("roster").expect("read");
    assert_eq!(loaded.header(), table.header());
    assert_eq!(loaded.row_count(), 2);
    assert_eq!(loaded.value(0, "Member ID"), Some(&Cell::text("100")));
    assert_eq!(loaded.value(0, "Score"), Some(&Cell::Number(42.5)));
    assert_eq!(
        loaded.value(0, "Joined"),
        Some(&Cell::Date(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()))
    );
    assert_eq!(loaded.value(1, "Joined"), Some(&Cell::Empty));
}

#[test]
fn read_missing_sheet_is_not_found() {
    let store = open_store();
    let err = store.sheets().read_table("absent").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn write_column_appends_new_column() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    store
        .sheets()
        .write_column(
            NOW + 1,
            "roster",
            "Action",
            &[Cell::text("New Member"), Cell::Empty],
        )
        .expect("write column");

    let loaded = store.sheets().read_table("roster").expect("read");
    assert_eq!(loaded.header().last().map(String::as_str), Some("Action"));
    assert_eq!(loaded.value(0, "Action"), Some(&Cell::text("New Member")));
    assert_eq!(loaded.value(1, "Action"), Some(&Cell::Empty));
}

#[test]
fn write_column_overwrites_existing_values() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    store
        .sheets()
        .write_column(NOW + 1, "roster", "First Name", &[Cell::text("Alexis"), Cell::Empty])
        .expect("write column");

    let loaded = store.sheets().read_table("roster").expect("read");
    assert_eq!(loaded.value(0, "First Name"), Some(&Cell::text("Alexis")));
    assert_eq!(loaded.value(1, "First Name"), Some(&Cell::Empty));
}

#[test]
fn write_cell_updates_one_value() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    store
        .sheets()
        .write_cell(NOW + 1, "roster", 0, "Member ID", &Cell::text("101"))
        .expect("write cell");

    let loaded = store.sheets().read_table("roster").expect("read");
    assert_eq!(loaded.value(0, "Member ID"), Some(&Cell::text("101")));
    assert_eq!(loaded.value(1, "Member ID"), Some(&Cell::text("200")));
}

#[test]
fn write_cell_rejects_unknown_column_and_row() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    let err = store
        .sheets()
        .write_cell(NOW, "roster", 0, "Missing", &Cell::text("x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingColumn { .. }));

    let err = store
        .sheets()
        .write_cell(NOW, "roster", 9, "Member ID", &Cell::text("x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn highlights_round_trip_and_clear() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    let highlights = vec![
        Highlight {
            row: 0,
            column: Some("Member ID".to_string()),
            background: "#f4cccc".to_string(),
            foreground: "#000000".to_string(),
        },
        Highlight {
            row: 1,
            column: None,
            background: "#d9ead3".to_string(),
            foreground: "#000000".to_string(),
        },
    ];
    store
        .sheets()
        .apply_highlights("roster", &highlights)
        .expect("apply highlights");

    let loaded = store.sheets().list_highlights("roster").expect("list");
    assert_eq!(loaded, highlights);

    store.sheets().clear_highlights("roster").expect("clear");
    assert!(store
        .sheets()
        .list_highlights("roster")
        .expect("list")
        .is_empty());
}

#[test]
fn validation_rules_persist_per_column() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");

    let rule = PhoneValidationRule {
        columns: vec!["First Name".to_string(), "Member ID".to_string()],
        valid_pattern: r"^04\d{2}$".to_string(),
        background: "#f4cccc".to_string(),
    };
    store
        .sheets()
        .set_validation_rule("roster", &rule)
        .expect("set rule");

    let rules = store.sheets().validation_rules("roster").expect("rules");
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].column, "First Name");
    assert_eq!(rules[0].valid_pattern, rule.valid_pattern);
}

#[test]
fn replace_table_resets_previous_contents() {
    let store = open_store();
    store
        .sheets()
        .replace_table(NOW, "roster", &roster_table())
        .expect("replace");
    store
        .sheets()
        .apply_highlights(
            "roster",
            &[Highlight {
                row: 0,
                column: None,
                background: "#ffffff".to_string(),
                foreground: "#000000".to_string(),
            }],
        )
        .expect("highlight");

    let mut smaller = Table::new(vec!["Member ID".to_string()]);
    smaller.push_row(vec![Cell::text("300")]);
    store
        .sheets()
        .replace_table(NOW + 1, "roster", &smaller)
        .expect("replace again");

    let loaded = store.sheets().read_table("roster").expect("read");
    assert_eq!(loaded.header(), &["Member ID".to_string()]);
    assert_eq!(loaded.row_count(), 1);
    assert!(store
        .sheets()
        .list_highlights("roster")
        .expect("list")
        .is_empty());
}
