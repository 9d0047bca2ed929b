use crate::normalize::phone::normalize_phone;
use crate::normalize::text::normalize_email;
use crate::table::{Cell, Table};
use std::collections::HashSet;

pub const ADDITIONAL_EMAIL_SEPARATOR: &str = ", ";

/// Column names for the member/parent contact fields on one row.
#[derive(Debug, Clone)]
pub struct ContactColumns {
    pub member_mobile: String,
    pub member_email: String,
    pub additional_emails: String,
    pub parent1_mobile: String,
    pub parent1_email: String,
    pub parent2_mobile: String,
    pub parent2_email: String,
}

/// Clears member contact values that duplicate a parent/guardian value on the
/// same row, and prunes the free-text additional-emails list. Returns whether
/// anything changed, so the caller knows to persist the row.
pub fn dedupe_row(table: &mut Table, row: usize, columns: &ContactColumns) -> bool {
    let mut changed = false;

    let parent_mobiles: HashSet<String> = [&columns.parent1_mobile, &columns.parent2_mobile]
        .into_iter()
        .filter_map(|column| table.value(row, column))
        .map(normalize_phone)
        .filter(|value| !value.is_empty())
        .collect();
    let member_mobile = table
        .value(row, &columns.member_mobile)
        .map(normalize_phone)
        .unwrap_or_default();
    if !member_mobile.is_empty() && parent_mobiles.contains(&member_mobile) {
        table.set_value(row, &columns.member_mobile, Cell::Empty);
        changed = true;
    }

    let parent_emails: HashSet<String> = [&columns.parent1_email, &columns.parent2_email]
        .into_iter()
        .filter_map(|column| table.value(row, column))
        .map(|cell| normalize_email(&cell.as_text()))
        .filter(|value| !value.is_empty())
        .collect();
    let mut member_email = table
        .value(row, &columns.member_email)
        .map(|cell| normalize_email(&cell.as_text()))
        .unwrap_or_default();
    if !member_email.is_empty() && parent_emails.contains(&member_email) {
        table.set_value(row, &columns.member_email, Cell::Empty);
        member_email.clear();
        changed = true;
    }

    let original = table
        .value(row, &columns.additional_emails)
        .map(|cell| cell.as_text())
        .unwrap_or_default();
    if !original.trim().is_empty() {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for entry in original.split(',') {
            let entry = normalize_email(entry);
            if entry.is_empty() || parent_emails.contains(&entry) {
                continue;
            }
            // member_email reflects any clearing above
            if !member_email.is_empty() && entry == member_email {
                continue;
            }
            if seen.insert(entry.clone()) {
                kept.push(entry);
            }
        }
        let rebuilt = kept.join(ADDITIONAL_EMAIL_SEPARATOR);
        if rebuilt != original {
            table.set_value(row, &columns.additional_emails, Cell::text(rebuilt));
            changed = true;
        }
    }

    changed
}

/// Runs `dedupe_row` over every row; returns the indices that changed.
pub fn dedupe_table(table: &mut Table, columns: &ContactColumns) -> Vec<usize> {
    let mut changed = Vec::new();
    for row in 0..table.row_count() {
        if dedupe_row(table, row, columns) {
            changed.push(row);
        }
    }
    changed
}
