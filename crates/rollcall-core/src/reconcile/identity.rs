use crate::normalize::date::{normalize_date, DateFormat};
use crate::normalize::text::fold_name;
use crate::table::Table;
use chrono::FixedOffset;

/// Joins the folded name parts and canonical date of birth; not expected to
/// appear in names.
pub const NAME_DOB_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
}

/// Two-part identity key: the explicit identifier when present, and a
/// composite fallback that survives identifier changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub member_id: String,
    pub name_dob_key: String,
}

pub fn identity_key(
    table: &Table,
    row: usize,
    columns: &KeyColumns,
    format: DateFormat,
    offset: FixedOffset,
) -> IdentityKey {
    let member_id = table
        .value(row, &columns.identifier)
        .map(|cell| cell.as_text().trim().to_string())
        .unwrap_or_default();
    let first = table
        .value(row, &columns.first_name)
        .map(|cell| fold_name(&cell.as_text()))
        .unwrap_or_default();
    let last = table
        .value(row, &columns.last_name)
        .map(|cell| fold_name(&cell.as_text()))
        .unwrap_or_default();
    let dob = table
        .value(row, &columns.date_of_birth)
        .map(|cell| normalize_date(cell, format, offset))
        .unwrap_or_default();

    let mut name_dob_key = String::with_capacity(first.len() + last.len() + dob.len() + 2);
    name_dob_key.push_str(&first);
    name_dob_key.push(NAME_DOB_SEPARATOR);
    name_dob_key.push_str(&last);
    name_dob_key.push(NAME_DOB_SEPARATOR);
    name_dob_key.push_str(&dob);

    IdentityKey {
        member_id,
        name_dob_key,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{identity_key, IdentityKey, KeyColumns};
    use crate::normalize::date::{parse_utc_offset, DateFormat};
    use crate::table::{Cell, Table};
    use chrono::FixedOffset;

    pub(crate) fn key_columns() -> KeyColumns {
        KeyColumns {
            identifier: "Member ID".to_string(),
            first_name: "First Name".to_string(),
            last_name: "Last Name".to_string(),
            date_of_birth: "Date of Birth".to_string(),
        }
    }

    pub(crate) fn offset() -> FixedOffset {
        parse_utc_offset("+10:00").expect("offset")
    }

    pub(crate) fn member_table(rows: &[(&str, &str, &str, &str)]) -> Table {
        let mut table = Table::new(vec![
            "Member ID".to_string(),
            "First Name".to_string(),
            "Last Name".to_string(),
            "Date of Birth".to_string(),
        ]);
        for (id, first, last, dob) in rows {
            table.push_row(vec![
                Cell::text(*id),
                Cell::text(*first),
                Cell::text(*last),
                Cell::text(*dob),
            ]);
        }
        table
    }

    fn key_for(id: &str, first: &str, last: &str, dob: &str) -> IdentityKey {
        let table = member_table(&[(id, first, last, dob)]);
        identity_key(&table, 0, &key_columns(), DateFormat::Au, offset())
    }

    #[test]
    fn key_is_stable_across_casing_spacing_and_date_shape() {
        let a = key_for("1", "Jo Anne", "SMITH", "3/04/2010");
        let b = key_for("2", "jo  anne", "smith", "03/04/2010");
        assert_eq!(a.name_dob_key, b.name_dob_key);
        assert_eq!(a.name_dob_key, "jo anne|smith|2010-04-03");
    }

    #[test]
    fn member_id_is_trimmed_raw_text() {
        let key = key_for("  100 ", "Alex", "Lee", "1/01/2010");
        assert_eq!(key.member_id, "100");
    }

    #[test]
    fn missing_fields_fold_to_degenerate_key() {
        let mut table = Table::new(vec!["Member ID".to_string()]);
        table.push_row(vec![Cell::Empty]);
        let key = identity_key(&table, 0, &key_columns(), DateFormat::Au, offset());
        assert_eq!(key.member_id, "");
        assert_eq!(key.name_dob_key, "||");
    }
}
