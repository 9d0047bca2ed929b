use crate::table::{Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A formatted value is valid iff it matches one of the two canonical shapes
/// exactly: `04XX XXX XXX` mobiles or `0[2378]XXXX XXXX` landlines.
pub const VALID_PHONE_PATTERN: &str = r"^(04\d{2} \d{3} \d{3}|0[2378] \d{4} \d{4})$";

pub const INVALID_PHONE_BACKGROUND: &str = "#f4cccc";

static VALID_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(VALID_PHONE_PATTERN).expect("valid phone pattern"));

/// Canonicalizes an Australian phone number. Best-effort: input that no rule
/// recognizes comes back transformed but unformatted, and empty input stays
/// empty. Idempotent over its own output.
pub fn normalize_phone(value: &Cell) -> String {
    normalize_phone_text(&value.as_text())
}

pub fn normalize_phone_text(raw: &str) -> String {
    let mut out = String::new();
    for ch in raw.trim().chars() {
        if ch.is_ascii_digit() {
            out.push(ch);
        } else if ch == '+' && out.is_empty() {
            out.push('+');
        }
    }
    if out.is_empty() {
        return out;
    }

    if let Some(rest) = out.strip_prefix("+61") {
        out = format!("0{rest}");
    } else if out.starts_with("61") && out.len() >= 10 {
        out = format!("0{}", &out[2..]);
    }

    // Spreadsheets drop leading zeros from numeric cells; restore them.
    if out.len() == 9 && (out.starts_with('4') || out.starts_with('2')) {
        out.insert(0, '0');
    }
    if out.len() == 8 && (out.starts_with('8') || out.starts_with('9')) {
        out.insert_str(0, "02");
    }

    let bytes = out.as_bytes();
    if out.len() == 10 && bytes.iter().all(|b| b.is_ascii_digit()) && bytes[0] == b'0' {
        if matches!(bytes[1], b'2' | b'3' | b'7' | b'8') {
            return format!("{} {} {}", &out[..2], &out[2..6], &out[6..]);
        }
        if bytes[1] == b'4' {
            return format!("{} {} {}", &out[..4], &out[4..7], &out[7..]);
        }
    }
    out
}

pub fn is_valid_phone(value: &str) -> bool {
    VALID_PHONE.is_match(value)
}

/// Conditional-highlight rule for the rendering store: any non-empty cell in
/// `columns` that fails `valid_pattern` gets `background`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneValidationRule {
    pub columns: Vec<String>,
    pub valid_pattern: String,
    pub background: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneColumnPass {
    pub changed_cells: usize,
    pub invalid_cells: usize,
    pub skipped_columns: Vec<String>,
    pub rule: PhoneValidationRule,
}

/// In-place normalization of the listed phone columns over a table snapshot.
/// Columns absent from the header are skipped and reported, not fatal.
pub fn normalize_phone_columns(table: &mut Table, columns: &[String]) -> PhoneColumnPass {
    let mut changed_cells = 0;
    let mut invalid_cells = 0;
    let mut present = Vec::new();
    let mut skipped = Vec::new();

    for column in columns {
        if !table.has_column(column) {
            skipped.push(column.clone());
            continue;
        }
        present.push(column.clone());

        for row in 0..table.row_count() {
            let normalized = {
                let Some(cell) = table.value(row, column) else {
                    continue;
                };
                if cell.is_empty() {
                    continue;
                }
                let original = cell.as_text();
                let normalized = normalize_phone_text(&original);
                if !normalized.is_empty() && !is_valid_phone(&normalized) {
                    invalid_cells += 1;
                }
                if normalized == original {
                    continue;
                }
                normalized
            };
            table.set_value(row, column, Cell::text(normalized));
            changed_cells += 1;
        }
    }

    PhoneColumnPass {
        changed_cells,
        invalid_cells,
        skipped_columns: skipped,
        rule: PhoneValidationRule {
            columns: present,
            valid_pattern: VALID_PHONE_PATTERN.to_string(),
            background: INVALID_PHONE_BACKGROUND.to_string(),
        },
    }
}
