use crate::error::{ImportError, Result};
use rollcall_core::table::{Cell, Table};

#[derive(Debug)]
pub struct ParsedTable {
    pub table: Table,
    pub warnings: Vec<String>,
}

/// Parses a raw CSV export into a table. Quoted fields, doubled quotes and
/// CR/CRLF line endings are handled; ragged rows are padded or truncated
/// with a warning rather than rejected.
pub fn parse_csv(data: &str) -> Result<ParsedTable> {
    let mut records = parse_records(data)?.into_iter();
    let header: Vec<String> = records
        .next()
        .ok_or_else(|| ImportError::Parse("empty export: no header row".to_string()))?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    if header.iter().all(String::is_empty) {
        return Err(ImportError::Parse("empty export: blank header row".to_string()));
    }

    let mut warnings = Vec::new();
    let mut table = Table::new(header);
    let width = table.header().len();

    for (offset, mut record) in records.enumerate() {
        let line = offset + 2; // header is line 1
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        if record.len() > width {
            warnings.push(format!(
                "line {line}: {} fields, expected {width}; extra fields dropped",
                record.len()
            ));
            record.truncate(width);
        } else if record.len() < width {
            warnings.push(format!(
                "line {line}: {} fields, expected {width}; missing fields left empty",
                record.len()
            ));
        }
        table.push_row(record.into_iter().map(|field| type_field(&field)).collect());
    }

    Ok(ParsedTable { table, warnings })
}

fn parse_records(data: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut any_field = false;

    let mut chars = data.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => {
                record.push(std::mem::take(&mut field));
                any_field = true;
            }
            '\r' => {
                if matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                any_field = false;
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                any_field = false;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(ImportError::Parse(
            "unterminated quoted field at end of input".to_string(),
        ));
    }
    if any_field || !field.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

/// Fields that read as plain numbers become `Number` cells so spreadsheet
/// serial dates survive the import. Leading zeros are significant (phones,
/// zero-padded identifiers), so those stay text.
fn type_field(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if looks_numeric(trimmed) {
        if let Ok(value) = trimmed.parse::<f64>() {
            return Cell::Number(value);
        }
    }
    Cell::Text(field.to_string())
}

fn looks_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return false;
    }
    let mut dots = 0;
    for ch in digits.chars() {
        match ch {
            '.' => dots += 1,
            _ if ch.is_ascii_digit() => {}
            _ => return false,
        }
    }
    dots <= 1
}
