use unicode_normalization::UnicodeNormalization;

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn collapse_whitespace(value: &str) -> String {
    let mut out = String::new();
    for part in value.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}

/// Folds a name for identity-key comparison: NFKC composition, lowercase,
/// collapsed whitespace. Two spellings of the same name fold to the same key
/// regardless of casing, spacing, or Unicode form.
pub fn fold_name(value: &str) -> String {
    collapse_whitespace(value)
        .nfkc()
        .collect::<String>()
        .to_lowercase()
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
