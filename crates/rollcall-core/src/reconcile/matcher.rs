use crate::normalize::date::DateFormat;
use crate::reconcile::identity::{identity_key, IdentityKey, KeyColumns};
use crate::table::Table;
use chrono::FixedOffset;
use std::collections::HashMap;

const ID_KEY_PREFIX: &str = "id:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Id,
    NameDob,
    None,
}

impl MatchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchKind::Id => "id",
            MatchKind::NameDob => "nameDob",
            MatchKind::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub roster_row: Option<usize>,
    pub kind: MatchKind,
}

/// Roster lookup keyed by both identity-key parts. Later rows overwrite
/// colliding keys, so rows lacking a unique key alias to the most recent one.
#[derive(Debug)]
pub struct RosterIndex {
    by_key: HashMap<String, usize>,
}

impl RosterIndex {
    pub fn build(
        roster: &Table,
        columns: &KeyColumns,
        format: DateFormat,
        offset: FixedOffset,
    ) -> Self {
        let mut by_key = HashMap::new();
        for row in 0..roster.row_count() {
            let key = identity_key(roster, row, columns, format, offset);
            if !key.member_id.is_empty() {
                by_key.insert(format!("{ID_KEY_PREFIX}{}", key.member_id), row);
            }
            by_key.insert(key.name_dob_key, row);
        }
        Self { by_key }
    }

    /// Resolves an incoming key: the explicit identifier is authoritative
    /// when present; the name/DOB composite recovers matches across an
    /// identifier change or initial assignment.
    pub fn resolve(&self, key: &IdentityKey) -> MatchOutcome {
        if !key.member_id.is_empty() {
            if let Some(&row) = self.by_key.get(&format!("{ID_KEY_PREFIX}{}", key.member_id)) {
                return MatchOutcome {
                    roster_row: Some(row),
                    kind: MatchKind::Id,
                };
            }
        }
        if let Some(&row) = self.by_key.get(&key.name_dob_key) {
            return MatchOutcome {
                roster_row: Some(row),
                kind: MatchKind::NameDob,
            };
        }
        MatchOutcome {
            roster_row: None,
            kind: MatchKind::None,
        }
    }
}
