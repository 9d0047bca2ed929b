use crate::reconcile::diff::IdentifierChange;
use crate::table::{Cell, TableStore, TableStoreError};

/// Result of one attempted identifier write-back.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub change: IdentifierChange,
    pub error: Option<TableStoreError>,
}

impl ApplyOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Writes each approved identifier change into the identifier column at its
/// target row. Does not re-validate matches; one failed write never stops
/// the remaining events.
pub fn apply_identifier_updates(
    store: &dyn TableStore,
    sheet: &str,
    identifier_column: &str,
    changes: Vec<IdentifierChange>,
) -> Vec<ApplyOutcome> {
    changes
        .into_iter()
        .map(|change| {
            let result = store.write_cell(
                sheet,
                change.roster_row,
                identifier_column,
                &Cell::text(change.new_id.clone()),
            );
            ApplyOutcome {
                change,
                error: result.err(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::apply_identifier_updates;
    use crate::reconcile::diff::IdentifierChange;
    use crate::table::{Cell, Highlight, Table, TableStore, TableStoreError};
    use std::cell::RefCell;

    /// Test double that records writes and fails on a chosen row.
    struct RecordingStore {
        fail_row: Option<usize>,
        writes: RefCell<Vec<(usize, String)>>,
    }

    impl TableStore for RecordingStore {
        fn read_table(&self, sheet: &str) -> Result<Table, TableStoreError> {
            Err(TableStoreError::MissingSheet(sheet.to_string()))
        }

        fn write_column(
            &self,
            _sheet: &str,
            _column: &str,
            _values: &[Cell],
        ) -> Result<(), TableStoreError> {
            Ok(())
        }

        fn write_cell(
            &self,
            _sheet: &str,
            row: usize,
            _column: &str,
            value: &Cell,
        ) -> Result<(), TableStoreError> {
            if self.fail_row == Some(row) {
                return Err(TableStoreError::Backend("write refused".to_string()));
            }
            self.writes.borrow_mut().push((row, value.as_text()));
            Ok(())
        }

        fn apply_highlights(
            &self,
            _sheet: &str,
            _highlights: &[Highlight],
        ) -> Result<(), TableStoreError> {
            Ok(())
        }
    }

    fn change(row: usize, new_id: &str) -> IdentifierChange {
        IdentifierChange {
            old_id: "100".to_string(),
            new_id: new_id.to_string(),
            display_name: "Alex Lee".to_string(),
            roster_row: row,
        }
    }

    #[test]
    fn one_failure_does_not_stop_remaining_events() {
        let store = RecordingStore {
            fail_row: Some(1),
            writes: RefCell::new(Vec::new()),
        };

        let outcomes = apply_identifier_updates(
            &store,
            "roster",
            "Member ID",
            vec![change(0, "101"), change(1, "102"), change(2, "103")],
        );

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(outcomes[2].succeeded());
        assert_eq!(
            *store.writes.borrow(),
            vec![(0, "101".to_string()), (2, "103".to_string())]
        );
    }
}
