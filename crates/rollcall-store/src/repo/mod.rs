pub mod pending_changes;
pub mod sheets;

pub use pending_changes::{
    PendingChange, PendingChangeCreateResult, PendingChangeNew, PendingChangesRepo, PendingStatus,
};
pub use sheets::{SheetsRepo, StoredValidationRule};
