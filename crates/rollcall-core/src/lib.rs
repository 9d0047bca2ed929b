pub mod error;
pub mod normalize;
pub mod reconcile;
pub mod table;

pub use error::CoreError;
pub use table::{Cell, Highlight, Table, TableStore, TableStoreError};
