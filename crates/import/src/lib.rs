pub mod classify;
pub mod csv;
pub mod reconcile;
pub mod session;

pub use classify::{classify, Classifier};
pub use csv::{CsvColumnMapping, CsvError, CsvImportProfile, ParsedStatement, RejectedRow};
pub use reconcile::{
    edits_between, reconcile, CategoryEdit, ReconcileReport, RejectReason, RejectedEdit,
};
pub use session::{Session, SessionError, SessionState};
