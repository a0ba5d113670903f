use finsort_core::{ClassificationResult, RowId};
use finsort_storage::{CategoryStore, StorageError};
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

use crate::classify::{classify, Classifier};
use crate::csv::{import_csv, CsvError, CsvImportProfile, RejectedRow};
use crate::reconcile::{reconcile, CategoryEdit, ReconcileReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No category store yet; `load` leaves this state.
    Unloaded,
    /// Store loaded, no statement.
    Loaded,
    Classified,
    /// Edits staged but not saved.
    EditedPending,
    /// Edits saved; the statement still shows the pre-save classification.
    Reconciled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unloaded => write!(f, "unloaded"),
            SessionState::Loaded => write!(f, "loaded"),
            SessionState::Classified => write!(f, "classified"),
            SessionState::EditedPending => write!(f, "edited_pending"),
            SessionState::Reconciled => write!(f, "reconciled"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One interactive session: the category store, the current statement and
/// any edits waiting for a save.
pub struct Session {
    state: SessionState,
    store: Option<CategoryStore>,
    result: Option<ClassificationResult>,
    rejected_rows: Vec<RejectedRow>,
    pending: Vec<CategoryEdit>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: SessionState::Unloaded,
            store: None,
            result: None,
            rejected_rows: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn open(store: CategoryStore) -> Self {
        Session {
            state: SessionState::Loaded,
            store: Some(store),
            ..Self::new()
        }
    }

    /// Reads the category store at `path` into a fresh session.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        self.require("load categories", &[SessionState::Unloaded])?;
        self.store = Some(CategoryStore::load(path)?);
        self.state = SessionState::Loaded;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> Option<&CategoryStore> {
        self.store.as_ref()
    }

    /// Mutable store access for category management between passes.
    pub fn store_mut(&mut self) -> Option<&mut CategoryStore> {
        self.store.as_mut()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn rejected_rows(&self) -> &[RejectedRow] {
        &self.rejected_rows
    }

    pub fn pending_edits(&self) -> &[CategoryEdit] {
        &self.pending
    }

    fn require(&self, action: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Parses and classifies an uploaded statement, replacing any previous
    /// one. Unsaved edits are discarded.
    pub fn classify<R: Read>(
        &mut self,
        data: R,
        profile: &CsvImportProfile,
    ) -> Result<&ClassificationResult, SessionError> {
        use SessionState::*;
        self.require("classify a statement", &[Loaded, Classified, Reconciled, EditedPending])?;
        let Some(store) = self.store.as_ref() else {
            return Err(SessionError::InvalidState {
                action: "classify a statement",
                state: self.state,
            });
        };

        let statement = import_csv(data, profile)?;
        let result = classify(statement.transactions, store.categories());
        if !self.pending.is_empty() {
            tracing::warn!("Discarding {} unsaved edits", self.pending.len());
        }
        self.pending.clear();
        self.rejected_rows = statement.rejected;
        self.state = Classified;
        Ok(&*self.result.insert(result))
    }

    /// Stages a category change for a row. Staging the same row again
    /// replaces the earlier edit.
    pub fn stage_edit(&mut self, row_id: RowId, category: impl Into<String>) -> Result<(), SessionError> {
        use SessionState::*;
        self.require("edit", &[Classified, EditedPending, Reconciled])?;
        let edit = CategoryEdit::new(row_id, category);
        match self.pending.iter_mut().find(|e| e.row_id == row_id) {
            Some(existing) => *existing = edit,
            None => self.pending.push(edit),
        }
        self.state = EditedPending;
        Ok(())
    }

    /// Commits staged edits and learns keywords from them.
    pub fn save(&mut self) -> Result<ReconcileReport, SessionError> {
        self.require("save", &[SessionState::EditedPending])?;
        let (Some(store), Some(result)) = (self.store.as_mut(), self.result.as_mut()) else {
            return Err(SessionError::InvalidState {
                action: "save",
                state: self.state,
            });
        };
        let edits = std::mem::take(&mut self.pending);
        match reconcile(result, &edits, store) {
            Ok(report) => {
                self.state = SessionState::Reconciled;
                Ok(report)
            }
            Err(e) => {
                // Keep the batch staged so the same save can be retried.
                self.pending = edits;
                Err(e.into())
            }
        }
    }

    /// Re-runs classification of the current statement against the store as
    /// it is now, including keywords learned by the last save.
    pub fn reclassify(&mut self) -> Result<&ClassificationResult, SessionError> {
        use SessionState::*;
        self.require("reclassify", &[Classified, Reconciled])?;
        let (Some(store), Some(result)) = (self.store.as_ref(), self.result.as_mut()) else {
            return Err(SessionError::InvalidState {
                action: "reclassify",
                state: self.state,
            });
        };
        Classifier::new(store.categories()).reclassify(result);
        self.state = Classified;
        Ok(&*result)
    }
}
