use finsort_core::{CategoryError, ClassificationResult, RowId};
use finsort_storage::{CategoryStore, StorageError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The category a user picked for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEdit {
    pub row_id: RowId,
    pub category: String,
}

impl CategoryEdit {
    pub fn new(row_id: RowId, category: impl Into<String>) -> Self {
        Self {
            row_id,
            category: category.into(),
        }
    }
}

/// Parses `ROW=CATEGORY`.
impl FromStr for CategoryEdit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, category) = s
            .split_once('=')
            .ok_or_else(|| format!("Expected ROW=CATEGORY, got '{s}'"))?;
        let row = row
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid row id: '{}'", row.trim()))?;
        let category = category.trim();
        if category.is_empty() {
            return Err(format!("Missing category for row {row}"));
        }
        Ok(CategoryEdit::new(RowId(row), category))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnknownRow,
    UnknownCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdit {
    pub edit: CategoryEdit,
    pub reason: RejectReason,
}

/// Outcome of one save action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows whose category changed.
    pub committed: Vec<RowId>,
    /// Rows whose details became a new keyword.
    pub learned: Vec<RowId>,
    /// Committed rows that taught nothing: details already known, empty, or
    /// moved to the fallback.
    pub skipped_learning: Vec<RowId>,
    pub rejected: Vec<RejectedEdit>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.committed.is_empty() && self.rejected.is_empty()
    }
}

/// Derives per-row edits from a post-edit copy of a classification.
pub fn edits_between(before: &ClassificationResult, after: &ClassificationResult) -> Vec<CategoryEdit> {
    after
        .iter()
        .filter(|t| {
            before
                .find(t.row_id)
                .map_or(true, |orig| orig.category != t.category)
        })
        .map(|t| CategoryEdit::new(t.row_id, t.category.clone()))
        .collect()
}

/// Commits user corrections and learns each corrected row's full detail
/// text as a keyword of its new category.
///
/// Edits that keep a row's category are ignored. An edit naming an unknown
/// row or category is rejected and the rest still apply. Storage failures
/// abort the pass; rows committed before the failure stay committed and the
/// failing row keeps its previous category.
pub fn reconcile(
    result: &mut ClassificationResult,
    edits: &[CategoryEdit],
    store: &mut CategoryStore,
) -> Result<ReconcileReport, StorageError> {
    let mut report = ReconcileReport::default();

    for edit in edits {
        let Some(tx) = result.find_mut(edit.row_id) else {
            tracing::warn!("Edit for unknown row {}", edit.row_id);
            report.rejected.push(RejectedEdit {
                edit: edit.clone(),
                reason: RejectReason::UnknownRow,
            });
            continue;
        };
        if tx.category == edit.category {
            continue;
        }
        if !store.categories().contains(&edit.category) {
            tracing::warn!("Row {}: unknown category '{}'", edit.row_id, edit.category);
            report.rejected.push(RejectedEdit {
                edit: edit.clone(),
                reason: RejectReason::UnknownCategory,
            });
            continue;
        }

        // The row only takes the new category once its keyword is stored,
        // so a failed write leaves the edit retryable.
        let learned = match store.add_keyword(&edit.category, &tx.details) {
            Ok(learned) => learned,
            Err(StorageError::Category(
                CategoryError::EmptyKeyword | CategoryError::FallbackKeyword,
            )) => false,
            Err(e) => return Err(e),
        };
        tx.category = edit.category.clone();
        report.committed.push(edit.row_id);
        if learned {
            report.learned.push(edit.row_id);
        } else {
            report.skipped_learning.push(edit.row_id);
        }
    }

    tracing::info!(
        "Reconciled {} edits: {} committed, {} keywords learned, {} rejected",
        edits.len(),
        report.committed.len(),
        report.learned.len(),
        report.rejected.len()
    );
    Ok(report)
}
