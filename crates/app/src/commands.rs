use anyhow::{Context, Result};
use finsort_core::{CategoryTotal, ClassificationResult, Direction, Money};
use finsort_import::{CategoryEdit, CsvImportProfile, ReconcileReport, Session};
use finsort_storage::CategoryStore;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::render;

pub fn open_store(path: &Path) -> Result<CategoryStore> {
    CategoryStore::load(path).with_context(|| format!("open category file {}", path.display()))
}

pub fn list_categories(store: &CategoryStore, out: &mut impl Write) -> Result<()> {
    for category in store.categories().iter() {
        if category.keywords.is_empty() {
            writeln!(out, "{}", category.name)?;
        } else {
            writeln!(
                out,
                "{} ({}): {}",
                category.name,
                category.keywords.len(),
                category.keywords.join(", ")
            )?;
        }
    }
    Ok(())
}

pub fn add_category(store: &mut CategoryStore, name: &str, out: &mut impl Write) -> Result<()> {
    store.create_category(name)?;
    writeln!(out, "Added category '{}'", name.trim())?;
    Ok(())
}

pub fn remove_category(store: &mut CategoryStore, name: &str, out: &mut impl Write) -> Result<()> {
    store.remove_category(name)?;
    writeln!(out, "Removed category '{name}'")?;
    Ok(())
}

pub fn learn_keyword(
    store: &mut CategoryStore,
    category: &str,
    text: &str,
    out: &mut impl Write,
) -> Result<()> {
    if store.add_keyword(category, text)? {
        writeln!(out, "'{category}' now matches \"{}\"", text.trim())?;
    } else {
        writeln!(out, "'{category}' already matches \"{}\"", text.trim())?;
    }
    Ok(())
}

#[derive(Serialize)]
struct Side<'a> {
    transactions: &'a [finsort_core::Transaction],
    total: Money,
    invalid_amounts: usize,
    breakdown: Vec<CategoryTotal>,
}

impl<'a> Side<'a> {
    fn new(result: &'a ClassificationResult, direction: Direction) -> Self {
        Side {
            transactions: result.partition(direction),
            total: result.total(direction),
            invalid_amounts: result.invalid_amounts(direction),
            breakdown: result.breakdown(direction),
        }
    }
}

#[derive(Serialize)]
struct RejectedJson<'a> {
    row_id: finsort_core::RowId,
    reason: &'a str,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    committed: &'a [finsort_core::RowId],
    learned: &'a [finsort_core::RowId],
    skipped_learning: &'a [finsort_core::RowId],
    rejected: Vec<&'a CategoryEdit>,
}

#[derive(Serialize)]
struct StatementJson<'a> {
    /// Choices for a row's category, in match order.
    categories: Vec<&'a str>,
    debits: Side<'a>,
    credits: Side<'a>,
    rejected_rows: Vec<RejectedJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<ReportJson<'a>>,
}

fn write_json(out: &mut impl Write, session: &Session, report: Option<&ReconcileReport>) -> Result<()> {
    let (Some(store), Some(result)) = (session.store(), session.result()) else {
        return Ok(());
    };
    let doc = StatementJson {
        categories: store.categories().names().collect(),
        debits: Side::new(result, Direction::Debit),
        credits: Side::new(result, Direction::Credit),
        rejected_rows: session
            .rejected_rows()
            .iter()
            .map(|r| RejectedJson {
                row_id: r.row_id,
                reason: &r.reason,
            })
            .collect(),
        saved: report.map(|r| ReportJson {
            committed: &r.committed,
            learned: &r.learned,
            skipped_learning: &r.skipped_learning,
            rejected: r.rejected.iter().map(|e| &e.edit).collect(),
        }),
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

fn open_statement(csv: &Path) -> Result<File> {
    File::open(csv).with_context(|| format!("open statement {}", csv.display()))
}

pub fn classify_file(
    store: CategoryStore,
    csv: &Path,
    profile: &CsvImportProfile,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut session = Session::open(store);
    session
        .classify(open_statement(csv)?, profile)
        .with_context(|| format!("classify {}", csv.display()))?;
    if json {
        return write_json(out, &session, None);
    }
    if let Some(result) = session.result() {
        render::write_result(out, result, session.rejected_rows())?;
    }
    Ok(())
}

/// Classifies `csv`, applies `edits`, learns from them and prints the
/// statement reclassified with the updated keywords.
pub fn save_edits(
    store: CategoryStore,
    csv: &Path,
    profile: &CsvImportProfile,
    edits: &[CategoryEdit],
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut session = Session::open(store);
    session
        .classify(open_statement(csv)?, profile)
        .with_context(|| format!("classify {}", csv.display()))?;
    for edit in edits {
        session.stage_edit(edit.row_id, edit.category.clone())?;
    }
    let report = session.save().context("save edits")?;
    session.reclassify()?;
    if json {
        return write_json(out, &session, Some(&report));
    }
    render::write_report(out, &report)?;
    if let Some(result) = session.result() {
        render::write_result(out, result, session.rejected_rows())?;
    }
    Ok(())
}
