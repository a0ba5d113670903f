//! Plain-text presentation of a classified statement.

use finsort_core::{ClassificationResult, Direction, Transaction};
use finsort_import::{ReconcileReport, RejectReason, RejectedRow};
use std::io::{self, Write};

const BAR_WIDTH: f64 = 30.0;
const DETAILS_WIDTH: usize = 36;

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
    t.push('…');
    t
}

fn write_row(out: &mut impl Write, tx: &Transaction) -> io::Result<()> {
    let amount = tx.amount.map(|a| a.to_string()).unwrap_or_default();
    writeln!(
        out,
        "{:>5}  {:<12} {:<width$} {:>12}  {}",
        tx.row_id,
        tx.date,
        truncate(&tx.details, DETAILS_WIDTH),
        amount,
        tx.category,
        width = DETAILS_WIDTH
    )
}

fn write_side(out: &mut impl Write, result: &ClassificationResult, direction: Direction) -> io::Result<()> {
    let heading = match direction {
        Direction::Debit => "Debits",
        Direction::Credit => "Credits",
    };
    writeln!(out, "== {heading} ({}) ==", result.partition(direction).len())?;
    writeln!(
        out,
        "{:>5}  {:<12} {:<width$} {:>12}  Category",
        "Row",
        "Date",
        "Details",
        "Amount",
        width = DETAILS_WIDTH
    )?;
    for tx in result.partition(direction) {
        write_row(out, tx)?;
    }

    writeln!(out, "Total: {}", result.total(direction))?;
    let invalid = result.invalid_amounts(direction);
    if invalid > 0 {
        writeln!(out, "({invalid} row(s) with an unusable amount left out of the total)")?;
    }

    for slice in result.breakdown(direction) {
        let bar = "#".repeat((slice.share * BAR_WIDTH).round() as usize);
        writeln!(
            out,
            "  {:<20} {:>12} {:>6.1}%  {}",
            truncate(&slice.category, 20),
            slice.total.to_string(),
            slice.share * 100.0,
            bar
        )?;
    }
    writeln!(out)
}

pub fn write_result(
    out: &mut impl Write,
    result: &ClassificationResult,
    rejected: &[RejectedRow],
) -> io::Result<()> {
    if let Some((from, to)) = result.date_range() {
        writeln!(out, "Statement {from} to {to}, {} transactions\n", result.len())?;
    }
    write_side(out, result, Direction::Debit)?;
    write_side(out, result, Direction::Credit)?;
    for row in rejected {
        writeln!(out, "Skipped row {}: {}", row.row_id, row.reason)?;
    }
    Ok(())
}

pub fn write_report(out: &mut impl Write, report: &ReconcileReport) -> io::Result<()> {
    writeln!(
        out,
        "Saved {} change(s), learned {} keyword(s)",
        report.committed.len(),
        report.learned.len()
    )?;
    for rejected in &report.rejected {
        let why = match rejected.reason {
            RejectReason::UnknownRow => "no such row",
            RejectReason::UnknownCategory => "no such category",
        };
        writeln!(
            out,
            "Ignored {}={}: {why}",
            rejected.edit.row_id, rejected.edit.category
        )?;
    }
    writeln!(out)
}
