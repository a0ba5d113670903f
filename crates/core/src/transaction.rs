use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::category::FALLBACK_CATEGORY;
use super::money::Money;

/// Position of a row in the uploaded statement (0-based, data rows only).
/// Stable across the classify → edit → reconcile cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Debit => write!(f, "Debit"),
            Direction::Credit => write!(f, "Credit"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(Direction::Debit),
            "credit" => Ok(Direction::Credit),
            other => Err(format!("Unknown direction: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub row_id: RowId,
    pub date: String,
    pub details: String,
    /// `None` when the amount cell was not numeric; excluded from totals.
    pub amount: Option<Money>,
    pub direction: Direction,
    pub category: String,
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%d %b %Y",
];

impl Transaction {
    pub fn new(
        row_id: RowId,
        date: impl Into<String>,
        details: impl Into<String>,
        amount: Option<Money>,
        direction: Direction,
    ) -> Self {
        Transaction {
            row_id,
            date: date.into(),
            details: details.into(),
            amount,
            direction,
            category: FALLBACK_CATEGORY.to_string(),
        }
    }

    /// Text the classifier matches keywords against.
    pub fn match_text(&self) -> String {
        self.details.trim().to_lowercase()
    }

    /// Best-effort interpretation of the date cell. The first format that
    /// parses wins, so ambiguous day/month values read as US dates.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let s = self.date.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    }
}

/// One slice of a per-direction breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
    /// Fraction of the direction total, 0.0–1.0.
    pub share: f64,
}

struct Tally {
    total: Money,
    by_category: Vec<(String, Money)>,
    excluded: usize,
}

/// Classified transactions split by direction, each side in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub debits: Vec<Transaction>,
    pub credits: Vec<Transaction>,
}

impl ClassificationResult {
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let (debits, credits) = transactions
            .into_iter()
            .partition(|t| t.direction == Direction::Debit);
        ClassificationResult { debits, credits }
    }

    pub fn partition(&self, direction: Direction) -> &[Transaction] {
        match direction {
            Direction::Debit => &self.debits,
            Direction::Credit => &self.credits,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.debits.iter().chain(self.credits.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transaction> {
        self.debits.iter_mut().chain(self.credits.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.debits.len() + self.credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, row_id: RowId) -> Option<&Transaction> {
        self.iter().find(|t| t.row_id == row_id)
    }

    pub fn find_mut(&mut self, row_id: RowId) -> Option<&mut Transaction> {
        self.iter_mut().find(|t| t.row_id == row_id)
    }

    /// Sum of the defined amounts on one side.
    pub fn total(&self, direction: Direction) -> Money {
        self.tally(direction).total
    }

    /// Rows on one side left out of the totals: the amount could not be
    /// parsed, or adding it would overflow.
    pub fn invalid_amounts(&self, direction: Direction) -> usize {
        self.tally(direction).excluded
    }

    /// Category → summed amount for one side, categories in order of first
    /// appearance. Rows without an amount contribute nothing.
    pub fn breakdown(&self, direction: Direction) -> Vec<CategoryTotal> {
        let Tally {
            total: grand,
            by_category,
            ..
        } = self.tally(direction);
        by_category
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                share: total.share_of(grand),
                category,
                total,
            })
            .collect()
    }

    fn tally(&self, direction: Direction) -> Tally {
        let mut tally = Tally {
            total: Money::zero(),
            by_category: Vec::new(),
            excluded: 0,
        };
        for tx in self.partition(direction) {
            let Some(amount) = tx.amount else {
                tally.excluded += 1;
                continue;
            };
            let slot = tally.by_category.iter().position(|(c, _)| *c == tx.category);
            let category_sum = slot.map_or(Money::zero(), |i| tally.by_category[i].1);
            let (Some(total), Some(category_sum)) = (
                tally.total.checked_add(amount),
                category_sum.checked_add(amount),
            ) else {
                tracing::warn!("Row {}: amount {} overflows the total, left out", tx.row_id, amount);
                tally.excluded += 1;
                continue;
            };
            tally.total = total;
            match slot {
                Some(i) => tally.by_category[i].1 = category_sum,
                None => tally.by_category.push((tx.category.clone(), category_sum)),
            }
        }
        tally
    }

    /// Earliest and latest parseable dates across both sides.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates: Vec<NaiveDate> = self.iter().filter_map(Transaction::parsed_date).collect();
        Some((*dates.iter().min()?, *dates.iter().max()?))
    }
}
