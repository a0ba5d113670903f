use finsort_core::{Direction, Money, RowId, Transaction};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

/// Header names of the columns a statement must provide. Matching is exact
/// and case-sensitive; any other column is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvColumnMapping {
    pub date_column: String,
    pub details_column: String,
    pub amount_column: String,
    pub direction_column: String,
}

impl Default for CsvColumnMapping {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            details_column: "Details".to_string(),
            amount_column: "Amount".to_string(),
            direction_column: "Debit/Credit".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvImportProfile {
    pub name: String,
    pub mapping: CsvColumnMapping,
    /// Without a header row the columns are read positionally in the order
    /// date, details, amount, direction.
    pub has_header: bool,
    pub delimiter: String,
    pub thousands_separator: char,
}

impl Default for CsvImportProfile {
    fn default() -> Self {
        Self {
            name: "Bank statement".to_string(),
            mapping: CsvColumnMapping::default(),
            has_header: true,
            delimiter: ",".to_string(),
            thousands_separator: ',',
        }
    }
}

impl CsvImportProfile {
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))
    }

    fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("No data rows")]
    NoDataRows,
}

/// A data row that could not become a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub row_id: RowId,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedStatement {
    /// Accepted rows in input order, all in the fallback category.
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

impl ParsedStatement {
    pub fn invalid_amounts(&self) -> usize {
        self.transactions.iter().filter(|t| t.amount.is_none()).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    date: usize,
    details: usize,
    amount: usize,
    direction: usize,
}

impl ColumnIndices {
    fn positional() -> Self {
        Self {
            date: 0,
            details: 1,
            amount: 2,
            direction: 3,
        }
    }

    fn from_headers(headers: &csv::StringRecord, mapping: &CsvColumnMapping) -> Result<Self, CsvError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            date: find(&mapping.date_column)?,
            details: find(&mapping.details_column)?,
            amount: find(&mapping.amount_column)?,
            direction: find(&mapping.direction_column)?,
        })
    }
}

pub struct CsvImporter;

impl CsvImporter {
    pub fn parse_profile<R: Read>(
        reader: &mut csv::Reader<R>,
        profile: &CsvImportProfile,
    ) -> Result<ParsedStatement, CsvError> {
        let columns = if profile.has_header {
            ColumnIndices::from_headers(reader.headers()?, &profile.mapping)?
        } else {
            ColumnIndices::positional()
        };

        let mut statement = ParsedStatement::default();
        let mut rows = 0usize;

        for result in reader.records() {
            let record = result?;
            let row_id = RowId(rows);
            rows += 1;

            let field = |idx: usize| record.get(idx).unwrap_or_default();

            let direction = match field(columns.direction).parse::<Direction>() {
                Ok(d) => d,
                Err(reason) => {
                    tracing::warn!("Row {row_id}: {reason}, row skipped");
                    statement.rejected.push(RejectedRow { row_id, reason });
                    continue;
                }
            };

            let amount_text = field(columns.amount);
            let amount = Money::parse_grouped(amount_text, profile.thousands_separator);
            if amount.is_none() {
                tracing::warn!("Row {row_id}: invalid amount '{amount_text}'");
            }

            statement.transactions.push(Transaction::new(
                row_id,
                field(columns.date).trim(),
                field(columns.details),
                amount,
                direction,
            ));
        }

        if rows == 0 {
            return Err(CsvError::NoDataRows);
        }

        tracing::debug!(
            "Parsed {} transactions ({} rejected)",
            statement.transactions.len(),
            statement.rejected.len()
        );
        Ok(statement)
    }
}

pub fn import_csv<R: Read>(data: R, profile: &CsvImportProfile) -> Result<ParsedStatement, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(profile.has_header)
        .delimiter(profile.delimiter_byte())
        .flexible(true)
        .from_reader(data);

    CsvImporter::parse_profile(&mut reader, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsort_core::FALLBACK_CATEGORY;

    fn import(data: &str) -> Result<ParsedStatement, CsvError> {
        import_csv(data.as_bytes(), &CsvImportProfile::default())
    }

    #[test]
    fn import_basic() {
        let data = "Date,Details,Amount,Debit/Credit\n\
                    2024-01-15,COFFEE SHOP 123,4.50,Debit\n\
                    2024-01-16,PAYROLL,\"2,500.00\",Credit\n";
        let st = import(data).unwrap();
        assert_eq!(st.transactions.len(), 2);
        let first = &st.transactions[0];
        assert_eq!(first.row_id, RowId(0));
        assert_eq!(first.date, "2024-01-15");
        assert_eq!(first.details, "COFFEE SHOP 123");
        assert_eq!(first.amount, Some(Money::from_cents(450)));
        assert_eq!(first.direction, Direction::Debit);
        assert_eq!(first.category, FALLBACK_CATEGORY);
        assert_eq!(st.transactions[1].amount, Some(Money::from_cents(250000)));
        assert_eq!(st.transactions[1].direction, Direction::Credit);
    }

    #[test]
    fn extra_columns_and_order_are_ignored() {
        let data = "Reference,Debit/Credit,Amount,Balance,Details,Date\n\
                    r1,Debit,10.00,90.00,RENT,2024-02-01\n";
        let st = import(data).unwrap();
        assert_eq!(st.transactions[0].details, "RENT");
        assert_eq!(st.transactions[0].date, "2024-02-01");
        assert_eq!(st.transactions[0].amount, Some(Money::from_cents(1000)));
    }

    #[test]
    fn missing_column_fails() {
        let data = "Date,Description,Amount,Debit/Credit\n2024-01-15,X,1,Debit\n";
        assert!(matches!(import(data), Err(CsvError::MissingColumn(c)) if c == "Details"));
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let data = "date,Details,Amount,Debit/Credit\n2024-01-15,X,1,Debit\n";
        assert!(matches!(import(data), Err(CsvError::MissingColumn(c)) if c == "Date"));
    }

    #[test]
    fn invalid_amount_is_kept_as_none() {
        let data = "Date,Details,Amount,Debit/Credit\n\
                    2024-01-15,A,100,Debit\n\
                    2024-01-15,B,bad,Debit\n\
                    2024-01-15,C,50,Debit\n";
        let st = import(data).unwrap();
        assert_eq!(st.transactions.len(), 3);
        assert_eq!(st.transactions[1].amount, None);
        assert_eq!(st.invalid_amounts(), 1);
    }

    #[test]
    fn empty_details_are_kept() {
        let data = "Date,Details,Amount,Debit/Credit\n2024-01-15,,5,Debit\n";
        let st = import(data).unwrap();
        assert_eq!(st.transactions.len(), 1);
        assert_eq!(st.transactions[0].details, "");
    }

    #[test]
    fn unknown_direction_is_rejected_not_fatal() {
        let data = "Date,Details,Amount,Debit/Credit\n\
                    2024-01-15,A,1,Debit\n\
                    2024-01-15,B,1,Transfer\n\
                    2024-01-15,C,1,credit\n";
        let st = import(data).unwrap();
        assert_eq!(st.transactions.len(), 2);
        assert_eq!(st.rejected.len(), 1);
        assert_eq!(st.rejected[0].row_id, RowId(1));
        // Row ids keep pointing at the original file rows.
        assert_eq!(st.transactions[1].row_id, RowId(2));
    }

    #[test]
    fn no_data_rows_errors() {
        let data = "Date,Details,Amount,Debit/Credit\n";
        assert!(matches!(import(data), Err(CsvError::NoDataRows)));
    }

    #[test]
    fn headerless_positional_with_semicolons() {
        let profile = CsvImportProfile {
            has_header: false,
            delimiter: ";".to_string(),
            thousands_separator: '.',
            ..CsvImportProfile::default()
        };
        let data = "15/01/2024;MARKET;1.234;Debit\n";
        let st = import_csv(data.as_bytes(), &profile).unwrap();
        assert_eq!(st.transactions[0].details, "MARKET");
        assert_eq!(st.transactions[0].amount, Some(Money::from_cents(123400)));
    }

    #[test]
    fn profile_from_toml() {
        let profile = CsvImportProfile::from_toml(
            r#"
            name = "Local bank"
            delimiter = ";"
            thousands_separator = "."

            [mapping]
            details_column = "Beschreibung"
            "#,
        )
        .unwrap();
        assert_eq!(profile.name, "Local bank");
        assert_eq!(profile.delimiter, ";");
        assert_eq!(profile.thousands_separator, '.');
        assert_eq!(profile.mapping.details_column, "Beschreibung");
        assert_eq!(profile.mapping.date_column, "Date");
        assert!(profile.has_header);
    }
}
