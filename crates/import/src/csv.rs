use chrono::NaiveDate;
use extrato_core::{Amount, UnvalidatedBatch, UnvalidatedTransaction};
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{ImportError, ParseError};
use crate::rules::CategoryRuleSet;
use crate::util::{non_blank, normalize_header};

pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const COLUMN_DATE: &str = "Data";
pub const COLUMN_AMOUNT: &str = "Valor";
pub const COLUMN_ID: &str = "Identificador";
pub const COLUMN_DESCRIPTION: &str = "Descrição";

const SOURCE_COLUMNS: [&str; 4] = [COLUMN_DATE, COLUMN_AMOUNT, COLUMN_ID, COLUMN_DESCRIPTION];

fn statement_filename_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"^NU_\d+_\d{2}[A-Z]{3}\d{4}_\d{2}[A-Z]{3}\d{4}\.csv$").expect("invalid regex")
    })
}

/// Whether an attachment name looks like a statement export,
/// e.g. `NU_123456_01JAN2024_31JAN2024.csv`.
pub fn is_statement_filename(name: &str) -> bool {
    statement_filename_re().is_match(name)
}

/// Positions of the dialect columns inside one file's header row.
struct ColumnIndex {
    date: usize,
    amount: usize,
    id: usize,
    description: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let position = |name: &str| headers.iter().position(|h| normalize_header(h) == name);

        let missing: Vec<String> = SOURCE_COLUMNS
            .iter()
            .filter(|c| position(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Schema(missing));
        }

        Ok(Self {
            date: position(COLUMN_DATE).unwrap_or_default(),
            amount: position(COLUMN_AMOUNT).unwrap_or_default(),
            id: position(COLUMN_ID).unwrap_or_default(),
            description: position(COLUMN_DESCRIPTION).unwrap_or_default(),
        })
    }
}

pub struct StatementParser<'a> {
    rules: &'a CategoryRuleSet,
}

impl<'a> StatementParser<'a> {
    pub fn new(rules: &'a CategoryRuleSet) -> Self {
        Self { rules }
    }

    /// Reads a statement export. Rows come back deduplicated by transaction id
    /// (first occurrence kept) and ordered most recent first.
    pub fn parse<R: Read>(&self, data: R) -> Result<UnvalidatedBatch, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true)
            .from_reader(data);

        let headers = reader.headers()?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ParseError::NoData.into());
        }
        let columns = ColumnIndex::from_headers(headers)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            rows.push(self.parse_row(&record, &columns, line)?);
        }

        let mut seen = HashSet::new();
        rows.retain(|row: &UnvalidatedTransaction| seen.insert(row.transaction_id.clone()));

        if rows.is_empty() {
            return Err(ImportError::EmptyResult);
        }

        rows.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(UnvalidatedBatch::new(rows))
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        columns: &ColumnIndex,
        line: u64,
    ) -> Result<UnvalidatedTransaction, ImportError> {
        let date_cell = record.get(columns.date).unwrap_or_default().trim();
        let date = NaiveDate::parse_from_str(date_cell, DATE_FORMAT).map_err(|_| {
            ParseError::InvalidDate {
                line,
                value: date_cell.to_string(),
            }
        })?;

        let amount = non_blank(record.get(columns.amount))
            .map(|cell| {
                Amount::parse_statement(cell).map_err(|_| ParseError::InvalidAmount {
                    line,
                    value: cell.to_string(),
                })
            })
            .transpose()?;

        let description = non_blank(record.get(columns.description)).map(str::to_string);
        let transaction_id = non_blank(record.get(columns.id)).map(str::to_string);

        let category = self.rules.categorize(
            description.as_deref().unwrap_or_default(),
            amount.unwrap_or_else(Amount::zero),
        );

        Ok(UnvalidatedTransaction {
            date: Some(date),
            amount,
            category,
            description,
            transaction_id,
        })
    }
}

pub fn parse_statement<R: Read>(
    data: R,
    rules: &CategoryRuleSet,
) -> Result<UnvalidatedBatch, ImportError> {
    StatementParser::new(rules).parse(data)
}

pub fn parse_statement_file(
    path: &Path,
    rules: &CategoryRuleSet,
) -> Result<UnvalidatedBatch, ImportError> {
    let file = std::fs::File::open(path)?;
    parse_statement(std::io::BufReader::new(file), rules)
}
