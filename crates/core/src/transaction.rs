use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::category::Category;
use super::money::{Amount, AmountError};

/// Persisted column order of a transaction row.
pub const TRANSACTION_COLUMNS: [&str; 5] = ["data", "valor", "categoria", "descricao", "id_transacao"];

/// Columns a batch must carry to pass validation.
pub const REQUIRED_COLUMNS: [&str; 4] = ["data", "valor", "descricao", "id_transacao"];

pub const ROW_DATE_FORMAT: &str = "%d/%m/%Y";

/// A parsed statement row before validation. Any required field may still be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnvalidatedTransaction {
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub category: Category,
    pub description: Option<String>,
    pub transaction_id: Option<String>,
}

/// A batch of parsed rows together with the canonical columns it carries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnvalidatedBatch {
    pub columns: Vec<String>,
    pub rows: Vec<UnvalidatedTransaction>,
}

impl UnvalidatedBatch {
    pub fn new(rows: Vec<UnvalidatedTransaction>) -> Self {
        Self {
            columns: TRANSACTION_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Amount,
    pub category: Category,
    pub description: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("Expected {expected} cells, found {found}")]
    Width { expected: usize, found: usize },
    #[error("Invalid date: '{0}'")]
    Date(String),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("{0}")]
    Category(String),
}

impl Transaction {
    /// Renders the row in `TRANSACTION_COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format(ROW_DATE_FORMAT).to_string(),
            self.amount.to_string(),
            self.category.label().to_string(),
            self.description.clone(),
            self.transaction_id.clone(),
        ]
    }

    pub fn from_row<S: AsRef<str>>(cells: &[S]) -> Result<Self, RowError> {
        if cells.len() < TRANSACTION_COLUMNS.len() {
            return Err(RowError::Width {
                expected: TRANSACTION_COLUMNS.len(),
                found: cells.len(),
            });
        }
        let date_cell = cells[0].as_ref().trim();
        let date = NaiveDate::parse_from_str(date_cell, ROW_DATE_FORMAT)
            .map_err(|_| RowError::Date(date_cell.to_string()))?;
        let amount = cells[1].as_ref().parse::<Amount>()?;
        let category = cells[2].as_ref().parse::<Category>().map_err(RowError::Category)?;

        Ok(Transaction {
            date,
            amount,
            category,
            description: cells[3].as_ref().to_string(),
            transaction_id: cells[4].as_ref().to_string(),
        })
    }
}

impl From<Transaction> for UnvalidatedTransaction {
    fn from(tx: Transaction) -> Self {
        UnvalidatedTransaction {
            date: Some(tx.date),
            amount: Some(tx.amount),
            category: tx.category,
            description: Some(tx.description),
            transaction_id: Some(tx.transaction_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample() -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            amount: Amount::new(Decimal::from_str("-45.9").unwrap()),
            category: Category::Alimentacao,
            description: "IFOOD DELIVERY".to_string(),
            transaction_id: "abc-1".to_string(),
        }
    }

    #[test]
    fn to_row_uses_persisted_order() {
        assert_eq!(
            sample().to_row(),
            vec!["05/03/2024", "-45.90", "ALIMENTAÇÃO", "IFOOD DELIVERY", "abc-1"]
        );
    }

    #[test]
    fn from_row_reads_rendered_row() {
        let tx = sample();
        assert_eq!(Transaction::from_row(&tx.to_row()).unwrap(), tx);
    }

    #[test]
    fn from_row_rejects_short_rows() {
        let err = Transaction::from_row(&["05/03/2024", "1.00"]).unwrap_err();
        assert_eq!(err, RowError::Width { expected: 5, found: 2 });
    }

    #[test]
    fn from_row_rejects_bad_date() {
        let row = ["2024-03-05", "1.00", "RECEITAS", "x", "id"];
        assert!(matches!(Transaction::from_row(&row), Err(RowError::Date(_))));
    }

    #[test]
    fn new_batch_carries_all_columns() {
        let batch = UnvalidatedBatch::new(vec![sample().into()]);
        assert_eq!(batch.columns, TRANSACTION_COLUMNS);
        assert_eq!(batch.len(), 1);
    }
}
