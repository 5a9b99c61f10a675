use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use extrato_core::{Transaction, UnvalidatedBatch, REQUIRED_COLUMNS};

use crate::error::ImportError;

/// A batch that passed every validation gate. Only obtainable through
/// [`ValidatedBatch::validate`] or [`ValidatedBatch::validate_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    transactions: Vec<Transaction>,
}

impl ValidatedBatch {
    pub fn validate(batch: &UnvalidatedBatch) -> Result<ValidatedBatch, ImportError> {
        Self::validate_at(batch, Local::now().naive_local())
    }

    /// Checks run in order: nulls, emptiness, columns, future dates.
    /// Dates count as midnight and may be at most one day past `now`.
    pub fn validate_at(
        batch: &UnvalidatedBatch,
        now: NaiveDateTime,
    ) -> Result<ValidatedBatch, ImportError> {
        let mut transactions = Vec::with_capacity(batch.rows.len());
        for (idx, row) in batch.rows.iter().enumerate() {
            let missing = |field: &'static str| ImportError::Integrity { row: idx + 1, field };
            transactions.push(Transaction {
                date: row.date.ok_or_else(|| missing("data"))?,
                amount: row.amount.ok_or_else(|| missing("valor"))?,
                category: row.category,
                description: row.description.clone().ok_or_else(|| missing("descricao"))?,
                transaction_id: row.transaction_id.clone().ok_or_else(|| missing("id_transacao"))?,
            });
        }

        if transactions.is_empty() {
            return Err(ImportError::EmptyResult);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !batch.columns.iter().any(|have| have == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Schema(missing));
        }

        let max_date = now + Duration::days(1);
        if let Some(tx) = transactions
            .iter()
            .find(|tx| tx.date.and_time(NaiveTime::MIN) > max_date)
        {
            return Err(ImportError::FutureDate(tx.date));
        }

        Ok(ValidatedBatch { transactions })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
