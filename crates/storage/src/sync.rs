use extrato_core::{Amount, Transaction, TRANSACTION_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::sheet::{CellFormat, CellRange, StoreError, TableRef, TabularStore};

pub const TABLE_ROWS: u32 = 100;
pub const TABLE_COLS: u32 = 20;

const AMOUNT_COLUMN: usize = 1;
const ID_COLUMN: usize = 4;

/// Which part of a row decides whether it is already in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Every rendered cell must match.
    #[default]
    FullRow,
    /// Only `id_transacao` is compared.
    TransactionId,
}

impl DedupMode {
    fn key(self, row: &[String]) -> Vec<String> {
        match self {
            DedupMode::FullRow => (0..TRANSACTION_COLUMNS.len())
                .map(|i| row.get(i).cloned().unwrap_or_default())
                .collect(),
            DedupMode::TransactionId => vec![row.get(ID_COLUMN).cloned().unwrap_or_default()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub header_written: bool,
    pub appended: usize,
    pub skipped: usize,
    pub highlighted: usize,
}

/// Rows from `incoming` whose dedup key is absent from `existing` (data rows only)
/// and from earlier incoming rows.
pub fn plan_append(
    existing: &[Vec<String>],
    incoming: &[Transaction],
    mode: DedupMode,
) -> Vec<Vec<String>> {
    let mut seen: HashSet<Vec<String>> = existing.iter().map(|r| mode.key(r)).collect();
    incoming
        .iter()
        .map(Transaction::to_row)
        .filter(|row| seen.insert(mode.key(row)))
        .collect()
}

/// Appends validated transactions to a sub-table without touching rows already there.
pub struct SheetSynchronizer<'a, S: TabularStore> {
    store: &'a S,
    dedup: DedupMode,
}

impl<'a, S: TabularStore> SheetSynchronizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            dedup: DedupMode::default(),
        }
    }

    pub fn with_dedup(mut self, dedup: DedupMode) -> Self {
        self.dedup = dedup;
        self
    }

    pub async fn sync(
        &self,
        store_name: &str,
        table_name: &str,
        transactions: &[Transaction],
    ) -> Result<SyncReport, StoreError> {
        let store = self.store.open_or_create_store(store_name).await?;
        let table = self
            .store
            .open_or_create_table(&store, table_name, TABLE_ROWS, TABLE_COLS)
            .await?;

        let mut report = SyncReport::default();

        if self.store.row_count(&table).await? == 0 {
            let header: Vec<String> = TRANSACTION_COLUMNS.iter().map(|c| c.to_string()).collect();
            self.store.write_rows(&table, 1, &[header]).await?;
            self.store
                .format(&table, &CellRange::row_span(1, 1, 26), &CellFormat::header())
                .await?;
            report.header_written = true;
            tracing::debug!(%table, "wrote header row");
        }

        let rows = self.store.read_rows(&table).await?;
        let existing = rows.get(1..).unwrap_or_default();
        let new_rows = plan_append(existing, transactions, self.dedup);
        report.appended = new_rows.len();
        report.skipped = transactions.len() - new_rows.len();

        if !new_rows.is_empty() {
            self.store
                .write_rows(&table, existing.len() + 2, &new_rows)
                .await?;
        }

        report.highlighted = self.highlight_negatives(&table).await?;

        tracing::info!(
            %table,
            appended = report.appended,
            skipped = report.skipped,
            highlighted = report.highlighted,
            "synchronized transactions"
        );

        Ok(report)
    }

    async fn highlight_negatives(&self, table: &TableRef) -> Result<usize, StoreError> {
        let rows = self.store.read_rows(table).await?;
        let mut highlighted = 0;
        for (idx, row) in rows.iter().enumerate().skip(1) {
            let negative = row
                .get(AMOUNT_COLUMN)
                .and_then(|cell| cell.parse::<Amount>().ok())
                .is_some_and(Amount::is_negative);
            if negative {
                let range = CellRange::cell(AMOUNT_COLUMN as u32 + 1, idx as u32 + 1);
                self.store
                    .format(table, &range, &CellFormat::negative_amount())
                    .await?;
                highlighted += 1;
            }
        }
        Ok(highlighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::sheet::Color;
    use chrono::NaiveDate;
    use extrato_core::Category;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const STORE: &str = "Controle Financeiro";
    const TABLE: &str = "Transações";

    fn tx(date: (i32, u32, u32), amount: &str, category: Category, desc: &str, id: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount: Amount::new(Decimal::from_str(amount).unwrap()),
            category,
            description: desc.to_string(),
            transaction_id: id.to_string(),
        }
    }

    fn rent() -> Transaction {
        tx((2024, 3, 1), "-1200.00", Category::OutrosGastos, "ALUGUEL", "a")
    }

    fn salary() -> Transaction {
        tx((2024, 3, 5), "3000.00", Category::Receitas, "SALÁRIO", "b")
    }

    async fn table(store: &MemoryStore) -> TableRef {
        let s = store.open_or_create_store(STORE).await.unwrap();
        store.open_or_create_table(&s, TABLE, TABLE_ROWS, TABLE_COLS).await.unwrap()
    }

    // ── plan_append ───────────────────────────────────────────────────

    #[test]
    fn plan_skips_rows_already_present() {
        let existing = vec![rent().to_row()];
        let planned = plan_append(&existing, &[rent(), salary()], DedupMode::FullRow);
        assert_eq!(planned, vec![salary().to_row()]);
    }

    #[test]
    fn full_row_mode_appends_changed_row_with_same_id() {
        let mut edited = rent();
        edited.description = "ALUGUEL MARÇO".to_string();
        let existing = vec![rent().to_row()];

        let full = plan_append(&existing, &[edited.clone()], DedupMode::FullRow);
        assert_eq!(full.len(), 1);

        let by_id = plan_append(&existing, &[edited], DedupMode::TransactionId);
        assert!(by_id.is_empty());
    }

    #[test]
    fn plan_suppresses_duplicates_within_batch() {
        let planned = plan_append(&[], &[rent(), rent()], DedupMode::FullRow);
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn short_existing_rows_are_padded_for_comparison() {
        let existing = vec![vec!["01/03/2024".to_string()]];
        let planned = plan_append(&existing, &[rent()], DedupMode::FullRow);
        assert_eq!(planned.len(), 1);
    }

    // ── sync ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_sync_writes_header_and_highlights() {
        let store = MemoryStore::new();
        let report = SheetSynchronizer::new(&store)
            .sync(STORE, TABLE, &[rent(), salary()])
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                header_written: true,
                appended: 2,
                skipped: 0,
                highlighted: 1,
            }
        );

        let t = table(&store).await;
        let rows = store.read_rows(&t).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], TRANSACTION_COLUMNS.map(String::from).to_vec());
        assert_eq!(rows[1][1], "-1200.00");
        assert_eq!(rows[2][1], "3000.00");

        let formats = store.formats(&t).unwrap();
        assert!(formats
            .iter()
            .any(|(r, f)| r.to_string() == "A1:Z1" && f.bold == Some(true)));
        let tinted: Vec<String> = formats
            .iter()
            .filter(|(_, f)| f.background == Some(Color::rgb(0.96, 0.8, 0.8)))
            .map(|(r, _)| r.to_string())
            .collect();
        assert_eq!(tinted, vec!["B2"]);
    }

    #[tokio::test]
    async fn second_sync_appends_only_new_rows_below_existing() {
        let store = MemoryStore::new();
        let sync = SheetSynchronizer::new(&store);
        sync.sync(STORE, TABLE, &[rent()]).await.unwrap();

        let report = sync.sync(STORE, TABLE, &[rent(), salary()]).await.unwrap();
        assert!(!report.header_written);
        assert_eq!(report.appended, 1);
        assert_eq!(report.skipped, 1);

        let t = table(&store).await;
        let rows = store.read_rows(&t).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], rent().to_row());
        assert_eq!(rows[2], salary().to_row());
    }

    #[tokio::test]
    async fn new_row_lands_one_past_the_last_data_row() {
        let store = MemoryStore::new();
        let sync = SheetSynchronizer::new(&store);
        sync.sync(STORE, TABLE, &[rent(), salary()]).await.unwrap();

        let market = tx((2024, 3, 9), "-250.35", Category::Alimentacao, "MERCADO", "c");
        let report = sync
            .sync(STORE, TABLE, &[market.clone(), salary(), rent()])
            .await
            .unwrap();
        assert_eq!(report.appended, 1);
        assert_eq!(report.skipped, 2);

        let rows = store.read_rows(&table(&store).await).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], rent().to_row());
        assert_eq!(rows[2], salary().to_row());
        assert_eq!(
            rows[3],
            vec!["09/03/2024", "-250.35", "ALIMENTAÇÃO", "MERCADO", "c"]
        );
    }

    #[tokio::test]
    async fn repeated_sync_is_idempotent() {
        let store = MemoryStore::new();
        let sync = SheetSynchronizer::new(&store);
        let batch = [rent(), salary()];
        sync.sync(STORE, TABLE, &batch).await.unwrap();
        let before = store.read_rows(&table(&store).await).await.unwrap();

        let report = sync.sync(STORE, TABLE, &batch).await.unwrap();
        assert_eq!(report.appended, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.highlighted, 1);
        assert_eq!(store.read_rows(&table(&store).await).await.unwrap(), before);
    }

    #[tokio::test]
    async fn transaction_id_mode_ignores_edited_rows() {
        let store = MemoryStore::new();
        let sync = SheetSynchronizer::new(&store).with_dedup(DedupMode::TransactionId);
        sync.sync(STORE, TABLE, &[rent()]).await.unwrap();

        let mut edited = rent();
        edited.amount = Amount::new(Decimal::from_str("-1250.00").unwrap());
        let report = sync.sync(STORE, TABLE, &[edited]).await.unwrap();
        assert_eq!(report.appended, 0);
    }

    #[tokio::test]
    async fn synced_rows_read_back_as_transactions() {
        let store = MemoryStore::new();
        let batch = vec![salary(), rent()];
        SheetSynchronizer::new(&store)
            .sync(STORE, TABLE, &batch)
            .await
            .unwrap();

        let rows = store.read_rows(&table(&store).await).await.unwrap();
        let back: Vec<Transaction> = rows[1..]
            .iter()
            .map(|r| Transaction::from_row(r).unwrap())
            .collect();
        assert_eq!(back, batch);
    }

    #[tokio::test]
    async fn unparseable_amount_cells_are_not_highlighted() {
        let store = MemoryStore::new();
        let t = table(&store).await;
        let header: Vec<String> = TRANSACTION_COLUMNS.map(String::from).to_vec();
        let manual = vec![
            "01/01/2024".to_string(),
            "n/a".to_string(),
            "OUTROS GASTOS".to_string(),
            "manual".to_string(),
            "m".to_string(),
        ];
        store.write_rows(&t, 1, &[header, manual]).await.unwrap();

        let report = SheetSynchronizer::new(&store)
            .sync(STORE, TABLE, &[rent()])
            .await
            .unwrap();
        assert_eq!(report.appended, 1);
        assert_eq!(report.highlighted, 1);
        let formats = store.formats(&t).unwrap();
        assert!(formats.iter().any(|(r, _)| r.to_string() == "B3"));
        assert!(!formats.iter().any(|(r, _)| r.to_string() == "B2"));
    }

    #[tokio::test]
    async fn sync_against_sqlite_store() {
        let store = crate::db::SqliteStore::in_memory().await.unwrap();
        let sync = SheetSynchronizer::new(&store);
        sync.sync(STORE, TABLE, &[rent(), salary()]).await.unwrap();
        let report = sync.sync(STORE, TABLE, &[rent()]).await.unwrap();
        assert_eq!(report.appended, 0);
        assert!(!report.header_written);
    }
}
