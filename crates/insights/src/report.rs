use chrono::NaiveDateTime;
use extrato_core::Transaction;
use extrato_storage::{CellFormat, CellRange, StoreError, TableRef, TabularStore};

use crate::generator::{InsightsError, TextGenerator};
use crate::summary::{summarize, to_markdown, MonthlySummary};

pub const INSIGHTS_TABLE: &str = "Análises";
pub const INSIGHTS_ROWS: u32 = 100;
pub const INSIGHTS_COLS: u32 = 2;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

pub fn build_prompt(summaries: &[MonthlySummary]) -> String {
    format!(
        "Analise estas transações bancárias e responda em português brasileiro:\n\
         {}\n\
         Principais solicitações:\n\
         1. Identifique os 3 maiores gastos do mês.\n\
         2. Compare com o mês anterior (% de variação).\n\
         3. Sugira categorias para otimização de custos.\n\
         4. Destaque padrões incomuns.",
        to_markdown(summaries)
    )
}

/// Summarizes `transactions` by month and asks the model about them.
pub async fn generate_insights<G: TextGenerator>(
    generator: &G,
    transactions: &[Transaction],
) -> Result<String, InsightsError> {
    let summaries = summarize(transactions);
    if summaries.is_empty() {
        return Err(InsightsError::NoTransactions);
    }
    let text = generator.generate(&build_prompt(&summaries)).await?;
    tracing::info!(months = summaries.len(), chars = text.len(), "insights generated");
    Ok(text)
}

/// Replaces the insights sub-table with a timestamp row and the analysis text.
pub async fn write_insights<S: TabularStore>(
    store: &S,
    store_name: &str,
    table_name: &str,
    text: &str,
    at: NaiveDateTime,
) -> Result<TableRef, StoreError> {
    let store_ref = store.open_or_create_store(store_name).await?;
    let table = store
        .open_or_create_table(&store_ref, table_name, INSIGHTS_ROWS, INSIGHTS_COLS)
        .await?;

    store.clear(&table).await?;
    let rows = vec![
        vec!["Data da Análise".to_string(), at.format(TIMESTAMP_FORMAT).to_string()],
        vec!["Análise".to_string(), text.to_string()],
    ];
    store.write_rows(&table, 1, &rows).await?;
    store
        .format(&table, &CellRange::columns(1, 2), &CellFormat::wrapped())
        .await?;

    tracing::info!(%table, "insights written");
    Ok(table)
}
