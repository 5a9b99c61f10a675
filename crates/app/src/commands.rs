use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use extrato_core::Transaction;
use extrato_email::{Mailbox, StatementIntake};
use extrato_import::import::{import_statement_file, load_rules};
use extrato_import::CategoryRuleSet;
use extrato_insights::{generate_insights, write_insights, TextGenerator};
use extrato_storage::{SheetSynchronizer, SyncReport, TabularStore, TABLE_COLS, TABLE_ROWS};
use std::path::Path;

use crate::config::Config;

/// Totals across one mailbox run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxRun {
    pub processed: usize,
    pub failed: usize,
    pub appended: usize,
    pub skipped: usize,
}

pub fn rules(cfg: &Config) -> Result<CategoryRuleSet> {
    let content = match &cfg.rules.path {
        Some(p) => Some(
            std::fs::read_to_string(p).with_context(|| format!("read rules {}", p.display()))?,
        ),
        None => None,
    };
    load_rules(content.as_deref()).context("load category rules")
}

/// Imports and syncs every pending statement message. A failing message is
/// logged and left in the inbox; the run goes on with the next one. Messages
/// are marked processed only once their rows are in the store.
pub async fn sync_mailbox<S: TabularStore, M: Mailbox>(
    store: &S,
    mailbox: &M,
    rules: &CategoryRuleSet,
    cfg: &Config,
) -> Result<MailboxRun> {
    let intake = StatementIntake::new(mailbox, rules);
    let synchronizer = SheetSynchronizer::new(store).with_dedup(cfg.store.dedup);
    let mut run = MailboxRun::default();

    let pending = intake.pending().await.context("list statement messages")?;
    tracing::info!(count = pending.len(), "statement messages pending");

    for message in pending {
        let batch = match intake.process_message(&message).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(message = %message.id, error = %e, "failed to process message");
                run.failed += 1;
                continue;
            }
        };

        let report = if batch.transactions.is_empty() {
            tracing::info!(message = %message.id, "message had no statement attachments");
            SyncReport::default()
        } else {
            match synchronizer
                .sync(&cfg.store.name, &cfg.store.transactions_sheet, &batch.transactions)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(message = %message.id, error = %e, "failed to update store");
                    run.failed += 1;
                    continue;
                }
            }
        };
        run.appended += report.appended;
        run.skipped += report.skipped;

        if let Err(e) = intake.mark_processed(&message).await {
            // Rows are stored; the next run will dedup them.
            tracing::warn!(message = %message.id, error = %e, "failed to mark message processed");
            run.failed += 1;
            continue;
        }
        run.processed += 1;
    }

    Ok(run)
}

pub async fn import_file<S: TabularStore>(
    store: &S,
    path: &Path,
    rules: &CategoryRuleSet,
    cfg: &Config,
) -> Result<SyncReport> {
    let batch = import_statement_file(path, rules)
        .with_context(|| format!("import {}", path.display()))?;
    let report = SheetSynchronizer::new(store)
        .with_dedup(cfg.store.dedup)
        .sync(&cfg.store.name, &cfg.store.transactions_sheet, batch.transactions())
        .await
        .context("update store")?;
    Ok(report)
}

/// Reads the transactions sheet back. Rows that do not parse are logged and skipped.
pub async fn stored_transactions<S: TabularStore>(store: &S, cfg: &Config) -> Result<Vec<Transaction>> {
    let store_ref = store.open_or_create_store(&cfg.store.name).await?;
    let table = store
        .open_or_create_table(&store_ref, &cfg.store.transactions_sheet, TABLE_ROWS, TABLE_COLS)
        .await?;
    let rows = store.read_rows(&table).await?;

    let mut out = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(1) {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        match Transaction::from_row(row) {
            Ok(tx) => out.push(tx),
            Err(e) => tracing::warn!(row = idx + 1, error = %e, "skipping unreadable row"),
        }
    }
    Ok(out)
}

/// Summarizes the stored transactions, asks the model, and overwrites the insights sheet.
pub async fn run_insights<S: TabularStore, G: TextGenerator>(
    store: &S,
    generator: &G,
    cfg: &Config,
    at: NaiveDateTime,
) -> Result<String> {
    let transactions = stored_transactions(store, cfg).await?;
    let text = generate_insights(generator, &transactions)
        .await
        .context("generate insights")?;
    write_insights(store, &cfg.store.name, &cfg.store.insights_sheet, &text, at)
        .await
        .context("write insights")?;
    Ok(text)
}
