use anyhow::{Context, Result};
use extrato_storage::{
    CellFormat, CellRange, MemoryStore, SqliteStore, StoreError, StoreRef, TableRef, TabularStore,
};

use crate::config::{Backend, Config};

/// The store selected by `[store] backend`.
pub enum Store {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl Store {
    pub async fn open(cfg: &Config) -> Result<Self> {
        match cfg.store.backend {
            Backend::Memory => {
                tracing::warn!("memory backend selected; nothing will be persisted");
                Ok(Store::Memory(MemoryStore::new()))
            }
            Backend::Sqlite => {
                let path = cfg.database_path()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
                let store = SqliteStore::open(&path)
                    .await
                    .with_context(|| format!("open database {}", path.display()))?;
                tracing::debug!(path = %path.display(), "database opened");
                Ok(Store::Sqlite(store))
            }
        }
    }
}

impl TabularStore for Store {
    async fn open_or_create_store(&self, name: &str) -> Result<StoreRef, StoreError> {
        match self {
            Store::Sqlite(s) => s.open_or_create_store(name).await,
            Store::Memory(s) => s.open_or_create_store(name).await,
        }
    }

    async fn open_or_create_table(
        &self,
        store: &StoreRef,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> Result<TableRef, StoreError> {
        match self {
            Store::Sqlite(s) => s.open_or_create_table(store, name, rows, cols).await,
            Store::Memory(s) => s.open_or_create_table(store, name, rows, cols).await,
        }
    }

    async fn row_count(&self, table: &TableRef) -> Result<usize, StoreError> {
        match self {
            Store::Sqlite(s) => s.row_count(table).await,
            Store::Memory(s) => s.row_count(table).await,
        }
    }

    async fn read_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, StoreError> {
        match self {
            Store::Sqlite(s) => s.read_rows(table).await,
            Store::Memory(s) => s.read_rows(table).await,
        }
    }

    async fn write_rows(
        &self,
        table: &TableRef,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.write_rows(table, start_row, rows).await,
            Store::Memory(s) => s.write_rows(table, start_row, rows).await,
        }
    }

    async fn format(
        &self,
        table: &TableRef,
        range: &CellRange,
        format: &CellFormat,
    ) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.format(table, range, format).await,
            Store::Memory(s) => s.format(table, range, format).await,
        }
    }

    async fn clear(&self, table: &TableRef) -> Result<(), StoreError> {
        match self {
            Store::Sqlite(s) => s.clear(table).await,
            Store::Memory(s) => s.clear(table).await,
        }
    }
}
