use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use crate::sheet::{CellFormat, CellRange, StoreError, StoreRef, TableRef, TabularStore};

pub type DbPool = Pool<Sqlite>;

/// Tabular store persisted in a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: DbPool) -> Result<Self, StoreError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Formats applied to a table, ordered by range text.
    pub async fn formats(&self, table: &TableRef) -> Result<Vec<(CellRange, CellFormat)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT range, format FROM sheet_formats WHERE sheet_id = ? ORDER BY range",
        )
        .bind(table.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(range, format)| -> Result<_, StoreError> {
                Ok((range.parse::<CellRange>()?, serde_json::from_str::<CellFormat>(&format)?))
            })
            .collect()
    }

    /// `(rows, cols)` capacity of a table.
    pub async fn capacity(&self, table: &TableRef) -> Result<(u32, u32), StoreError> {
        let (rows, cols) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT row_capacity, col_capacity FROM sheets WHERE id = ?",
        )
        .bind(table.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::UnknownTable(table.id))?;
        Ok((rows as u32, cols as u32))
    }
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            store_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            row_capacity INTEGER NOT NULL,
            col_capacity INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (store_id, name),
            FOREIGN KEY (store_id) REFERENCES stores(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_rows (
            sheet_id INTEGER NOT NULL,
            row_index INTEGER NOT NULL,
            cells TEXT NOT NULL,
            PRIMARY KEY (sheet_id, row_index),
            FOREIGN KEY (sheet_id) REFERENCES sheets(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_formats (
            sheet_id INTEGER NOT NULL,
            range TEXT NOT NULL,
            format TEXT NOT NULL,
            PRIMARY KEY (sheet_id, range),
            FOREIGN KEY (sheet_id) REFERENCES sheets(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

impl TabularStore for SqliteStore {
    async fn open_or_create_store(&self, name: &str) -> Result<StoreRef, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO stores (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let (id,) = sqlx::query_as::<_, (i64,)>("SELECT id FROM stores WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreRef {
            id,
            name: name.to_string(),
        })
    }

    async fn open_or_create_table(
        &self,
        store: &StoreRef,
        name: &str,
        rows: u32,
        cols: u32,
    ) -> Result<TableRef, StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO sheets (store_id, name, row_capacity, col_capacity) VALUES (?, ?, ?, ?)",
        )
        .bind(store.id)
        .bind(name)
        .bind(i64::from(rows))
        .bind(i64::from(cols))
        .execute(&self.pool)
        .await?;

        let (id,) = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM sheets WHERE store_id = ? AND name = ?",
        )
        .bind(store.id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(TableRef {
            id,
            store: store.name.clone(),
            name: name.to_string(),
        })
    }

    async fn row_count(&self, table: &TableRef) -> Result<usize, StoreError> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COALESCE(MAX(row_index), 0) FROM sheet_rows WHERE sheet_id = ?",
        )
        .bind(table.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }

    async fn read_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, StoreError> {
        let populated = self.row_count(table).await?;
        let stored = sqlx::query_as::<_, (i64, String)>(
            "SELECT row_index, cells FROM sheet_rows WHERE sheet_id = ? AND row_index <= ? ORDER BY row_index",
        )
        .bind(table.id)
        .bind(populated as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut rows = vec![Vec::new(); populated];
        for (row_index, cells) in stored {
            if let Some(slot) = rows.get_mut((row_index as usize).saturating_sub(1)) {
                *slot = serde_json::from_str(&cells)?;
            }
        }
        Ok(rows)
    }

    async fn write_rows(
        &self,
        table: &TableRef,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        if start_row == 0 {
            return Err(StoreError::InvalidRange("row 0".to_string()));
        }
        let mut tx = self.pool.begin().await?;

        for (offset, row) in rows.iter().enumerate() {
            let row_index = (start_row + offset) as i64;
            if row.iter().all(String::is_empty) {
                sqlx::query("DELETE FROM sheet_rows WHERE sheet_id = ? AND row_index = ?")
                    .bind(table.id)
                    .bind(row_index)
                    .execute(&mut *tx)
                    .await?;
                continue;
            }
            let cells = serde_json::to_string(row)?;
            sqlx::query(
                "INSERT INTO sheet_rows (sheet_id, row_index, cells) VALUES (?, ?, ?)
                 ON CONFLICT (sheet_id, row_index) DO UPDATE SET cells = excluded.cells",
            )
            .bind(table.id)
            .bind(row_index)
            .bind(cells)
            .execute(&mut *tx)
            .await?;
        }

        let last_row = (start_row - 1 + rows.len()) as i64;
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0) as i64;
        sqlx::query(
            "UPDATE sheets SET row_capacity = MAX(row_capacity, ?), col_capacity = MAX(col_capacity, ?) WHERE id = ?",
        )
        .bind(last_row)
        .bind(widest)
        .bind(table.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn format(
        &self,
        table: &TableRef,
        range: &CellRange,
        format: &CellFormat,
    ) -> Result<(), StoreError> {
        let key = range.to_string();
        let existing = sqlx::query_as::<_, (String,)>(
            "SELECT format FROM sheet_formats WHERE sheet_id = ? AND range = ?",
        )
        .bind(table.id)
        .bind(&key)
        .fetch_optional(&self.pool)
        .await?;

        let merged = match existing {
            Some((json,)) => serde_json::from_str::<CellFormat>(&json)?.merge(format),
            None => format.clone(),
        };

        sqlx::query(
            "INSERT INTO sheet_formats (sheet_id, range, format) VALUES (?, ?, ?)
             ON CONFLICT (sheet_id, range) DO UPDATE SET format = excluded.format",
        )
        .bind(table.id)
        .bind(&key)
        .bind(serde_json::to_string(&merged)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, table: &TableRef) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sheet_rows WHERE sheet_id = ?")
            .bind(table.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sheet_formats WHERE sheet_id = ?")
            .bind(table.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
