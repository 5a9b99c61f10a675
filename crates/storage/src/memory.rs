use std::sync::{Mutex, MutexGuard};

use crate::sheet::{CellFormat, CellRange, StoreError, StoreRef, TableRef, TabularStore};

#[derive(Debug, Default)]
struct Table {
    store_id: i64,
    name: String,
    row_capacity: u32,
    col_capacity: u32,
    rows: Vec<Vec<String>>,
    formats: Vec<(CellRange, CellFormat)>,
}

impl Table {
    fn populated_len(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }
}

#[derive(Debug, Default)]
struct Inner {
    stores: Vec<String>,
    tables: Vec<Table>,
}

/// Process-local store. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Remote("memory store lock poisoned".to_string()))
    }

    /// Formats applied to a table, in application order.
    pub fn formats(&self, table: &TableRef) -> Result<Vec<(CellRange, CellFormat)>, StoreError> {
        let inner = self.lock()?;
        let t = table_at(&inner, table.id)?;
        Ok(t.formats.clone())
    }

    /// `(rows, cols)` capacity of a table.
    pub fn capacity(&self, table: &TableRef) -> Result<(u32, u32), StoreError> {
        let inner = self.lock()?;
        let t = table_at(&inner, table.id)?;
        Ok((t.row_capacity, t.col_capacity))
    }

    pub fn store_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.stores.clone())
    }
}

fn table_at(inner: &Inner, id: i64) -> Result<&Table, StoreError> {
    usize::try_from(id)
        .ok()
        .and_then(|i| inner.tables.get(i))
        .ok_or(StoreError::UnknownTable(id))
}

fn table_at_mut(inner: &mut Inner, id: i64) -> Result<&mut Table, StoreError> {
    usize::try_from(id)
        .ok()
        .and_then(|i| inner.tables.get_mut(i))
        .ok_or(StoreError::UnknownTable(id))
}

impl TabularStore for MemoryStore {
    async fn open_or_create_store(&self, name: &str) -> Result<StoreRef, StoreError> {
        let mut inner = self.lock()?;
        let idx = match inner.stores.iter().position(|s| s == name) {
            Some(idx) => idx,
            None => {
                inner.stores.push(name.to_string());
                inner.stores.len() - 1
            }
        };
        Ok(StoreRef {
            id: idx as i64,
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
        let mut inner = self.lock()?;
        let existing = inner
            .tables
            .iter()
            .position(|t| t.store_id == store.id && t.name == name);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                inner.tables.push(Table {
                    store_id: store.id,
                    name: name.to_string(),
                    row_capacity: rows,
                    col_capacity: cols,
                    ..Default::default()
                });
                inner.tables.len() - 1
            }
        };
        Ok(TableRef {
            id: idx as i64,
            store: store.name.clone(),
            name: name.to_string(),
        })
    }

    async fn row_count(&self, table: &TableRef) -> Result<usize, StoreError> {
        let inner = self.lock()?;
        Ok(table_at(&inner, table.id)?.populated_len())
    }

    async fn read_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, StoreError> {
        let inner = self.lock()?;
        let t = table_at(&inner, table.id)?;
        Ok(t.rows[..t.populated_len()].to_vec())
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
        let mut inner = self.lock()?;
        let t = table_at_mut(&mut inner, table.id)?;
        let end = start_row - 1 + rows.len();
        if t.rows.len() < end {
            t.rows.resize_with(end, Vec::new);
        }
        for (offset, row) in rows.iter().enumerate() {
            t.rows[start_row - 1 + offset] = row.clone();
        }
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        t.row_capacity = t.row_capacity.max(end as u32);
        t.col_capacity = t.col_capacity.max(widest);
        Ok(())
    }

    async fn format(
        &self,
        table: &TableRef,
        range: &CellRange,
        format: &CellFormat,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let t = table_at_mut(&mut inner, table.id)?;
        match t.formats.iter_mut().find(|(r, _)| r == range) {
            Some((_, existing)) => *existing = existing.merge(format),
            None => t.formats.push((*range, format.clone())),
        }
        Ok(())
    }

    async fn clear(&self, table: &TableRef) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let t = table_at_mut(&mut inner, table.id)?;
        t.rows.clear();
        t.formats.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let store = MemoryStore::new();
        let a = store.open_or_create_store("Controle Financeiro").await.unwrap();
        let b = store.open_or_create_store("Controle Financeiro").await.unwrap();
        assert_eq!(a, b);
        let t1 = store.open_or_create_table(&a, "Transações", 100, 20).await.unwrap();
        let t2 = store.open_or_create_table(&a, "Transações", 5, 5).await.unwrap();
        assert_eq!(t1, t2);
        assert_eq!(store.capacity(&t1).unwrap(), (100, 20));
        assert_eq!(store.store_names().unwrap(), vec!["Controle Financeiro"]);
    }

    #[tokio::test]
    async fn same_table_name_in_two_stores_is_distinct() {
        let store = MemoryStore::new();
        let a = store.open_or_create_store("A").await.unwrap();
        let b = store.open_or_create_store("B").await.unwrap();
        let ta = store.open_or_create_table(&a, "T", 10, 2).await.unwrap();
        let tb = store.open_or_create_table(&b, "T", 10, 2).await.unwrap();
        assert_ne!(ta.id, tb.id);
    }

    #[tokio::test]
    async fn write_then_read() {
        let store = MemoryStore::new();
        let s = store.open_or_create_store("S").await.unwrap();
        let t = store.open_or_create_table(&s, "T", 10, 2).await.unwrap();
        assert_eq!(store.row_count(&t).await.unwrap(), 0);

        store.write_rows(&t, 1, &[row(&["h1", "h2"])]).await.unwrap();
        store.write_rows(&t, 3, &[row(&["c", "d"])]).await.unwrap();

        assert_eq!(store.row_count(&t).await.unwrap(), 3);
        let rows = store.read_rows(&t).await.unwrap();
        assert_eq!(rows, vec![row(&["h1", "h2"]), vec![], row(&["c", "d"])]);
    }

    #[tokio::test]
    async fn write_past_capacity_grows_table() {
        let store = MemoryStore::new();
        let s = store.open_or_create_store("S").await.unwrap();
        let t = store.open_or_create_table(&s, "T", 1, 1).await.unwrap();
        store.write_rows(&t, 2, &[row(&["a", "b", "c"])]).await.unwrap();
        assert_eq!(store.capacity(&t).unwrap(), (2, 3));
    }

    #[tokio::test]
    async fn formats_merge_on_same_range() {
        let store = MemoryStore::new();
        let s = store.open_or_create_store("S").await.unwrap();
        let t = store.open_or_create_table(&s, "T", 10, 2).await.unwrap();
        let range = CellRange::cell(2, 2);
        store.format(&t, &range, &CellFormat::negative_amount()).await.unwrap();
        store.format(&t, &range, &CellFormat::negative_amount()).await.unwrap();
        assert_eq!(store.formats(&t).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_rows_and_formats() {
        let store = MemoryStore::new();
        let s = store.open_or_create_store("S").await.unwrap();
        let t = store.open_or_create_table(&s, "T", 10, 2).await.unwrap();
        store.write_rows(&t, 1, &[row(&["x"])]).await.unwrap();
        store.format(&t, &CellRange::cell(1, 1), &CellFormat::wrapped()).await.unwrap();
        store.clear(&t).await.unwrap();
        assert_eq!(store.row_count(&t).await.unwrap(), 0);
        assert!(store.formats(&t).unwrap().is_empty());
    }

    #[tokio::test]
    async fn write_at_row_zero_is_rejected() {
        let store = MemoryStore::new();
        let s = store.open_or_create_store("S").await.unwrap();
        let t = store.open_or_create_table(&s, "T", 10, 2).await.unwrap();
        assert!(matches!(
            store.write_rows(&t, 0, &[row(&["x"])]).await,
            Err(StoreError::InvalidRange(_))
        ));
    }
}
