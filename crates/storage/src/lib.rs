pub mod db;
pub mod memory;
pub mod sheet;
pub mod sync;

pub use db::{DbPool, SqliteStore};
pub use memory::MemoryStore;
pub use sheet::{
    column_letters, CellFormat, CellRange, CellRef, Color, StoreError, StoreRef, TableRef,
    TabularStore,
};
pub use sync::{plan_append, DedupMode, SheetSynchronizer, SyncReport, TABLE_COLS, TABLE_ROWS};
