pub mod category;
pub mod money;
pub mod period;
pub mod transaction;

pub use category::Category;
pub use money::{Amount, AmountError};
pub use period::MonthKey;
pub use transaction::{
    RowError, Transaction, UnvalidatedBatch, UnvalidatedTransaction, REQUIRED_COLUMNS,
    ROW_DATE_FORMAT, TRANSACTION_COLUMNS,
};
