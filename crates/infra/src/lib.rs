//! Infrastructure layer: storage, configuration and the stock ledger.

pub mod config;
pub mod error;
pub mod ledger;
pub mod retry;
pub mod store;

mod integration_tests;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::StockLedger;
pub use retry::CasRetryPolicy;
pub use store::{InMemoryStockStore, StockStore, StoreError};
