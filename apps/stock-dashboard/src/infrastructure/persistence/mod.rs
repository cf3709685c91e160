//! Quote Store Adapters
//!
//! Implementations of `QuoteWriterPort` and `QuoteReaderPort`.
//!
//! - `QuestDbQuoteStore`: QuestDB over the PostgreSQL wire protocol
//! - `InMemoryQuoteStore`: process-local store for tests and development

mod in_memory;
mod questdb;

pub use in_memory::InMemoryQuoteStore;
pub use questdb::{
    DEFAULT_DATABASE_URL, QuestDbConfig, QuestDbQuoteStore, StoreInitError, StoreSchema,
};
