//! History (C9): attempt recording and per-phoneme mastery aggregation.

pub mod memory;
pub mod port;
pub mod types;

#[cfg(feature = "sqlite-history")]
pub mod sqlite;

pub use memory::InMemoryHistory;
pub use port::HistoryPort;
#[cfg(feature = "sqlite-history")]
pub use sqlite::SqliteHistory;
pub use types::*;
