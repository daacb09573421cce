//! Text-to-IPA port (C5), lexicon backend, and result cache (C6).

pub mod cache;
pub mod lexicon;
pub mod port;
pub mod types;

pub use cache::{CacheConfig, CacheStats, TextRefCache};
pub use lexicon::LexiconTextRef;
pub use port::{G2pFallback, TextRefProvider};
pub use types::*;
