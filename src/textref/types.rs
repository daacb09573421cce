//! Shared types for the text-to-IPA port (C5) and cache (C6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of `TextRefProvider::to_ipa`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToIpaOutput {
    pub tokens: Vec<String>,
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum TextRefError {
    #[error("empty text")]
    EmptyText,

    #[error("g2p fallback failed: {message}")]
    G2pFailed { message: String },
}
