//! ASR port (C4)
//!
//! Defines the contract the kernel composes against; concrete backends
//! (Whisper or otherwise) live outside this crate.

pub mod port;
pub mod types;

pub use port::ASRBackend;
pub use types::*;
