//! Top-level error taxonomy (§7).
//!
//! Component errors (`AudioError`, `ASRError`, `TextRefError`) stay in
//! their own modules; `KernelError` is what `Kernel::run` returns, wrapping
//! a plugin failure with the stage it happened in.

use thiserror::Error;

/// Which pipeline stage a `KernelError::Backend` originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Asr,
    TextRef,
    Compare,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Preprocess => "preprocess",
            Stage::Asr => "asr",
            Stage::TextRef => "textref",
            Stage::Compare => "compare",
        };
        write!(f, "{s}")
    }
}

/// Errors the kernel surfaces to callers. Never swallowed internally —
/// plugin errors are annotated with `stage` and re-raised, not retried or
/// papered over with a fallback.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("plugin not ready (stage: {stage})")]
    NotReady { stage: Stage },

    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("pack integrity error: {message}")]
    Integrity { message: String },

    #[error("backend failure at stage {stage}: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl KernelError {
    pub fn backend(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        KernelError::Backend {
            stage,
            source: source.into(),
        }
    }
}
