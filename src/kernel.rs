//! C8 — Kernel
//!
//! Composes the preprocessor, ASR, text-to-IPA, and comparator stages
//! behind a single `run` entry point, enforcing the `output_type = ipa`
//! plugin contract at composition time and an explicit lifecycle state
//! machine at runtime.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::asr::{ASRBackend, OutputType};
use crate::audio::{AudioHandle, Preprocessor};
use crate::comparator::{compare, CompareResult, Weights};
use crate::error::{KernelError, Stage};
use crate::ipa::{normalize, tokenize, NormalizeOptions, TokenizeOptions};
use crate::textref::TextRefProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Created,
    Ready,
    Running,
    TornDown,
    Failed,
}

/// `require_ipa = false` is an escape hatch for diagnostic plumbing only;
/// the default pipeline rejects an ASR backend that doesn't declare `Ipa`.
pub struct KernelConfig {
    pub require_ipa: bool,
    pub default_lang: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            require_ipa: true,
            default_lang: "es".to_string(),
        }
    }
}

pub struct Kernel {
    preprocessor: Mutex<Box<dyn Preprocessor>>,
    asr: Mutex<Box<dyn ASRBackend>>,
    textref: Mutex<Box<dyn TextRefProvider>>,
    config: KernelConfig,
    state: Mutex<KernelState>,
}

impl Kernel {
    /// Validates the `output_type = ipa` contract at construction time
    /// (§4.8/§9: rejection happens at composition, not at first `run`).
    pub fn new(
        preprocessor: Box<dyn Preprocessor>,
        asr: Box<dyn ASRBackend>,
        textref: Box<dyn TextRefProvider>,
        config: KernelConfig,
    ) -> Result<Self, KernelError> {
        if asr.output_type() != OutputType::Ipa && config.require_ipa {
            return Err(KernelError::Configuration {
                message: format!(
                    "ASR plugin declares output_type {:?}: must produce 'text', no IPA",
                    asr.output_type()
                ),
            });
        }

        Ok(Self {
            preprocessor: Mutex::new(preprocessor),
            asr: Mutex::new(asr),
            textref: Mutex::new(textref),
            config,
            state: Mutex::new(KernelState::Created),
        })
    }

    pub async fn state(&self) -> KernelState {
        *self.state.lock().await
    }

    /// `Created` → `Ready`. Calls each plugin's `setup` in declared order;
    /// a failure transitions to `Failed` and propagates.
    pub async fn setup(&self) -> Result<(), KernelError> {
        let mut preprocessor = self.preprocessor.lock().await;
        if let Err(err) = preprocessor.setup().await {
            *self.state.lock().await = KernelState::Failed;
            error!(stage = %Stage::Preprocess, error = %err, "kernel setup failed");
            return Err(KernelError::backend(Stage::Preprocess, err));
        }
        drop(preprocessor);

        let mut asr = self.asr.lock().await;
        if let Err(err) = asr.setup().await {
            *self.state.lock().await = KernelState::Failed;
            error!(stage = %Stage::Asr, error = %err, "kernel setup failed");
            return Err(KernelError::backend(Stage::Asr, err));
        }
        drop(asr);

        let mut textref = self.textref.lock().await;
        if let Err(err) = textref.setup().await {
            *self.state.lock().await = KernelState::Failed;
            error!(stage = %Stage::TextRef, error = %err, "kernel setup failed");
            return Err(KernelError::backend(Stage::TextRef, err));
        }
        drop(textref);

        *self.state.lock().await = KernelState::Ready;
        info!("kernel ready");
        Ok(())
    }

    /// `Ready` → `TornDown`. Reverse order; idempotent; logs and swallows
    /// individual plugin teardown errors rather than failing the whole
    /// shutdown.
    pub async fn teardown(&self) {
        if let Err(err) = self.textref.lock().await.teardown().await {
            warn!(stage = %Stage::TextRef, error = %err, "teardown error (ignored)");
        }
        if let Err(err) = self.asr.lock().await.teardown().await {
            warn!(stage = %Stage::Asr, error = %err, "teardown error (ignored)");
        }
        if let Err(err) = self.preprocessor.lock().await.teardown().await {
            warn!(stage = %Stage::Preprocess, error = %err, "teardown error (ignored)");
        }
        *self.state.lock().await = KernelState::TornDown;
        info!("kernel torn down");
    }

    /// `run(audio, text, lang?) → CompareResult` (§4.8 pipeline, steps 1-5).
    pub async fn run(
        &self,
        audio: AudioHandle,
        text: &str,
        lang: Option<&str>,
        weights: Option<&Weights>,
    ) -> Result<CompareResult, KernelError> {
        if self.state().await != KernelState::Ready {
            return Err(KernelError::NotReady { stage: Stage::Preprocess });
        }
        *self.state.lock().await = KernelState::Running;

        let result = self.run_pipeline(audio, text, lang, weights).await;

        // A run never leaves the kernel stuck in Running: success or
        // failure, the kernel returns to Ready for the next call.
        *self.state.lock().await = KernelState::Ready;
        result
    }

    async fn run_pipeline(
        &self,
        audio: AudioHandle,
        text: &str,
        lang: Option<&str>,
        weights: Option<&Weights>,
    ) -> Result<CompareResult, KernelError> {
        if text.trim().is_empty() {
            return Err(KernelError::Validation {
                message: "text must not be empty".to_string(),
            });
        }

        let processed = {
            let preprocessor = self.preprocessor.lock().await;
            preprocessor
                .process(audio)
                .map_err(|e| KernelError::backend(Stage::Preprocess, e))?
        };

        let asr_out = {
            let asr = self.asr.lock().await;
            asr.transcribe(&processed, lang)
                .await
                .map_err(|e| KernelError::backend(Stage::Asr, e))?
        };

        let normalize_opts = NormalizeOptions::default();
        let tokenize_opts = TokenizeOptions::default();

        let hyp_joined = asr_out.tokens.join(" ");
        let hyp = tokenize(&normalize(&hyp_joined, &normalize_opts), &tokenize_opts);

        let resolved_lang = lang.unwrap_or(&self.config.default_lang);
        let ref_out = {
            let textref = self.textref.lock().await;
            textref
                .to_ipa(text, Some(resolved_lang))
                .await
                .map_err(|e| KernelError::backend(Stage::TextRef, e))?
        };
        let ref_joined = ref_out.tokens.join(" ");
        let r#ref = tokenize(&normalize(&ref_joined, &normalize_opts), &tokenize_opts);

        Ok(compare(&r#ref, &hyp, weights))
    }
}

/// Shared, clonable handle to a kernel for multi-task use.
pub type SharedKernel = Arc<Kernel>;
