//! Capability-keyed plugin registry (§9 REDESIGN FLAGS).
//!
//! Replaces the source's dynamic by-name plugin loading with an explicit,
//! composition-time mapping from string names to constructors. Unknown
//! names fail at registration/composition, never at first use.

use std::collections::HashMap;
use std::sync::Arc;

use crate::asr::ASRBackend;
use crate::audio::Preprocessor;
use crate::history::HistoryPort;
use crate::textref::TextRefProvider;

type AsrCtor = Arc<dyn Fn() -> Box<dyn ASRBackend> + Send + Sync>;
type PreprocessorCtor = Arc<dyn Fn() -> Box<dyn Preprocessor> + Send + Sync>;
type TextRefCtor = Arc<dyn Fn() -> Box<dyn TextRefProvider> + Send + Sync>;
type HistoryCtor = Arc<dyn Fn() -> Box<dyn HistoryPort> + Send + Sync>;

/// Holds constructors for each pluggable capability, keyed by name. The
/// kernel looks plugins up here at composition time rather than resolving
/// them dynamically at first use.
#[derive(Default, Clone)]
pub struct Registry {
    asr: HashMap<String, AsrCtor>,
    preprocessor: HashMap<String, PreprocessorCtor>,
    textref: HashMap<String, TextRefCtor>,
    history: HashMap<String, HistoryCtor>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no {capability} plugin registered under name '{name}'")]
    Unknown { capability: &'static str, name: String },
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_asr(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Box<dyn ASRBackend> + Send + Sync + 'static,
    ) {
        self.asr.insert(name.into(), Arc::new(ctor));
    }

    pub fn register_preprocessor(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Box<dyn Preprocessor> + Send + Sync + 'static,
    ) {
        self.preprocessor.insert(name.into(), Arc::new(ctor));
    }

    pub fn register_textref(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Box<dyn TextRefProvider> + Send + Sync + 'static,
    ) {
        self.textref.insert(name.into(), Arc::new(ctor));
    }

    pub fn register_history(
        &mut self,
        name: impl Into<String>,
        ctor: impl Fn() -> Box<dyn HistoryPort> + Send + Sync + 'static,
    ) {
        self.history.insert(name.into(), Arc::new(ctor));
    }

    pub fn build_asr(&self, name: &str) -> Result<Box<dyn ASRBackend>, RegistryError> {
        self.asr
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| RegistryError::Unknown {
                capability: "ASR",
                name: name.to_string(),
            })
    }

    pub fn build_preprocessor(&self, name: &str) -> Result<Box<dyn Preprocessor>, RegistryError> {
        self.preprocessor
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| RegistryError::Unknown {
                capability: "preprocessor",
                name: name.to_string(),
            })
    }

    pub fn build_textref(&self, name: &str) -> Result<Box<dyn TextRefProvider>, RegistryError> {
        self.textref
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| RegistryError::Unknown {
                capability: "TextRef",
                name: name.to_string(),
            })
    }

    pub fn build_history(&self, name: &str) -> Result<Box<dyn HistoryPort>, RegistryError> {
        self.history
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| RegistryError::Unknown {
                capability: "History",
                name: name.to_string(),
            })
    }
}
