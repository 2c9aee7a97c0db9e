//! tafsir-generate: the batch commentary pipeline
//!
//! Enumerates outstanding work over the reference corpus, drives a provider
//! with retry, cleans model output and appends results to section documents.

pub mod corpus;
pub mod layer;
pub mod orchestrator;
pub mod postprocess;
pub mod provider;
pub mod translate_batch;
pub mod unit_space;

pub use corpus::{ReferenceCorpus, Section, SubUnit};
pub use layer::{LAYERS, Layer, PromptContext, VARIANTS, Variant, layer, variant};
pub use orchestrator::{BatchOrchestrator, RunOptions, RunSummary};
pub use postprocess::{DEFAULT_PREFIX_PATTERNS, TextPostProcessor, Truncation};
pub use provider::{ChatConfig, ChatProvider, CostCeiling, GoogleTranslate, Provider};
pub use translate_batch::{BatchReport, SectionOutcome, TranslateBatch};
pub use unit_space::{ConfigError, GenerationTask, UnitSpace, validate_range};
