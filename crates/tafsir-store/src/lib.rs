//! tafsir-store: per-section commentary documents on disk
//!
//! One JSON file per section maps sub-unit ids to layer keys to text.
//! Documents only ever grow: existing non-empty values are never replaced
//! by the pipeline, and every save is an atomic tmp + rename.

pub mod document;
pub mod key;
pub mod store;

pub use document::Document;
pub use key::{
    LayerKey, SHORT_FORM_LAYER, generation_sentinel, is_failure_sentinel, parse_layer_key,
    translation_sentinel,
};
pub use store::{DocumentStore, cleanup_tmp_files};
