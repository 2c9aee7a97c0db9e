//! The (section, sub-unit, layer[, variant]) work grid

use std::fmt;

use tafsir_store::{LayerKey, SHORT_FORM_LAYER};

use crate::corpus::{ReferenceCorpus, Section};
use crate::layer::{self, Variant};

/// Rejected run configuration. Raised before any work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownLayer(u8),
    UnknownVariant(String),
    InvalidRange { start: u32, end: u32 },
    SectionOutOfBounds { section: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLayer(n) => write!(f, "unknown layer {n} (expected 1-5)"),
            Self::UnknownVariant(code) => {
                let known: Vec<_> = layer::VARIANTS.iter().map(|v| v.code).collect();
                write!(f, "unsupported language '{code}' (supported: {})", known.join(", "))
            }
            Self::InvalidRange { start, end } => {
                write!(f, "invalid section range {start}..={end}")
            }
            Self::SectionOutOfBounds { section, max } => {
                write!(f, "section {section} is not in the corpus (1..={max})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Basic shape check for an inclusive, 1-based range.
pub fn validate_range(start: u32, end: u32) -> Result<(), ConfigError> {
    if start == 0 || start > end {
        return Err(ConfigError::InvalidRange { start, end });
    }
    Ok(())
}

/// One unit of required work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTask {
    pub section: u32,
    pub sub_unit: u32,
    pub key: LayerKey,
}

impl GenerationTask {
    pub fn layer(&self) -> u8 {
        self.key.layer
    }

    pub fn is_translation(&self) -> bool {
        self.key.is_variant()
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.section, self.sub_unit, self.key)
    }
}

/// Deterministic enumeration of tasks; knows nothing about stored documents.
#[derive(Debug, Clone)]
pub struct UnitSpace<'a> {
    corpus: &'a ReferenceCorpus,
    layers: Vec<u8>,
    variant: Option<&'static Variant>,
}

impl<'a> UnitSpace<'a> {
    /// `layers` are deduplicated and sorted. `variant` is a command-line
    /// language code; `None` means base-layer generation.
    pub fn new(
        corpus: &'a ReferenceCorpus,
        layers: &[u8],
        variant: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut layers = layers.to_vec();
        layers.sort_unstable();
        layers.dedup();
        if let Some(&bad) = layers.iter().find(|&&n| layer::layer(n).is_none()) {
            return Err(ConfigError::UnknownLayer(bad));
        }
        let variant = variant
            .map(|code| {
                layer::variant(code).ok_or_else(|| ConfigError::UnknownVariant(code.into()))
            })
            .transpose()?;
        Ok(Self {
            corpus,
            layers,
            variant,
        })
    }

    pub fn layers(&self) -> &[u8] {
        &self.layers
    }

    pub fn variant(&self) -> Option<&'static Variant> {
        self.variant
    }

    pub fn corpus(&self) -> &'a ReferenceCorpus {
        self.corpus
    }

    /// Sections of an inclusive range, in order.
    pub fn sections(&self, start: u32, end: u32) -> Result<Vec<&'a Section>, ConfigError> {
        validate_range(start, end)?;
        let max = self.corpus.max_section();
        (start..=end)
            .map(|n| {
                self.corpus
                    .section(n)
                    .ok_or(ConfigError::SectionOutOfBounds { section: n, max })
            })
            .collect()
    }

    fn key(&self, layer: u8) -> LayerKey {
        match self.variant {
            Some(v) => LayerKey::variant(layer, v.suffix),
            None => LayerKey::base(layer),
        }
    }

    /// Keys of one sub-unit in order. Translating layer 2 also translates
    /// its short form, which comes last.
    fn keys(&self) -> Vec<LayerKey> {
        let mut keys: Vec<LayerKey> = self.layers.iter().map(|&l| self.key(l)).collect();
        if let Some(v) = self.variant {
            if self.layers.contains(&SHORT_FORM_LAYER) {
                keys.push(LayerKey::short_form().translated(v.suffix));
            }
        }
        keys
    }

    /// Sub-unit major, layer minor.
    pub fn tasks_for(&self, section: &Section) -> Vec<GenerationTask> {
        let keys = self.keys();
        section
            .sub_units
            .iter()
            .flat_map(|unit| {
                keys.iter().map(move |&key| GenerationTask {
                    section: section.number,
                    sub_unit: unit.number,
                    key,
                })
            })
            .collect()
    }

    pub fn tasks(&self, start: u32, end: u32) -> Result<Vec<GenerationTask>, ConfigError> {
        Ok(self
            .sections(start, end)?
            .into_iter()
            .flat_map(|s| self.tasks_for(s))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SubUnit;

    fn corpus() -> ReferenceCorpus {
        let section = |number, subs: u32| Section {
            number,
            name: format!("S{number}"),
            arabic_name: String::new(),
            sub_units: (1..=subs)
                .map(|n| SubUnit {
                    number: n,
                    source_text: format!("src {n}"),
                    translation: format!("tr {n}"),
                })
                .collect(),
        };
        ReferenceCorpus::from_sections(vec![section(1, 2), section(2, 3)])
    }

    #[test]
    fn tasks_in_grid_order() {
        let corpus = corpus();
        let space = UnitSpace::new(&corpus, &[2, 1], None).unwrap();
        let tasks = space.tasks(1, 1).unwrap();
        let labels: Vec<_> = tasks.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["1:1 layer1", "1:1 layer2", "1:2 layer1", "1:2 layer2"]);
    }

    #[test]
    fn enumeration_is_deterministic() {
        let corpus = corpus();
        let space = UnitSpace::new(&corpus, &[1, 2, 3], None).unwrap();
        assert_eq!(space.tasks(1, 2).unwrap(), space.tasks(1, 2).unwrap());
        assert_eq!(space.tasks(1, 2).unwrap().len(), (2 + 3) * 3);
    }

    #[test]
    fn variant_tasks_use_suffix() {
        let corpus = corpus();
        let space = UnitSpace::new(&corpus, &[1], Some("ur")).unwrap();
        let tasks = space.tasks(2, 2).unwrap();
        assert_eq!(tasks[0].key.to_string(), "layer1_urdu");
        assert!(tasks[0].is_translation());
    }

    #[test]
    fn translating_layer_two_adds_short_form() {
        let corpus = corpus();
        let space = UnitSpace::new(&corpus, &[1, 2], Some("fr")).unwrap();
        let tasks = space.tasks(1, 1).unwrap();
        let labels: Vec<_> = tasks.iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            vec![
                "1:1 layer1_fr",
                "1:1 layer2_fr",
                "1:1 layer2short_fr",
                "1:2 layer1_fr",
                "1:2 layer2_fr",
                "1:2 layer2short_fr",
            ]
        );

        let base = UnitSpace::new(&corpus, &[1, 2], None).unwrap();
        assert_eq!(base.tasks(1, 1).unwrap().len(), 4);
    }

    #[test]
    fn unknown_layer_rejected() {
        let corpus = corpus();
        assert_eq!(
            UnitSpace::new(&corpus, &[1, 7], None).unwrap_err(),
            ConfigError::UnknownLayer(7)
        );
    }

    #[test]
    fn unknown_variant_rejected() {
        let corpus = corpus();
        let err = UnitSpace::new(&corpus, &[1], Some("xx")).unwrap_err();
        assert_eq!(err, ConfigError::UnknownVariant("xx".into()));
        assert!(err.to_string().contains("zh-cn"));
    }

    #[test]
    fn bad_ranges_rejected() {
        let corpus = corpus();
        let space = UnitSpace::new(&corpus, &[1], None).unwrap();
        assert!(matches!(
            space.tasks(2, 1),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            space.tasks(0, 1),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert_eq!(
            space.tasks(1, 3).unwrap_err(),
            ConfigError::SectionOutOfBounds { section: 3, max: 2 }
        );
    }
}
