//! Reference corpus: section metadata and source text per sub-unit

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct SubUnit {
    pub number: u32,
    pub source_text: String,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub number: u32,
    /// Transliterated name used in prompts
    pub name: String,
    pub arabic_name: String,
    pub sub_units: Vec<SubUnit>,
}

impl Section {
    pub fn sub_unit(&self, number: u32) -> Option<&SubUnit> {
        self.sub_units.iter().find(|s| s.number == number)
    }
}

/// Immutable catalog loaded once per run and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    sections: Vec<Section>,
}

#[derive(Deserialize)]
struct RawCatalog {
    surahs: Vec<RawSection>,
    #[serde(default)]
    verses: HashMap<String, HashMap<String, RawSubUnit>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    number: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    english_name: String,
    #[serde(default)]
    arabic_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubUnit {
    #[serde(default)]
    arabic_text: String,
    #[serde(default)]
    translation: String,
}

impl ReferenceCorpus {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus {}", path.display()))?;
        let corpus = Self::from_json(&text)
            .with_context(|| format!("failed to parse corpus {}", path.display()))?;
        log::info!(
            "Loaded corpus: {} sections, {} sub-units",
            corpus.sections.len(),
            corpus.sub_unit_count()
        );
        Ok(corpus)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(text)?;
        let mut verses = raw.verses;
        let mut sections: Vec<Section> = raw
            .surahs
            .into_iter()
            .map(|s| {
                let mut sub_units: Vec<SubUnit> = verses
                    .remove(&s.number.to_string())
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(k, v)| {
                        Some(SubUnit {
                            number: k.parse().ok()?,
                            source_text: v.arabic_text,
                            translation: v.translation,
                        })
                    })
                    .collect();
                sub_units.sort_by_key(|u| u.number);
                if sub_units.is_empty() {
                    log::warn!("corpus has no sub-units for section {}", s.number);
                }
                let name = if s.english_name.is_empty() {
                    s.name.clone()
                } else {
                    s.english_name
                };
                Section {
                    number: s.number,
                    name,
                    arabic_name: s.arabic_name.unwrap_or(s.name),
                    sub_units,
                }
            })
            .collect();
        sections.sort_by_key(|s| s.number);
        Ok(Self { sections })
    }

    pub fn from_sections(mut sections: Vec<Section>) -> Self {
        sections.sort_by_key(|s| s.number);
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, number: u32) -> Option<&Section> {
        self.sections
            .binary_search_by_key(&number, |s| s.number)
            .ok()
            .map(|i| &self.sections[i])
    }

    /// Highest section number, 0 when empty.
    pub fn max_section(&self) -> u32 {
        self.sections.last().map_or(0, |s| s.number)
    }

    pub fn sub_unit_count(&self) -> usize {
        self.sections.iter().map(|s| s.sub_units.len()).sum()
    }
}
