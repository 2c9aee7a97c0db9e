//! In-memory commentary document for one section

use anyhow::{Result, bail};
use serde_json::{Map, Value};

use crate::key::{LayerKey, is_failure_sentinel, parse_layer_key};

/// Sub-unit id → layer key → text, in file order.
///
/// Top-level keys that are not all digits are kept verbatim on save and
/// otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored document. The top level must be a JSON object.
    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(entries) => Ok(Self { entries }),
            other => bail!("expected a JSON object at top level, found {}", kind(&other)),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Numeric sub-unit ids present, ascending.
    pub fn sub_unit_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .entries
            .keys()
            .filter(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|k| k.parse().ok())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.sub_unit_ids().is_empty()
    }

    /// Raw key → value map of a sub-unit.
    pub fn sub_unit(&self, sub_unit: u32) -> Option<&Map<String, Value>> {
        self.entries.get(&sub_unit.to_string())?.as_object()
    }

    pub fn get(&self, sub_unit: u32, key: &LayerKey) -> Option<&str> {
        self.get_raw(sub_unit, &key.to_string())
    }

    pub fn get_raw(&self, sub_unit: u32, key: &str) -> Option<&str> {
        self.sub_unit(sub_unit)?.get(key)?.as_str()
    }

    /// Present and non-empty. The resume check.
    pub fn has_key(&self, sub_unit: u32, key: &LayerKey) -> bool {
        self.get(sub_unit, key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Store `text` unless a non-empty value already sits under `key`.
    ///
    /// Returns whether the document changed.
    pub fn put(&mut self, sub_unit: u32, key: &LayerKey, text: impl Into<String>) -> bool {
        if self.has_key(sub_unit, key) {
            return false;
        }
        let slot = self
            .entries
            .entry(sub_unit.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(map) => {
                map.insert(key.to_string(), Value::String(text.into()));
                true
            }
            None => {
                log::warn!("sub-unit {sub_unit} is not an object, not writing {key}");
                false
            }
        }
    }

    /// Clear `key` if it holds a failure sentinel, so it reads as missing.
    pub fn remove_failure(&mut self, sub_unit: u32, key: &LayerKey) -> bool {
        if !self.get(sub_unit, key).is_some_and(is_failure_sentinel) {
            return false;
        }
        self.entries
            .get_mut(&sub_unit.to_string())
            .and_then(Value::as_object_mut)
            .and_then(|map| map.remove(&key.to_string()))
            .is_some()
    }

    /// Rewrite every layer string value through `f`. Returns how many changed.
    ///
    /// Operator maintenance only; the pipeline itself never rewrites.
    pub fn rewrite_layers(&mut self, mut f: impl FnMut(&str) -> String) -> usize {
        let mut changed = 0;
        for map in self.layer_maps_mut() {
            for (k, v) in map.iter_mut() {
                if parse_layer_key(k).is_none() {
                    continue;
                }
                if let Value::String(s) = v {
                    let new = f(s);
                    if new != *s {
                        *s = new;
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    fn layer_maps_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.entries
            .iter_mut()
            .filter(|(k, _)| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|(_, v)| v.as_object_mut())
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
