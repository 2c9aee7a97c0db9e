//! Layer key grammar and failure sentinels
//!
//! Base layers are stored as `layer<N>`, translated copies as
//! `layer<N>_<suffix>` (e.g. `layer2_urdu`). The derived short form
//! `layer2short` and its translations `layer2short_<suffix>` are addressable
//! but are not layer keys: validation and cleanup never see them.

use std::fmt;

/// Layer the short form is cut from.
pub const SHORT_FORM_LAYER: u8 = 2;

/// Address of one value inside a sub-unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey {
    pub layer: u8,
    pub suffix: Option<&'static str>,
    /// `layer<N>short` rather than `layer<N>`
    pub short: bool,
}

impl LayerKey {
    pub const fn base(layer: u8) -> Self {
        Self {
            layer,
            suffix: None,
            short: false,
        }
    }

    pub const fn variant(layer: u8, suffix: &'static str) -> Self {
        Self {
            layer,
            suffix: Some(suffix),
            short: false,
        }
    }

    /// `layer2short`
    pub const fn short_form() -> Self {
        Self {
            layer: SHORT_FORM_LAYER,
            suffix: None,
            short: true,
        }
    }

    /// Same key translated into `suffix`.
    pub const fn translated(self, suffix: &'static str) -> Self {
        Self {
            layer: self.layer,
            suffix: Some(suffix),
            short: self.short,
        }
    }

    /// The untranslated key this one derives from.
    pub const fn source(&self) -> Self {
        Self {
            layer: self.layer,
            suffix: None,
            short: self.short,
        }
    }

    pub fn is_variant(&self) -> bool {
        self.suffix.is_some()
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer{}", self.layer)?;
        if self.short {
            f.write_str("short")?;
        }
        match self.suffix {
            Some(suffix) => write!(f, "_{suffix}"),
            None => Ok(()),
        }
    }
}

/// Split a stored key into `(layer, suffix)`.
///
/// Returns `None` for keys outside the grammar.
pub fn parse_layer_key(key: &str) -> Option<(u8, Option<&str>)> {
    let rest = key.strip_prefix("layer")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let layer: u8 = rest[..digits].parse().ok()?;
    match &rest[digits..] {
        "" => Some((layer, None)),
        tail => {
            let suffix = tail.strip_prefix('_')?;
            if suffix.is_empty() {
                return None;
            }
            Some((layer, Some(suffix)))
        }
    }
}

/// Placeholder stored when generation of a base layer fails for good.
pub fn generation_sentinel(layer: u8, sub_unit: u32, err: &dyn fmt::Display) -> String {
    format!("Error generating layer {layer} for verse {sub_unit}: {err}")
}

/// Placeholder stored when a translation fails for good.
pub fn translation_sentinel(err: &dyn fmt::Display) -> String {
    format!("[Translation failed: {err}]")
}

/// Recognizes every placeholder shape ever written to the corpus.
pub fn is_failure_sentinel(text: &str) -> bool {
    let t = text.trim_start();
    t.starts_with("Error generating")
        || t.starts_with("[Translation failed")
        || t.starts_with("Error: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keys() {
        assert_eq!(LayerKey::base(3).to_string(), "layer3");
        assert_eq!(LayerKey::variant(2, "urdu").to_string(), "layer2_urdu");
    }

    #[test]
    fn short_form_keys() {
        let short = LayerKey::short_form();
        assert_eq!(short.to_string(), "layer2short");
        let fr = short.translated("fr");
        assert_eq!(fr.to_string(), "layer2short_fr");
        assert_eq!(fr.source(), short);
        assert_eq!(LayerKey::variant(2, "fr").source(), LayerKey::base(2));
    }

    #[test]
    fn parse_known_shapes() {
        assert_eq!(parse_layer_key("layer1"), Some((1, None)));
        assert_eq!(parse_layer_key("layer4_zh"), Some((4, Some("zh"))));
        assert_eq!(parse_layer_key("layer5_urdu"), Some((5, Some("urdu"))));
    }

    #[test]
    fn parse_rejects_other_keys() {
        assert_eq!(parse_layer_key("layer2short"), None);
        assert_eq!(parse_layer_key("layer2short_urdu"), None);
        assert_eq!(parse_layer_key("layer"), None);
        assert_eq!(parse_layer_key("layer3_"), None);
        assert_eq!(parse_layer_key("summary"), None);
    }

    #[test]
    fn sentinels_are_recognized() {
        let g = generation_sentinel(3, 7, &"transient: timeout");
        assert_eq!(g, "Error generating layer 3 for verse 7: transient: timeout");
        assert!(is_failure_sentinel(&g));
        assert!(is_failure_sentinel(&translation_sentinel(&"HTTP 500")));
        assert!(is_failure_sentinel("Error: rate limited"));
    }

    #[test]
    fn real_content_is_not_a_sentinel() {
        assert!(!is_failure_sentinel("The verse opens with praise."));
        assert!(!is_failure_sentinel("Errors of the earlier nations are recalled."));
    }
}
