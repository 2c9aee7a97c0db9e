//! Commentary layers, prompt templates and translation variants

use crate::corpus::{Section, SubUnit};

/// System message sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You are an expert Shia Islamic scholar with deep knowledge of \
Quranic commentary, classical tafsir, and the teachings of the Ahlul Bayt.";

/// One commentary perspective.
#[derive(Debug)]
pub struct Layer {
    pub number: u8,
    pub title: &'static str,
    /// Target length in words (min, max)
    pub words: (u32, u32),
    focus: &'static str,
    guidance: &'static str,
}

const CONTEXT: &str = "VERSE CONTEXT:
Surah: {section_name} (Surah {section_number})
Verse: {sub_unit}
Arabic: {source_text}
Translation: {translation}";

pub static LAYERS: [Layer; 5] = [
    Layer {
        number: 1,
        title: "Foundation",
        words: (150, 250),
        focus: "You are a Shia Islamic scholar providing foundational commentary on Quranic verses.",
        guidance: "1. SIMPLE EXPLANATION: Explain the verse in clear, modern language
2. HISTORICAL CONTEXT: Reasons for revelation (asbab al-nuzul) where relevant
3. KEY ARABIC TERMS: Define the important words and their meanings
4. CONTEMPORARY RELEVANCE: How the verse applies to Muslim life today",
    },
    Layer {
        number: 2,
        title: "Classical Shia",
        words: (200, 300),
        focus: "You are a Shia Islamic scholar specializing in classical Shia tafsir traditions.",
        guidance: "1. AL-MIZAN: Insights from Tabatabai's comprehensive tafsir
2. MAJMA AL-BAYAN: Classical interpretations from Tabrisi
3. TRADITIONAL CONSENSUS: Established Shia scholarly views
4. HISTORICAL PERSPECTIVE: Distinctly Shia readings and approaches",
    },
    Layer {
        number: 3,
        title: "Contemporary",
        words: (200, 300),
        focus: "You are a contemporary Shia Islamic scholar providing modern insights on Quranic verses.",
        guidance: "1. MODERN SCHOLARS: Makarem Shirazi, Jawadi Amuli and other contemporary voices
2. SCIENTIFIC CORRELATIONS: Modern understanding that relates to the verse
3. SOCIAL JUSTICE: How the verse addresses present-day social questions
4. INTERFAITH DIALOGUE: Perspectives that build understanding with other faiths",
    },
    Layer {
        number: 4,
        title: "Ahlul Bayt",
        words: (250, 350),
        focus: "You are a Shia Islamic scholar specializing in the teachings of the Ahlul Bayt (عليهم السلام).",
        guidance: "1. RELEVANT HADITH: Narrations from the 14 Infallibles that illuminate the verse
2. THEOLOGICAL CONCEPTS: Wilayah, Imamah, Tawhid and related concepts
3. SPIRITUAL DIMENSIONS: Mystical readings transmitted from the Ahlul Bayt
4. PRACTICAL APPLICATIONS: How the verse guides worship and daily life",
    },
    Layer {
        number: 5,
        title: "Comparative",
        words: (250, 350),
        focus: "You are a scholar of comparative Quranic exegesis, fair to every school of thought.",
        guidance: "1. SUNNI READINGS: How major Sunni commentators (Tabari, Ibn Kathir, Qurtubi) read the verse
2. SHIA READINGS: The corresponding Shia interpretations
3. AGREEMENT: Where the schools converge
4. DIFFERENCES: Where they diverge, stated respectfully and with sources",
    },
];

impl Layer {
    /// Full user prompt for one sub-unit.
    pub fn render(&self, ctx: &PromptContext) -> String {
        let context = CONTEXT
            .replace("{section_name}", &ctx.section_name)
            .replace("{section_number}", &ctx.section_number.to_string())
            .replace("{sub_unit}", &ctx.sub_unit.to_string())
            .replace("{source_text}", &ctx.source_text)
            .replace("{translation}", &ctx.translation);
        format!(
            "{focus}\n\n{context}\n\nTASK: Provide Layer {n} {title} Commentary covering:\n\n\
             {guidance}\n\nREQUIREMENTS:\n- Write {lo}-{hi} words\n- Use accessible, \
             respectful and scholarly language\n- Include Arabic terminology with translations\n\n\
             COMMENTARY:",
            focus = self.focus,
            n = self.number,
            title = self.title,
            guidance = self.guidance,
            lo = self.words.0,
            hi = self.words.1,
        )
    }
}

pub fn layer(number: u8) -> Option<&'static Layer> {
    LAYERS.iter().find(|l| l.number == number)
}

/// Everything a provider needs to write one layer for one sub-unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub layer: u8,
    pub section_name: String,
    pub section_number: u32,
    pub sub_unit: u32,
    pub source_text: String,
    pub translation: String,
}

impl PromptContext {
    pub fn new(layer: u8, section: &Section, sub_unit: &SubUnit) -> Self {
        Self {
            layer,
            section_name: section.name.clone(),
            section_number: section.number,
            sub_unit: sub_unit.number,
            source_text: sub_unit.source_text.clone(),
            translation: sub_unit.translation.clone(),
        }
    }
}

/// A supported translation target.
#[derive(Debug, PartialEq, Eq)]
pub struct Variant {
    /// Code accepted on the command line
    pub code: &'static str,
    /// Key suffix in stored documents (`layer1_<suffix>`)
    pub suffix: &'static str,
    /// Target code sent to the translation endpoint
    pub target: &'static str,
    pub language: &'static str,
}

pub static VARIANTS: [Variant; 13] = [
    Variant { code: "ar", suffix: "ar", target: "ar", language: "Arabic" },
    Variant { code: "fr", suffix: "fr", target: "fr", language: "French" },
    Variant { code: "ur", suffix: "urdu", target: "ur", language: "Urdu" },
    Variant { code: "tr", suffix: "tr", target: "tr", language: "Turkish" },
    Variant { code: "id", suffix: "id", target: "id", language: "Indonesian" },
    Variant { code: "fa", suffix: "fa", target: "fa", language: "Persian" },
    Variant { code: "ms", suffix: "ms", target: "ms", language: "Malay" },
    Variant { code: "bn", suffix: "bn", target: "bn", language: "Bengali" },
    Variant { code: "hi", suffix: "hi", target: "hi", language: "Hindi" },
    Variant { code: "es", suffix: "es", target: "es", language: "Spanish" },
    Variant { code: "de", suffix: "de", target: "de", language: "German" },
    Variant { code: "ru", suffix: "ru", target: "ru", language: "Russian" },
    Variant { code: "zh-cn", suffix: "zh", target: "zh-CN", language: "Chinese (Simplified)" },
];

/// Look up a variant by command-line code (case-insensitive).
pub fn variant(code: &str) -> Option<&'static Variant> {
    VARIANTS.iter().find(|v| v.code.eq_ignore_ascii_case(code))
}

/// Look up a variant by the suffix it stores under.
pub fn variant_by_suffix(suffix: &str) -> Option<&'static Variant> {
    VARIANTS.iter().find(|v| v.suffix == suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PromptContext {
        PromptContext {
            layer: 2,
            section_name: "Al-Baqara".into(),
            section_number: 2,
            sub_unit: 255,
            source_text: "ٱللَّهُ لَآ إِلَٰهَ إِلَّا هُوَ".into(),
            translation: "Allah - there is no deity except Him".into(),
        }
    }

    #[test]
    fn five_layers_numbered_in_order() {
        let numbers: Vec<_> = LAYERS.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(layer(6).is_none());
    }

    #[test]
    fn render_fills_every_placeholder() {
        let prompt = layer(2).unwrap().render(&ctx());
        assert!(prompt.contains("Surah: Al-Baqara (Surah 2)"));
        assert!(prompt.contains("Verse: 255"));
        assert!(prompt.contains("Write 200-300 words"));
        assert!(prompt.ends_with("COMMENTARY:"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn variant_table_lookups() {
        assert_eq!(variant("ur").unwrap().suffix, "urdu");
        assert_eq!(variant("ZH-CN").unwrap().suffix, "zh");
        assert_eq!(variant_by_suffix("zh").unwrap().target, "zh-CN");
        assert!(variant("xx").is_none());
    }
}
