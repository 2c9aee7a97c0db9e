//! Cleanup of raw model output: banner stripping and truncation repair
//!
//! Both transforms are idempotent. Banner stripping runs first so a stripped
//! header never counts as a sentence.

use regex::{Regex, RegexBuilder};

/// Banner shapes models prepend to commentary. Tried in order, always
/// anchored at the start of the text, case-insensitive.
pub const DEFAULT_PREFIX_PATTERNS: &[&str] = &[
    r"^\*\*COMMENTARY ON SURAH [^*]*\*\*\s*",
    r"^Commentary on Surah [^:]*:\d+\s*",
    r"^COMMENTARY ON SURAH [^0-9]*\d+:\d+\s*",
    r"^COMMENTARY:\s*",
    r"^Tafsir of Surah \d+:\d+\s*",
    r"^\*\*[^*]+\*\*\s*",
    r"^VERSE COMMENTARY:\s*",
    r"^[A-Z-]+\s+\d+:\d+\s*",
    r"^Translation(?:\s*\([^)]*\))?:\s*",
];

/// Words a generation rarely ends a sentence on unless it was cut off.
const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "because", "between", "but", "by", "for", "from",
    "her", "his", "in", "into", "is", "its", "nor", "of", "on", "or", "our", "so", "than", "that",
    "the", "their", "these", "this", "through", "to", "upon", "was", "were", "when", "where",
    "which", "while", "who", "whose", "with",
];

/// Characters that may follow a sentence terminator and still belong to it.
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];

/// Why a trailing sentence was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// No terminal punctuation
    Unterminated,
    /// Ends on a function word
    DanglingWord,
    /// Terminated but below the minimum length
    ShortFragment,
}

/// Ordered prefix rules plus the truncation heuristic.
#[derive(Debug, Clone)]
pub struct TextPostProcessor {
    rules: Vec<Regex>,
    min_fragment_chars: usize,
}

impl Default for TextPostProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_PATTERNS, 10).expect("built-in prefix patterns compile")
    }
}

impl TextPostProcessor {
    /// Compile `patterns` in order. A pattern without a leading `^` is
    /// anchored anyway.
    pub fn new<S: AsRef<str>>(
        patterns: &[S],
        min_fragment_chars: usize,
    ) -> Result<Self, regex::Error> {
        let rules = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                let anchored = if p.starts_with('^') {
                    p.to_string()
                } else {
                    format!("^(?:{p})")
                };
                RegexBuilder::new(&anchored).case_insensitive(true).build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            min_fragment_chars,
        })
    }

    /// Strip banners, then repair truncation.
    pub fn process(&self, raw: &str) -> String {
        let stripped = self.strip_prefixes(raw);
        self.repair_truncation(&stripped)
    }

    /// Remove known banners from the start until none match.
    pub fn strip_prefixes(&self, text: &str) -> String {
        let mut rest = text.trim();
        'outer: loop {
            for rule in &self.rules {
                if let Some(m) = rule.find(rest) {
                    if m.start() == 0 && !m.is_empty() {
                        rest = rest[m.end()..].trim_start();
                        continue 'outer;
                    }
                }
            }
            break;
        }
        rest.trim().to_string()
    }

    /// Drop cut-off trailing sentences.
    ///
    /// Repeats until the last sentence looks complete; the first sentence
    /// is always kept, with a period appended if it has none.
    pub fn repair_truncation(&self, text: &str) -> String {
        let text = text.trim();
        let mut end = text.len();
        loop {
            let body = &text[..end];
            let ends = sentence_ends(body);
            let terminated = ends.last() == Some(&end);
            let start = if terminated {
                ends.iter().rev().nth(1).copied().unwrap_or(0)
            } else {
                ends.last().copied().unwrap_or(0)
            };

            if start == 0 {
                if terminated || body.is_empty() {
                    return body.to_string();
                }
                let trimmed = body.trim_end_matches([',', ';', ':', '-', '—']).trim_end();
                return format!("{trimmed}.");
            }

            let last = body[start..].trim();
            match self.classify(last, terminated) {
                Some(reason) => {
                    log::debug!("dropping trailing fragment ({reason:?}): {last:?}");
                    end = body[..start].trim_end().len();
                }
                None => return body.to_string(),
            }
        }
    }

    /// Whether `sentence` looks like the tail of a cut-off generation.
    pub fn classify(&self, sentence: &str, terminated: bool) -> Option<Truncation> {
        let dangling = last_word(sentence).is_some_and(|w| FUNCTION_WORDS.contains(&w.as_str()));
        if !terminated {
            return Some(if dangling {
                Truncation::DanglingWord
            } else {
                Truncation::Unterminated
            });
        }
        if sentence.chars().count() < self.min_fragment_chars {
            return Some(Truncation::ShortFragment);
        }
        dangling.then_some(Truncation::DanglingWord)
    }
}

/// Byte offsets just past each terminated sentence: a run of `.!?`, any
/// closing quotes or brackets, then whitespace or end of text.
fn sentence_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = text.len();
        while let Some(&(i, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?') || CLOSERS.contains(&next) {
                chars.next();
            } else {
                end = i;
                break;
            }
        }
        if end == text.len() || text[end..].starts_with(char::is_whitespace) {
            ends.push(end);
        }
    }
    ends
}

fn last_word(sentence: &str) -> Option<String> {
    let core = sentence.trim_end_matches(|c: char| !c.is_alphanumeric());
    let word = core.rsplit(char::is_whitespace).next()?;
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    (!word.is_empty()).then(|| word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pp() -> TextPostProcessor {
        TextPostProcessor::default()
    }

    #[test]
    fn well_formed_text_untouched() {
        let text = "This is complete. It ends well.";
        assert_eq!(pp().repair_truncation(text), text);
    }

    #[test]
    fn dangling_tail_dropped() {
        assert_eq!(
            pp().repair_truncation("This is complete. It ends with the and"),
            "This is complete."
        );
    }

    #[test]
    fn unterminated_tail_dropped() {
        assert_eq!(
            pp().repair_truncation("First point stands. Second point was cut off mid"),
            "First point stands."
        );
    }

    #[test]
    fn short_terminated_fragment_dropped() {
        assert_eq!(
            pp().repair_truncation("A full sentence here. Ok."),
            "A full sentence here."
        );
    }

    #[test]
    fn stacked_bad_tails_dropped() {
        assert_eq!(
            pp().repair_truncation("Kept sentence stays. Ends on the. And then of"),
            "Kept sentence stays."
        );
    }

    #[test]
    fn single_unterminated_sentence_gets_period() {
        let once = pp().repair_truncation("Only one thought without an end,");
        assert_eq!(once, "Only one thought without an end.");
        assert_eq!(pp().repair_truncation(&once), once);
    }

    #[test]
    fn closing_quotes_belong_to_sentence() {
        let text = "He said \"peace be upon you.\" The reply came in kind.";
        assert_eq!(pp().repair_truncation(text), text);
    }

    #[test]
    fn repair_is_idempotent() {
        let p = pp();
        for input in [
            "One. Two sentences here and",
            "Alpha beta gamma. Delta epsilon zeta.",
            "Trailing comma,",
            "",
        ] {
            let once = p.repair_truncation(input);
            assert_eq!(p.repair_truncation(&once), once, "{input:?}");
        }
    }

    #[test]
    fn strips_bold_banner() {
        assert_eq!(
            pp().strip_prefixes("**COMMENTARY ON SURAH AL-BAQARA 2:106**\nText follows."),
            "Text follows."
        );
    }

    #[test]
    fn strips_stacked_banners() {
        assert_eq!(
            pp().strip_prefixes(
                "COMMENTARY:\nTafsir of Surah 2:106 The verse speaks of abrogation."
            ),
            "The verse speaks of abrogation."
        );
    }

    #[test]
    fn strips_case_insensitively() {
        assert_eq!(
            pp().strip_prefixes("commentary on surah al-fatiha 1:1 In the name of God."),
            "In the name of God."
        );
    }

    #[test]
    fn strips_translation_preamble() {
        assert_eq!(
            pp().strip_prefixes("Translation (French): Le verset commence par la louange."),
            "Le verset commence par la louange."
        );
        assert_eq!(pp().strip_prefixes("TRANSLATION:\nTexte."), "Texte.");
    }

    #[test]
    fn no_banner_no_change() {
        let text = "The verse opens with praise. Commentary: later mention stays.";
        assert_eq!(pp().strip_prefixes(text), text);
    }

    #[test]
    fn custom_rules_run_in_order() {
        let p = TextPostProcessor::new(&["NOTE:\\s*", "^Draft\\s*"], 10).unwrap();
        assert_eq!(p.strip_prefixes("Draft note: Body."), "Body.");
    }

    #[test]
    fn process_runs_both() {
        let raw = "**Layer 1 Foundation**\n\nThe verse sets the frame. It continues into the";
        assert_eq!(pp().process(raw), "The verse sets the frame.");
    }

    #[test]
    fn classify_reasons() {
        let p = pp();
        assert_eq!(p.classify("cut off mid", false), Some(Truncation::Unterminated));
        assert_eq!(p.classify("ends with the", false), Some(Truncation::DanglingWord));
        assert_eq!(p.classify("Ok.", true), Some(Truncation::ShortFragment));
        assert_eq!(p.classify("This sentence is fine.", true), None);
    }
}
