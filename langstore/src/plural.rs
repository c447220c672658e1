//! Plural rules: which plural forms a language requires, in which order.
//!
//! The table is a curated subset of CLDR cardinal rules with gettext-style
//! arities, keyed by base language subtag. Targets store plural forms as an
//! ordered tuple, so the ordered category list here defines both the arity
//! and the meaning of each position (position 0 = first category).

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// CLDR plural category names, ordered the way CLDR orders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PluralCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            other => Err(Error::mismatch(format!(
                "unknown plural category `{}`",
                other
            ))),
        }
    }
}

lazy_static! {
    /// Static mapping from base language subtag → ordered plural categories.
    static ref CATEGORY_TABLE: BTreeMap<&'static str, &'static [PluralCategory]> = {
        use PluralCategory::*;

        static ONE_OTHER: &[PluralCategory] = &[One, Other];
        static OTHER_ONLY: &[PluralCategory] = &[Other];
        static SLAVIC: &[PluralCategory] = &[One, Few, Many];
        static CS_GROUP: &[PluralCategory] = &[One, Few, Other];
        static SL: &[PluralCategory] = &[One, Two, Few, Other];
        static LV: &[PluralCategory] = &[Zero, One, Other];
        static GA: &[PluralCategory] = &[One, Two, Few, Many, Other];
        static AR_GROUP: &[PluralCategory] = &[Zero, One, Two, Few, Many, Other];
        static HE_GROUP: &[PluralCategory] = &[One, Two, Many, Other];

        let mut m: BTreeMap<&'static str, &'static [PluralCategory]> = BTreeMap::new();

        // Two forms (most Indo-European languages without complex rules).
        for code in [
            "en", "de", "nl", "sv", "da", "nb", "nn", "no", "is", "fi", "et", "fa", "hi",
            "bn", "gu", "ta", "te", "kn", "ml", "mr", "it", "es", "pt", "mk", "el", "eu",
            "gl", "af", "sw", "ur", "fil", "tl", "tr", "fr", "hy", "kab", "hu", "az", "ka",
            "sq", "bg",
        ] {
            m.insert(code, ONE_OTHER);
        }

        // Single form (East/Southeast Asian common cases).
        for code in ["ja", "zh", "ko", "th", "vi", "km", "lo", "my", "yue", "id", "ms"] {
            m.insert(code, OTHER_ONLY);
        }

        // Three-form Slavic (Russian group, Polish).
        for code in ["ru", "uk", "be", "sr", "hr", "bs", "sh", "pl"] {
            m.insert(code, SLAVIC);
        }

        // Czech/Slovak, Lithuanian, Romanian.
        for code in ["cs", "sk", "lt", "ro"] {
            m.insert(code, CS_GROUP);
        }

        m.insert("sl", SL);
        m.insert("lv", LV);
        m.insert("ga", GA);

        for code in ["ar", "cy"] {
            m.insert(code, AR_GROUP);
        }

        // Hebrew (legacy code iw also maps here).
        for code in ["he", "iw"] {
            m.insert(code, HE_GROUP);
        }

        m
    };

    static ref NPLURALS_REGEX: Regex = Regex::new(r"nplurals\s*=\s*(\d+)").unwrap();
}

/// The plural rule resolved for one language: an ordered category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluralRules {
    categories: &'static [PluralCategory],
}

impl PluralRules {
    /// Number of plural forms a target in this language holds.
    pub fn arity(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &'static [PluralCategory] {
        self.categories
    }

    /// Tuple position of a category, when the language uses it.
    pub fn index_of(&self, category: PluralCategory) -> Option<usize> {
        self.categories.iter().position(|c| *c == category)
    }

    pub fn category_at(&self, index: usize) -> Option<PluralCategory> {
        self.categories.get(index).copied()
    }
}

/// Returns the plural rules for a language identifier, selecting by base
/// subtag. Unknown languages fall back to the two-form default.
pub fn rules_for(lang: &LanguageIdentifier) -> PluralRules {
    static DEFAULT: &[PluralCategory] = &[PluralCategory::One, PluralCategory::Other];
    let categories = CATEGORY_TABLE
        .get(lang.language.as_str())
        .copied()
        .unwrap_or(DEFAULT);
    PluralRules { categories }
}

/// Helper for string language codes (accepts underscores, normalizes to
/// hyphen; unparseable codes get the two-form default).
pub fn rules_for_str(lang: &str) -> PluralRules {
    let normalized = lang.replace('_', "-");
    match normalized.parse::<LanguageIdentifier>() {
        Ok(parsed) => rules_for(&parsed),
        Err(_) => rules_for(&LanguageIdentifier::default()),
    }
}

/// Extracts `nplurals` from a gettext `Plural-Forms` header value.
pub fn nplurals_from_header(value: &str) -> Option<usize> {
    NPLURALS_REGEX
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
