//! Per-unit flag tokens and their precedence merge.
//!
//! A flag is a bare token (`c-format`, `read-only`) or a token with a value
//! (`max-length:80`). Values containing separators are double-quoted. Flags
//! reach a unit from three layers merged lowest to highest precedence:
//! component defaults, format-native file syntax, explicit per-unit
//! overrides. A `no-` prefixed token cancels the same flag from a lower
//! layer.

use std::{convert::Infallible, fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref FLAG_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap();
}

/// One flag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: String,
    pub value: Option<String>,
}

impl Flag {
    pub fn new(name: impl Into<String>) -> Self {
        Flag {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Flag {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            None => write!(f, "{}", self.name),
            Some(value) => {
                if value.contains([',', ':', '"']) || value.contains(char::is_whitespace) {
                    write!(
                        f,
                        "{}:\"{}\"",
                        self.name,
                        value.replace('\\', "\\\\").replace('"', "\\\"")
                    )
                } else {
                    write!(f, "{}:{}", self.name, value)
                }
            }
        }
    }
}

/// An ordered, name-unique flag set.
///
/// Parsing is lenient: empty tokens and tokens with invalid names are
/// skipped, an unterminated quote runs to the end of the input. Setting a
/// flag that already exists replaces it in place, keeping the original
/// order stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Flags {
    tokens: Vec<Flag>,
}

impl Flags {
    pub fn new() -> Self {
        Flags::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.tokens.iter()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tokens.iter().any(|flag| flag.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|flag| flag.name == name)
            .and_then(|flag| flag.value.as_deref())
    }

    /// Inserts or replaces a flag by name, preserving insertion order.
    pub fn set(&mut self, flag: Flag) {
        match self.tokens.iter_mut().find(|t| t.name == flag.name) {
            Some(existing) => *existing = flag,
            None => self.tokens.push(flag),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|flag| flag.name != name);
        before != self.tokens.len()
    }

    /// Applies one precedence layer: each flag replaces a same-named flag
    /// already present, and a `no-` prefixed flag cancels its base flag
    /// from lower layers (and vice versa).
    fn apply_layer(&mut self, layer: &Flags) {
        for flag in layer.iter() {
            if let Some(base) = flag.name.strip_prefix("no-") {
                self.remove(base);
            } else {
                self.remove(&format!("no-{}", flag.name));
            }
            self.set(flag.clone());
        }
    }

    /// Merges the three flag layers, lowest to highest precedence:
    /// component defaults, format-native file flags, explicit overrides.
    pub fn merge(defaults: &Flags, native: &Flags, overrides: &Flags) -> Flags {
        let mut merged = Flags::new();
        merged.apply_layer(defaults);
        merged.apply_layer(native);
        merged.apply_layer(overrides);
        merged
    }

    fn parse_lenient(input: &str) -> Flags {
        let mut flags = Flags::new();
        for token in split_tokens(input) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (name, value) = match split_name_value(token) {
                Some(parts) => parts,
                None => continue,
            };
            if !FLAG_NAME_REGEX.is_match(&name) {
                continue;
            }
            flags.set(Flag { name, value });
        }
        flags
    }
}

/// Splits on commas that are not inside double quotes.
fn split_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ',' if !in_quotes => {
                tokens.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    tokens.push(current);
    tokens
}

/// Splits `name:value`, unquoting the value; a bare token has no value.
fn split_name_value(token: &str) -> Option<(String, Option<String>)> {
    match token.split_once(':') {
        None => Some((token.to_string(), None)),
        Some((name, raw)) => {
            let raw = raw.trim();
            let value = if raw.starts_with('"') {
                let inner = raw.strip_prefix('"')?;
                let inner = inner.strip_suffix('"').unwrap_or(inner);
                inner.replace("\\\"", "\"").replace("\\\\", "\\")
            } else {
                raw.to_string()
            };
            Some((name.trim().to_string(), Some(value)))
        }
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.tokens.iter().map(Flag::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

impl FromStr for Flags {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Flags::parse_lenient(s))
    }
}

impl From<String> for Flags {
    fn from(value: String) -> Self {
        Flags::parse_lenient(&value)
    }
}

impl From<Flags> for String {
    fn from(value: Flags) -> Self {
        value.to_string()
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        let mut flags = Flags::new();
        for flag in iter {
            flags.set(flag);
        }
        flags
    }
}
