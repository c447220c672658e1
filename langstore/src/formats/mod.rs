//! All supported translation file formats.
//!
//! Each submodule holds one driver: its parser, serializer, and native
//! state mapping. [`FormatKind`] is the sealed registry tying a format
//! name to its driver and capabilities; adding a format means adding a
//! module and a variant here, nothing else changes.

pub mod android;
pub mod csv;
pub mod json;
pub mod po;
pub mod properties;
pub mod resx;
pub mod srt;
pub mod strings;
pub mod xliff;
pub mod yaml;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::Error, traits::Capabilities, traits::FormatDriver};

/// All supported formats, for generic handling by name.
///
/// # Example
/// ```rust
/// use langstore::formats::FormatKind;
/// use std::str::FromStr;
/// assert_eq!(FormatKind::from_str("po").unwrap(), FormatKind::Po);
/// assert_eq!(FormatKind::Xliff.to_string(), "xliff");
/// assert_eq!(FormatKind::AndroidStrings.extension(), "xml");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(into = "String", try_from = "String")]
pub enum FormatKind {
    /// gettext PO catalogs.
    Po,
    /// XLIFF 1.2 translation interchange files.
    Xliff,
    /// Apple `.strings` files.
    AppleStrings,
    /// Java `.properties` files.
    Properties,
    /// Android `strings.xml` resources.
    AndroidStrings,
    /// JSON translation files (flat, nested, or i18next style).
    Json,
    /// YAML translation files.
    Yaml,
    /// CSV/TSV tabular files.
    Csv,
    /// .NET RESX resource files.
    Resx,
    /// SubRip subtitle files.
    Subrip,
}

impl Display for FormatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FormatKind::Po => "po",
            FormatKind::Xliff => "xliff",
            FormatKind::AppleStrings => "strings",
            FormatKind::Properties => "properties",
            FormatKind::AndroidStrings => "android",
            FormatKind::Json => "json",
            FormatKind::Yaml => "yaml",
            FormatKind::Csv => "csv",
            FormatKind::Resx => "resx",
            FormatKind::Subrip => "srt",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FormatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "po" | "pot" | "gettext" => Ok(FormatKind::Po),
            "xliff" | "xlf" => Ok(FormatKind::Xliff),
            "strings" | "applestrings" => Ok(FormatKind::AppleStrings),
            "properties" | "javaproperties" => Ok(FormatKind::Properties),
            "android" | "androidstrings" | "xml" => Ok(FormatKind::AndroidStrings),
            "json" => Ok(FormatKind::Json),
            "yaml" | "yml" => Ok(FormatKind::Yaml),
            "csv" | "tsv" => Ok(FormatKind::Csv),
            "resx" => Ok(FormatKind::Resx),
            "srt" | "subrip" => Ok(FormatKind::Subrip),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl TryFrom<String> for FormatKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatKind> for String {
    fn from(value: FormatKind) -> Self {
        value.to_string()
    }
}

impl FormatKind {
    /// Every registered format.
    pub fn all() -> &'static [FormatKind] {
        &[
            FormatKind::Po,
            FormatKind::Xliff,
            FormatKind::AppleStrings,
            FormatKind::Properties,
            FormatKind::AndroidStrings,
            FormatKind::Json,
            FormatKind::Yaml,
            FormatKind::Csv,
            FormatKind::Resx,
            FormatKind::Subrip,
        ]
    }

    /// The driver implementing this format.
    pub fn driver(&self) -> &'static dyn FormatDriver {
        match self {
            FormatKind::Po => &po::Driver,
            FormatKind::Xliff => &xliff::Driver,
            FormatKind::AppleStrings => &strings::Driver,
            FormatKind::Properties => &properties::Driver,
            FormatKind::AndroidStrings => &android::Driver,
            FormatKind::Json => &json::Driver,
            FormatKind::Yaml => &yaml::Driver,
            FormatKind::Csv => &csv::Driver,
            FormatKind::Resx => &resx::Driver,
            FormatKind::Subrip => &srt::Driver,
        }
    }

    /// The driver's capability descriptor.
    pub fn capabilities(&self) -> Capabilities {
        self.driver().capabilities()
    }

    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Po => "po",
            FormatKind::Xliff => "xlf",
            FormatKind::AppleStrings => "strings",
            FormatKind::Properties => "properties",
            FormatKind::AndroidStrings => "xml",
            FormatKind::Json => "json",
            FormatKind::Yaml => "yaml",
            FormatKind::Csv => "csv",
            FormatKind::Resx => "resx",
            FormatKind::Subrip => "srt",
        }
    }

    /// Maps a file extension (without dot, case-insensitive) to a format.
    pub fn from_extension(extension: &str) -> Option<FormatKind> {
        match extension.to_ascii_lowercase().as_str() {
            "po" | "pot" => Some(FormatKind::Po),
            "xlf" | "xliff" => Some(FormatKind::Xliff),
            "strings" => Some(FormatKind::AppleStrings),
            "properties" => Some(FormatKind::Properties),
            "xml" => Some(FormatKind::AndroidStrings),
            "json" => Some(FormatKind::Json),
            "yaml" | "yml" => Some(FormatKind::Yaml),
            "csv" | "tsv" => Some(FormatKind::Csv),
            "resx" => Some(FormatKind::Resx),
            "srt" => Some(FormatKind::Subrip),
            _ => None,
        }
    }

    /// Infers the format from a path by its extension.
    pub fn infer_from_path(path: &Path) -> Option<FormatKind> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }
}
