//! The format driver contract: capability descriptors, per-call options,
//! and parse reports.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    flags::Flags,
    identity::IdentityRule,
    types::{Catalog, State},
};

/// Whether a format holds source and target in one file (bilingual), only
/// keyed target text backed by a template (monolingual), or can be used
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Linguality {
    Bilingual,
    Monolingual,
    Both,
}

/// Static capability descriptor every driver declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub linguality: Linguality,
    pub identity: IdentityRule,
    pub supports_plurals: bool,
    pub supports_context: bool,
    pub supports_flags: bool,
    pub supports_locations: bool,
    pub supports_obsolete: bool,
    /// States beyond `Empty`/`Translated` the format can express natively.
    pub extra_states: &'static [State],
}

/// How the JSON driver reads and writes document structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JsonDialect {
    /// Top-level keys only; nested objects are a structural error.
    Flat,
    /// Nested objects flattened to dotted paths.
    #[default]
    Nested,
    /// Nested, plus `_one`/`_other` style suffix keys grouped into plural
    /// units.
    I18next,
}

/// How the YAML driver treats the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum YamlDialect {
    /// The document root is the key tree.
    #[default]
    Plain,
    /// Ruby-i18n style: a single root key names the language, its value is
    /// the key tree.
    RootKey,
}

/// Immutable per-call driver configuration. Built fluently and passed into
/// `parse`/`serialize`/`reconcile` explicitly; drivers read no ambient
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Target language of the file; drives plural arity.
    pub language: Option<String>,
    /// Encoding label to try when the input carries no byte-order mark.
    pub encoding: Option<String>,
    /// Parse the file as a template: text fills the source side and the
    /// target stays blank. Only meaningful for monolingual-capable formats.
    pub template: bool,
    pub json_dialect: JsonDialect,
    pub yaml_dialect: YamlDialect,
    /// Explicit CSV delimiter; `None` auto-detects.
    pub csv_delimiter: Option<u8>,
    /// Component-level default flags, the lowest merge layer.
    pub default_flags: Flags,
    /// Explicit per-unit flag overrides keyed by identity, the highest
    /// merge layer.
    pub flag_overrides: BTreeMap<String, Flags>,
    /// Whether serializers keep obsolete units (formats that support them).
    pub keep_obsolete: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            language: None,
            encoding: None,
            template: false,
            json_dialect: JsonDialect::default(),
            yaml_dialect: YamlDialect::default(),
            csv_delimiter: None,
            default_flags: Flags::default(),
            flag_overrides: BTreeMap::new(),
            keep_obsolete: true,
        }
    }
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn as_template(mut self, template: bool) -> Self {
        self.template = template;
        self
    }

    pub fn with_json_dialect(mut self, dialect: JsonDialect) -> Self {
        self.json_dialect = dialect;
        self
    }

    pub fn with_yaml_dialect(mut self, dialect: YamlDialect) -> Self {
        self.yaml_dialect = dialect;
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = Some(delimiter);
        self
    }

    pub fn with_default_flags(mut self, flags: Flags) -> Self {
        self.default_flags = flags;
        self
    }

    pub fn with_flag_override(mut self, identity: impl Into<String>, flags: Flags) -> Self {
        self.flag_overrides.insert(identity.into(), flags);
        self
    }

    pub fn with_keep_obsolete(mut self, keep: bool) -> Self {
        self.keep_obsolete = keep;
        self
    }

    /// The language this call works in; empty when unspecified.
    pub fn language_code(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }
}

/// One non-fatal issue found during parse or reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The same identity appeared more than once; the first occurrence is
    /// canonical.
    DuplicateIdentity {
        identity: String,
        first_position: usize,
        duplicate_position: usize,
    },
    /// Well-formed content the format's flattening/identity rules cannot
    /// represent unambiguously; resolved by a documented tie-break.
    StructuralAmbiguity { key: String, detail: String },
    /// A plural target did not hold the arity the language requires; it
    /// was padded or truncated to fit.
    PluralArityMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DuplicateIdentity {
                identity,
                first_position,
                duplicate_position,
            } => write!(
                f,
                "duplicate identity `{}` (positions {} and {})",
                identity, first_position, duplicate_position
            ),
            Warning::StructuralAmbiguity { key, detail } => {
                write!(f, "structural ambiguity at `{}`: {}", key, detail)
            }
            Warning::PluralArityMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "`{}` has {} plural forms, language expects {}",
                key, found, expected
            ),
        }
    }
}

/// Non-fatal warnings accumulated alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ParseReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl ParseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A successful parse: the catalog plus its accumulated warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub catalog: Catalog,
    pub report: ParseReport,
}

/// The contract every format driver implements.
///
/// `parse` fails only on structural or encoding errors; per-unit issues
/// accumulate in the report. `serialize` must be semantically idempotent:
/// re-parsing its output yields the same identities, sources, targets,
/// states, and flags.
pub trait FormatDriver {
    fn capabilities(&self) -> Capabilities;

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error>;

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error>;
}

/// Shared parse epilogue for drivers: pins plural targets to the language
/// arity (recording mismatches), resolves the flag merge layers, and scans
/// for duplicate identities.
pub(crate) fn finalize_parse(catalog: &mut Catalog, report: &mut ParseReport, options: &DriverOptions) {
    let rules = crate::plural::rules_for_str(&catalog.meta.language);
    let rule = catalog.meta.identity_rule;
    for unit in &mut catalog.units {
        if unit.target().is_plural() {
            let found = unit.target().arity();
            if unit.normalize_plural_target(rules.arity()) {
                report.push(Warning::PluralArityMismatch {
                    key: unit.label(),
                    expected: rules.arity(),
                    found,
                });
            }
        }
        let identity = crate::identity::unit_identity(unit, rule);
        unit.resolve_flags(&options.default_flags, options.flag_overrides.get(&identity));
    }
    report.extend(crate::identity::scan_duplicates(catalog));
}
