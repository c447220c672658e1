//! Core, format-agnostic types for langstore.
//! Format drivers decode into these; serializers encode these.

use std::{collections::BTreeMap, fmt::Display, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::{error::Error, flags::Flags, identity::IdentityRule};

/// The text of one side of a unit: a single string or an ordered tuple of
/// plural forms.
///
/// Plural form order follows the language's plural rule
/// (see [`crate::plural::PluralRules`]); form 0 is the primary form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Message {
    /// A single string without plural forms.
    Singular(String),

    /// An ordered tuple of plural forms.
    Plural(Vec<String>),
}

impl Message {
    /// Creates a singular message.
    pub fn singular(text: impl Into<String>) -> Self {
        Message::Singular(text.into())
    }

    /// Creates a plural message from ordered forms.
    pub fn plural(forms: Vec<String>) -> Self {
        Message::Plural(forms)
    }

    /// Creates a blank message of the same kind and arity as `self`.
    pub fn blank_like(&self) -> Self {
        match self {
            Message::Singular(_) => Message::Singular(String::new()),
            Message::Plural(forms) => Message::Plural(vec![String::new(); forms.len()]),
        }
    }

    /// All forms in order; a singular message yields one form.
    pub fn forms(&self) -> &[String] {
        match self {
            Message::Singular(text) => std::slice::from_ref(text),
            Message::Plural(forms) => forms.as_slice(),
        }
    }

    /// The primary form (form 0).
    pub fn first(&self) -> &str {
        match self {
            Message::Singular(text) => text,
            Message::Plural(forms) => forms.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Number of forms.
    pub fn arity(&self) -> usize {
        self.forms().len()
    }

    pub fn is_plural(&self) -> bool {
        matches!(self, Message::Plural(_))
    }

    /// True when every form is the empty string.
    pub fn is_blank(&self) -> bool {
        self.forms().iter().all(|form| form.is_empty())
    }

    /// True when both messages are singular or both are plural.
    pub fn same_kind(&self, other: &Message) -> bool {
        self.is_plural() == other.is_plural()
    }

    /// Pads or truncates a plural message to exactly `arity` forms.
    /// Returns `true` if the form count changed. Singular messages are
    /// left untouched.
    pub(crate) fn resize_plural(&mut self, arity: usize) -> bool {
        match self {
            Message::Singular(_) => false,
            Message::Plural(forms) => {
                if forms.len() == arity {
                    false
                } else {
                    forms.resize(arity, String::new());
                    true
                }
            }
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Singular(text) => write!(f, "{}", text),
            Message::Plural(forms) => write!(f, "{}", forms.join(" | ")),
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::Singular(String::new())
    }
}

/// Canonical translation state of a unit.
///
/// Formats that cannot express a state map it lossily; each driver holds a
/// total mapping table between its native encoding and this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    /// No usable target text.
    #[default]
    Empty,
    /// Target exists but needs review (gettext "fuzzy", XLIFF needs-* states).
    NeedsEditing,
    /// Target exists and is considered done.
    Translated,
    /// Target passed review (XLIFF `approved="yes"`).
    Approved,
    /// Target must not be modified (`read-only` flag, `translatable="false"`).
    ReadOnly,
}

impl State {
    /// Whether a transition from `self` to `to` is permitted by the model.
    /// Read-only units reject every transition; everything else is open.
    pub fn can_transition(self, to: State) -> bool {
        if self == to {
            return true;
        }
        self != State::ReadOnly
    }

    /// True for states that count as having a usable translation.
    pub fn is_translated(self) -> bool {
        matches!(self, State::Translated | State::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Empty => "empty",
            State::NeedsEditing => "needs-editing",
            State::Translated => "translated",
            State::Approved => "approved",
            State::ReadOnly => "read-only",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" | "untranslated" | "new" => Ok(State::Empty),
            "needs-editing" | "needs_editing" | "fuzzy" | "needs-review" => {
                Ok(State::NeedsEditing)
            }
            "translated" | "done" => Ok(State::Translated),
            "approved" | "final" | "signed-off" => Ok(State::Approved),
            "read-only" | "readonly" => Ok(State::ReadOnly),
            other => Err(Error::mismatch(format!("unknown state `{}`", other))),
        }
    }
}

/// One `(file, line)` source-code reference attached to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub line: Option<u32>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: Option<u32>) -> Self {
        Location {
            file: file.into(),
            line,
        }
    }

    /// Parses a `file:line` token; without a numeric tail the whole token
    /// is the file name.
    pub fn from_token(token: &str) -> Self {
        if let Some((file, line)) = token.rsplit_once(':') {
            if let Ok(number) = line.parse::<u32>() {
                return Location::new(file, Some(number));
            }
        }
        Location::new(token, None)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// Developer and translator comments, kept separate: the developer note is
/// extracted from source code and read-only to translators, the translator
/// note is freely editable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Notes {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub developer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub translator: Option<String>,
}

impl Notes {
    pub fn is_empty(&self) -> bool {
        self.developer.is_none() && self.translator.is_none()
    }
}

/// One translatable entry.
///
/// Fields are private: read through the accessors, mutate through
/// [`Unit::set_target`] / [`Unit::set_state`] so plural arity and
/// read-only rules are enforced in one place. Drivers construct units with
/// [`Unit::new`] and the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Unit {
    /// Format-native key (keyed formats) or optional disambiguation
    /// context (gettext `msgctxt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    context: Option<String>,

    source: Message,
    target: Message,
    state: State,

    /// Resolved flag set: component defaults, then file flags, then
    /// explicit overrides.
    #[serde(skip_serializing_if = "Flags::is_empty")]
    #[serde(default)]
    flags: Flags,

    /// Flags as read from the file syntax; what serializers write back.
    #[serde(skip_serializing_if = "Flags::is_empty")]
    #[serde(default)]
    file_flags: Flags,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    locations: Vec<Location>,

    #[serde(skip_serializing_if = "Notes::is_empty")]
    #[serde(default)]
    notes: Notes,

    /// Ordinal position in the file, preserved for stable output ordering.
    position: usize,

    /// Retained-but-inactive marker (gettext `#~`, reconciliation
    /// obsolete policy).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    obsolete: bool,

    /// Driver-private round-trip data (XLIFF ids, SubRip timings, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(default)]
    extra: BTreeMap<String, String>,
}

impl Unit {
    /// Creates a unit with a blank target of the same kind as `source`
    /// and `Empty` state.
    pub fn new(context: Option<String>, source: Message) -> Self {
        let target = source.blank_like();
        Unit {
            context,
            source,
            target,
            state: State::Empty,
            flags: Flags::default(),
            file_flags: Flags::default(),
            locations: Vec::new(),
            notes: Notes::default(),
            position: 0,
            obsolete: false,
            extra: BTreeMap::new(),
        }
    }

    // Builder methods for parse-time construction. These set fields
    // verbatim; the guarded setters below are for post-parse mutation.

    pub fn with_target(mut self, target: Message) -> Self {
        self.target = target;
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn with_file_flags(mut self, flags: Flags) -> Self {
        self.flags = flags.clone();
        self.file_flags = flags;
        self
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_developer_note(mut self, note: impl Into<String>) -> Self {
        self.notes.developer = Some(note.into());
        self
    }

    pub fn with_translator_note(mut self, note: impl Into<String>) -> Self {
        self.notes.translator = Some(note.into());
        self
    }

    pub fn with_obsolete(mut self, obsolete: bool) -> Self {
        self.obsolete = obsolete;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    // Accessors.

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn source(&self) -> &Message {
        &self.source
    }

    pub fn target(&self) -> &Message {
        &self.target
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The resolved flag set (post-merge); what quality checks consume.
    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// Flags exactly as the file carried them; what serializers emit.
    pub fn file_flags(&self) -> &Flags {
        &self.file_flags
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.has(name)
    }

    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.flags.value_of(name)
    }

    pub fn is_read_only(&self) -> bool {
        self.state == State::ReadOnly
    }

    /// Plural-aware source equality: compares the full form tuple.
    pub fn source_equals(&self, other: &Unit) -> bool {
        self.source == other.source
    }

    /// Plural-aware target equality: compares the full form tuple.
    pub fn target_equals(&self, other: &Unit) -> bool {
        self.target == other.target
    }

    /// A short label identifying the unit in error messages: the context
    /// key when present, otherwise the primary source form.
    pub fn label(&self) -> String {
        match &self.context {
            Some(context) if !context.is_empty() => context.clone(),
            _ => self.source.first().to_string(),
        }
    }

    // Guarded mutation API.

    /// Replaces the target text.
    ///
    /// Rejects mutation of read-only units and targets whose kind
    /// (singular vs. plural) differs from the source. A blank target
    /// resets the state to `Empty`; a non-blank target on an `Empty` unit
    /// moves it to `Translated`; other states are preserved.
    pub fn set_target(&mut self, target: Message) -> Result<(), Error> {
        if self.is_read_only() {
            return Err(Error::ReadOnly {
                context: self.label(),
            });
        }
        if !target.same_kind(&self.source) {
            return Err(Error::mismatch(format!(
                "target kind does not match source for `{}`",
                self.label()
            )));
        }
        if target.is_plural() && self.target.is_plural() && target.arity() != self.target.arity() {
            return Err(Error::mismatch(format!(
                "target has {} plural forms, expected {} for `{}`",
                target.arity(),
                self.target.arity(),
                self.label()
            )));
        }
        self.target = target;
        if self.target.is_blank() {
            self.state = State::Empty;
        } else if self.state == State::Empty {
            self.state = State::Translated;
        }
        Ok(())
    }

    /// Changes the unit state.
    ///
    /// Rejects transitions out of `ReadOnly` and states inconsistent with
    /// the target text (`Translated`/`Approved` need text, `Empty` needs a
    /// blank target).
    pub fn set_state(&mut self, state: State) -> Result<(), Error> {
        if !self.state.can_transition(state) {
            return Err(Error::ReadOnly {
                context: self.label(),
            });
        }
        match state {
            State::Translated | State::Approved if self.target.is_blank() => {
                return Err(Error::mismatch(format!(
                    "cannot mark blank unit `{}` as {}",
                    self.label(),
                    state
                )));
            }
            State::Empty if !self.target.is_blank() => {
                return Err(Error::mismatch(format!(
                    "cannot mark unit `{}` with text as empty",
                    self.label()
                )));
            }
            _ => {}
        }
        self.state = state;
        Ok(())
    }

    /// Replaces the translator comment; always allowed.
    pub fn set_translator_note(&mut self, note: Option<String>) {
        self.notes.translator = note;
    }

    // Crate-internal mutators used by the reconciliation engine and the
    // flag resolver.

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub(crate) fn set_obsolete(&mut self, obsolete: bool) {
        self.obsolete = obsolete;
    }

    pub(crate) fn adopt_template_metadata(&mut self, template: &Unit) {
        self.context = template.context.clone();
        self.locations = template.locations.clone();
        self.notes.developer = template.notes.developer.clone();
        self.file_flags = template.file_flags.clone();
    }

    pub(crate) fn replace_source(&mut self, source: Message) {
        self.source = source;
    }

    pub(crate) fn force_target(&mut self, target: Message) {
        self.target = target;
    }

    pub(crate) fn force_state(&mut self, state: State) {
        self.state = state;
    }

    /// Recomputes the resolved flag set from the merge layers and syncs
    /// the read-only state with the `read-only` flag.
    pub(crate) fn resolve_flags(&mut self, defaults: &Flags, overrides: Option<&Flags>) {
        self.flags = Flags::merge(defaults, &self.file_flags, overrides.unwrap_or(&Flags::default()));
        if self.flags.has("read-only") {
            self.state = State::ReadOnly;
        } else if self.state == State::ReadOnly {
            // Flag removed: fall back to what the target warrants.
            self.state = if self.target.is_blank() {
                State::Empty
            } else {
                State::Translated
            };
        }
    }

    /// Pads or truncates a plural target to the given arity, keeping
    /// blank targets blank. Returns `true` when the form count changed.
    pub(crate) fn normalize_plural_target(&mut self, arity: usize) -> bool {
        self.target.resize_plural(arity)
    }
}

/// Line-ending convention detected at parse time and reused on serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// File-level metadata carried alongside the units of one parse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogMeta {
    /// Target language code (BCP 47 style, e.g. "cs", "pt-BR").
    pub language: String,

    /// How unit identities are derived for this catalog.
    pub identity_rule: IdentityRule,

    /// Registry name of the format this catalog was parsed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub format: Option<String>,

    /// Comment block preceding the first unit (PO header comments,
    /// XML prologue comments).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub header_comment: Option<String>,

    /// Structured header fields (PO metadata entries).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(default)]
    pub header: BTreeMap<String, String>,

    /// Detected encoding label (e.g. "UTF-8", "ISO-8859-1").
    pub encoding: String,

    /// Whether the input carried a byte-order mark to restore on write.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub bom: bool,

    pub line_ending: LineEnding,

    /// Source path, recorded by the store when reading from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Content hash of the bytes this catalog was parsed from; write-back
    /// compares it against the file on disk to reject stale edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub base_hash: Option<String>,
}

impl CatalogMeta {
    pub fn new(language: impl Into<String>, identity_rule: IdentityRule) -> Self {
        CatalogMeta {
            language: language.into(),
            identity_rule,
            format: None,
            header_comment: None,
            header: BTreeMap::new(),
            encoding: "UTF-8".to_string(),
            bom: false,
            line_ending: LineEnding::default(),
            path: None,
            base_hash: None,
        }
    }
}

/// An ordered unit collection produced by one file parse, plus the
/// file-level metadata needed to serialize without spurious diffs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Catalog {
    pub meta: CatalogMeta,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Catalog {
    pub fn new(meta: CatalogMeta) -> Self {
        Catalog {
            meta,
            units: Vec::new(),
        }
    }

    /// Appends a unit, assigning the next ordinal position.
    pub fn push_unit(&mut self, mut unit: Unit) {
        unit.set_position(self.units.len());
        self.units.push(unit);
    }

    /// Reassigns positions to the current unit order.
    pub fn renumber(&mut self) {
        for (index, unit) in self.units.iter_mut().enumerate() {
            unit.set_position(index);
        }
    }

    /// The identity of one of this catalog's units, per the catalog's
    /// identity rule.
    pub fn identity_of(&self, unit: &Unit) -> String {
        crate::identity::unit_identity(unit, self.meta.identity_rule)
    }

    pub fn find_by_identity(&self, identity: &str) -> Option<&Unit> {
        self.units
            .iter()
            .find(|unit| self.identity_of(unit) == identity)
    }

    pub fn find_by_identity_mut(&mut self, identity: &str) -> Option<&mut Unit> {
        let rule = self.meta.identity_rule;
        self.units
            .iter_mut()
            .find(|unit| crate::identity::unit_identity(unit, rule) == identity)
    }

    /// Units that are not flagged obsolete.
    pub fn active_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|unit| !unit.is_obsolete())
    }

    pub fn language_id(&self) -> Option<LanguageIdentifier> {
        self.meta.language.parse().ok()
    }

    /// Check if this catalog is for the given language (base subtag
    /// comparison, so "pt-BR" matches "pt").
    pub fn has_language(&self, lang: &str) -> bool {
        match (self.language_id(), lang.parse::<LanguageIdentifier>()) {
            (Some(own), Ok(other)) => own.language == other.language,
            _ => false,
        }
    }
}
