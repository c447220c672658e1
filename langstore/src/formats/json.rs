//! Support for JSON translation files.
//!
//! Three dialects share one driver: `Flat` (top-level keys only),
//! `Nested` (objects flattened to dotted paths), and `I18next` (nested
//! plus `_one`/`_other` style suffix keys grouped into plural units).
//! Flattening is reversible: a key segment that itself contains a dot is
//! recorded so the rebuild does not re-split it.

use serde_json::{Map, Value};

use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    plural::{self, PluralCategory, PluralRules},
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, JsonDialect, Linguality, Parsed,
        ParseReport, Warning,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

/// Original segmentation of a key whose segments contain literal dots,
/// stored as a JSON string array.
const SEGMENTS_KEY: &str = "json.segments";
/// Marks a value that was a JSON number, boolean, or null.
const LITERAL_KEY: &str = "json.literal";

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Monolingual,
            identity: IdentityRule::NativeKey,
            supports_plurals: true,
            supports_context: true,
            supports_flags: false,
            supports_locations: false,
            supports_obsolete: false,
            extra_states: &[],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let decoded = encoding::decode(bytes, options.encoding.as_deref())?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::NativeKey);
        meta.format = Some("json".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let root: Value = serde_json::from_str(&decoded.text)?;
        let object = match root {
            Value::Object(object) => object,
            _ => return Err(Error::malformed(None, "document root must be an object")),
        };

        let mut leaves = Vec::new();
        match options.json_dialect {
            JsonDialect::Flat => {
                for (key, value) in object {
                    if value.is_object() || value.is_array() {
                        return Err(Error::malformed(
                            None,
                            format!("nested value under `{}` in flat dialect", key),
                        ));
                    }
                    leaves.push(Leaf::new(vec![key], value));
                }
            }
            JsonDialect::Nested | JsonDialect::I18next => {
                flatten(&object, &mut Vec::new(), &mut leaves, &mut report);
            }
        }

        let mut catalog = Catalog::new(meta);
        if options.json_dialect == JsonDialect::I18next {
            let rules = plural::rules_for_str(&catalog.meta.language);
            for group in group_plurals(leaves, rules, &mut report) {
                catalog.push_unit(group.into_unit(options));
            }
        } else {
            for leaf in leaves {
                catalog.push_unit(leaf.into_unit(options));
            }
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let rules = plural::rules_for_str(&catalog.meta.language);
        let mut root = Map::new();

        for unit in catalog.active_units() {
            let segments = segments_of(unit);
            match text_of(unit, options) {
                Text::Singular(text) => {
                    let value = rebuild_value(unit, text);
                    insert_path(&mut root, &segments, value, unit)?;
                }
                Text::Plural(forms) => {
                    if options.json_dialect != JsonDialect::I18next {
                        return Err(Error::unsupported(format!(
                            "plural unit `{}` requires the i18next dialect",
                            unit.label()
                        )));
                    }
                    let stem = segments
                        .last()
                        .cloned()
                        .ok_or_else(|| Error::mismatch("unit without a key"))?;
                    for (index, form) in forms.iter().enumerate() {
                        if form.is_empty() {
                            continue;
                        }
                        let category = rules.category_at(index).unwrap_or(PluralCategory::Other);
                        let mut plural_segments = segments.clone();
                        *plural_segments
                            .last_mut()
                            .ok_or_else(|| Error::mismatch("unit without a key"))? =
                            format!("{}_{}", stem, category.as_str());
                        insert_path(
                            &mut root,
                            &plural_segments,
                            Value::String(form.clone()),
                            unit,
                        )?;
                    }
                }
            }
        }

        let mut text = if options.json_dialect == JsonDialect::Flat {
            serde_json::to_string_pretty(&flatten_for_output(root))?
        } else {
            serde_json::to_string_pretty(&restore_arrays(Value::Object(root)))?
        };
        text.push('\n');
        encoding::encode_output(&text, &catalog.meta)
    }
}

enum Text<'a> {
    Singular(&'a str),
    Plural(&'a [String]),
}

fn text_of<'a>(unit: &'a Unit, options: &DriverOptions) -> Text<'a> {
    let message = if options.template {
        unit.source()
    } else {
        unit.target()
    };
    match message {
        Message::Singular(text) => Text::Singular(text),
        Message::Plural(forms) => Text::Plural(forms),
    }
}

struct Leaf {
    segments: Vec<String>,
    value: Value,
}

impl Leaf {
    fn new(segments: Vec<String>, value: Value) -> Self {
        Leaf { segments, value }
    }

    fn identity(&self) -> String {
        self.segments.join(".")
    }

    fn text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn is_literal(&self) -> bool {
        !self.value.is_string()
    }

    fn into_unit(self, options: &DriverOptions) -> Unit {
        let identity = self.identity();
        let text = Message::singular(self.text());
        let mut unit = if options.template {
            Unit::new(Some(identity), text)
        } else {
            let state = if text.is_blank() {
                State::Empty
            } else {
                State::Translated
            };
            Unit::new(Some(identity), Message::singular(String::new()))
                .with_target(text)
                .with_state(state)
        };
        if self.is_literal() {
            unit = unit.with_extra(LITERAL_KEY, "1");
        }
        if self.segments.iter().any(|segment| segment.contains('.')) {
            if let Ok(encoded) = serde_json::to_string(&self.segments) {
                unit = unit.with_extra(SEGMENTS_KEY, encoded);
            }
        }
        unit
    }
}

/// Depth-first flatten. Arrays become numeric segments; a segment that
/// contains a literal dot is flagged when its flattened identity collides
/// with a structural path.
fn flatten(
    object: &Map<String, Value>,
    path: &mut Vec<String>,
    leaves: &mut Vec<Leaf>,
    report: &mut ParseReport,
) {
    for (key, value) in object {
        path.push(key.clone());
        match value {
            Value::Object(child) => flatten(child, path, leaves, report),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    match item {
                        Value::Object(child) => flatten(child, path, leaves, report),
                        other => leaves.push(Leaf::new(path.clone(), other.clone())),
                    }
                    path.pop();
                }
            }
            other => {
                let leaf = Leaf::new(path.clone(), other.clone());
                if key.contains('.') {
                    let identity = leaf.identity();
                    if leaves.iter().any(|existing| existing.identity() == identity) {
                        report.push(Warning::StructuralAmbiguity {
                            key: identity,
                            detail: "literal dotted key collides with a flattened path"
                                .to_string(),
                        });
                    }
                }
                leaves.push(leaf);
            }
        }
        path.pop();
    }
}

/// A unit-to-be after i18next plural grouping.
struct Grouped {
    segments: Vec<String>,
    message: GroupedMessage,
    literal: bool,
}

enum GroupedMessage {
    Singular(String),
    Plural(Vec<String>),
}

impl Grouped {
    fn into_unit(self, options: &DriverOptions) -> Unit {
        let identity = self.segments.join(".");
        let message = match self.message {
            GroupedMessage::Singular(text) => Message::singular(text),
            GroupedMessage::Plural(forms) => Message::plural(forms),
        };
        let mut unit = if options.template {
            Unit::new(Some(identity), message)
        } else {
            let state = if message.is_blank() {
                State::Empty
            } else {
                State::Translated
            };
            Unit::new(Some(identity), message.blank_like())
                .with_target(message)
                .with_state(state)
        };
        if self.literal {
            unit = unit.with_extra(LITERAL_KEY, "1");
        }
        if self.segments.iter().any(|segment| segment.contains('.')) {
            if let Ok(encoded) = serde_json::to_string(&self.segments) {
                unit = unit.with_extra(SEGMENTS_KEY, encoded);
            }
        }
        unit
    }
}

/// Groups `stem_category` siblings into plural units, in first-occurrence
/// order. A suffix the language does not use is reported and dropped.
fn group_plurals(
    leaves: Vec<Leaf>,
    rules: PluralRules,
    report: &mut ParseReport,
) -> Vec<Grouped> {
    let mut grouped: Vec<Grouped> = Vec::new();

    for leaf in leaves {
        let split = leaf
            .segments
            .last()
            .and_then(|last| split_plural_suffix(last));
        match split {
            Some((stem, category)) => {
                let mut stem_segments = leaf.segments.clone();
                if let Some(last) = stem_segments.last_mut() {
                    *last = stem.to_string();
                }
                let index = match rules.index_of(category) {
                    Some(index) => index,
                    None => {
                        report.push(Warning::StructuralAmbiguity {
                            key: leaf.identity(),
                            detail: format!(
                                "plural suffix `_{}` not used by this language",
                                category.as_str()
                            ),
                        });
                        continue;
                    }
                };
                let text = leaf.text();
                let position = grouped.iter().position(|g| {
                    g.segments == stem_segments && matches!(g.message, GroupedMessage::Plural(_))
                });
                match position {
                    Some(position) => {
                        if let GroupedMessage::Plural(forms) = &mut grouped[position].message {
                            forms[index] = text;
                        }
                    }
                    None => {
                        let mut forms = vec![String::new(); rules.arity()];
                        forms[index] = text;
                        grouped.push(Grouped {
                            segments: stem_segments,
                            message: GroupedMessage::Plural(forms),
                            literal: false,
                        });
                    }
                }
            }
            None => grouped.push(Grouped {
                literal: leaf.is_literal(),
                message: GroupedMessage::Singular(leaf.text()),
                segments: leaf.segments,
            }),
        }
    }
    grouped
}

fn split_plural_suffix(key: &str) -> Option<(&str, PluralCategory)> {
    let (stem, suffix) = key.rsplit_once('_')?;
    if stem.is_empty() {
        return None;
    }
    let category = suffix.parse::<PluralCategory>().ok()?;
    Some((stem, category))
}

/// The key segments to rebuild under: recorded segmentation when present,
/// otherwise the identity split on dots.
fn segments_of(unit: &Unit) -> Vec<String> {
    if let Some(encoded) = unit.extra().get(SEGMENTS_KEY) {
        if let Ok(segments) = serde_json::from_str::<Vec<String>>(encoded) {
            if !segments.is_empty() {
                return segments;
            }
        }
    }
    unit.context()
        .unwrap_or_default()
        .split('.')
        .map(str::to_string)
        .collect()
}

/// Restores a non-string literal when the unit was parsed from one and the
/// text still parses as that JSON value.
fn rebuild_value(unit: &Unit, text: &str) -> Value {
    if unit.extra().contains_key(LITERAL_KEY) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if !value.is_string() && !value.is_object() && !value.is_array() {
                return value;
            }
        }
    }
    Value::String(text.to_string())
}

/// Inserts a value at a segment path, creating intermediate objects. A
/// collision between a leaf and an object is a hard error, never a silent
/// overwrite.
fn insert_path(
    root: &mut Map<String, Value>,
    segments: &[String],
    value: Value,
    unit: &Unit,
) -> Result<(), Error> {
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(Error::mismatch(format!(
                    "key `{}` collides with an existing value at `{}`",
                    unit.label(),
                    segment
                )));
            }
        };
    }
    let last = match segments.last() {
        Some(last) => last.clone(),
        None => return Err(Error::mismatch("unit without a key")),
    };
    if current.contains_key(&last) {
        return Err(Error::mismatch(format!(
            "key `{}` collides with an existing value",
            unit.label()
        )));
    }
    current.insert(last, value);
    Ok(())
}

/// Turns objects whose keys are exactly `0..n` back into arrays, undoing
/// the numeric segments the flatten step produced.
fn restore_arrays(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let is_array = !map.is_empty()
                && map
                    .keys()
                    .enumerate()
                    .all(|(index, key)| key.parse::<usize>() == Ok(index));
            if is_array {
                Value::Array(map.into_iter().map(|(_, v)| restore_arrays(v)).collect())
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, restore_arrays(v)))
                        .collect(),
                )
            }
        }
        other => other,
    }
}

/// Rejoins one level of nesting for flat output; anything deeper was
/// rejected when the catalog was built.
fn flatten_for_output(root: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    let mut stack: Vec<(String, Value)> = root.into_iter().collect();
    stack.reverse();
    while let Some((key, value)) = stack.pop() {
        match value {
            Value::Object(child) => {
                for (child_key, child_value) in child.into_iter().rev() {
                    stack.push((format!("{}.{}", key, child_key), child_value));
                }
            }
            other => {
                flat.insert(key, other);
            }
        }
    }
    flat
}
