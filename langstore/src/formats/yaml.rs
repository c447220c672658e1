//! Support for YAML translation files.
//!
//! Nested mappings flatten to dotted paths like the JSON driver. The
//! `RootKey` dialect handles Ruby-i18n style documents where the single
//! top-level key names the language and everything else hangs under it.

use serde_yaml::{Mapping, Value};

use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
        Warning, YamlDialect,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

/// Original segmentation of a dotted key, stored as a JSON string array.
const SEGMENTS_KEY: &str = "yaml.segments";
/// Marks a value that was not a YAML string.
const LITERAL_KEY: &str = "yaml.literal";

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Monolingual,
            identity: IdentityRule::NativeKey,
            supports_plurals: false,
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
        meta.format = Some("yaml".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let root: Value = serde_yaml::from_str(&decoded.text)?;
        let mapping = match root {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err(Error::malformed(None, "document root must be a mapping")),
        };

        let mapping = match options.yaml_dialect {
            YamlDialect::Plain => mapping,
            YamlDialect::RootKey => {
                if mapping.len() != 1 {
                    return Err(Error::malformed(
                        None,
                        "root-key dialect expects exactly one top-level key",
                    ));
                }
                let (key, value) = mapping
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::malformed(None, "empty document"))?;
                let language = scalar_key(&key)?;
                if options.language.is_none() {
                    meta.language = language.clone();
                }
                meta.header.insert("root-key".to_string(), language);
                match value {
                    Value::Mapping(inner) => inner,
                    Value::Null => Mapping::new(),
                    _ => {
                        return Err(Error::malformed(
                            None,
                            "root-key value must be a mapping",
                        ));
                    }
                }
            }
        };

        let mut catalog = Catalog::new(meta);
        let mut leaves = Vec::new();
        flatten(&mapping, &mut Vec::new(), &mut leaves, &mut report)?;
        for leaf in leaves {
            catalog.push_unit(leaf.into_unit(options));
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut root = Mapping::new();
        for unit in catalog.active_units() {
            let message = if options.template {
                unit.source()
            } else {
                unit.target()
            };
            let text = match message {
                Message::Singular(text) => text,
                Message::Plural(_) => {
                    return Err(Error::unsupported(format!(
                        "plural unit `{}` cannot be written as YAML",
                        unit.label()
                    )));
                }
            };
            let segments = segments_of(unit);
            insert_path(&mut root, &segments, rebuild_value(unit, text))?;
        }

        let document = match options.yaml_dialect {
            YamlDialect::Plain => Value::Mapping(root),
            YamlDialect::RootKey => {
                let key = catalog
                    .meta
                    .header
                    .get("root-key")
                    .cloned()
                    .unwrap_or_else(|| catalog.meta.language.clone());
                let mut outer = Mapping::new();
                outer.insert(Value::String(key), Value::Mapping(root));
                Value::Mapping(outer)
            }
        };

        let text = serde_yaml::to_string(&document)?;
        encoding::encode_output(&text, &catalog.meta)
    }
}

struct Leaf {
    segments: Vec<String>,
    text: String,
    literal: bool,
}

impl Leaf {
    fn into_unit(self, options: &DriverOptions) -> Unit {
        let identity = self.segments.join(".");
        let text = Message::singular(self.text);
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

fn scalar_key(key: &Value) -> Result<String, Error> {
    match key {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(value) => Ok(value.to_string()),
        _ => Err(Error::malformed(None, "mapping key must be a scalar")),
    }
}

fn scalar_text(value: &Value) -> Option<(String, bool)> {
    match value {
        Value::String(text) => Some((text.clone(), false)),
        Value::Number(number) => Some((number.to_string(), true)),
        Value::Bool(flag) => Some((flag.to_string(), true)),
        Value::Null => Some((String::new(), true)),
        _ => None,
    }
}

fn flatten(
    mapping: &Mapping,
    path: &mut Vec<String>,
    leaves: &mut Vec<Leaf>,
    report: &mut ParseReport,
) -> Result<(), Error> {
    for (key, value) in mapping {
        let key = scalar_key(key)?;
        path.push(key.clone());
        if key.contains('.') {
            let identity = path.join(".");
            if leaves
                .iter()
                .any(|existing| existing.segments.join(".") == identity)
            {
                report.push(Warning::StructuralAmbiguity {
                    key: identity,
                    detail: "literal dotted key collides with a flattened path".to_string(),
                });
            }
        }
        flatten_value(value, path, leaves, report)?;
        path.pop();
    }
    Ok(())
}

fn flatten_value(
    value: &Value,
    path: &mut Vec<String>,
    leaves: &mut Vec<Leaf>,
    report: &mut ParseReport,
) -> Result<(), Error> {
    match value {
        Value::Mapping(child) => flatten(child, path, leaves, report)?,
        Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                flatten_value(item, path, leaves, report)?;
                path.pop();
            }
        }
        other => {
            if let Some((text, literal)) = scalar_text(other) {
                leaves.push(Leaf {
                    segments: path.clone(),
                    text,
                    literal,
                });
            }
        }
    }
    Ok(())
}

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

fn rebuild_value(unit: &Unit, text: &str) -> Value {
    if unit.extra().contains_key(LITERAL_KEY) {
        if text.is_empty() {
            return Value::Null;
        }
        if let Ok(value) = serde_yaml::from_str::<Value>(text) {
            if value.is_number() || value.is_bool() {
                return value;
            }
        }
    }
    Value::String(text.to_string())
}

fn insert_path(root: &mut Mapping, segments: &[String], value: Value) -> Result<(), Error> {
    let mut current = root;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        let key = Value::String(segment.clone());
        let slot = current
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = match slot {
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::mismatch(format!(
                    "key segment `{}` collides with an existing value",
                    segment
                )));
            }
        };
    }
    let last = match segments.last() {
        Some(last) => Value::String(last.clone()),
        None => return Err(Error::mismatch("unit without a key")),
    };
    if current.contains_key(&last) {
        return Err(Error::mismatch("duplicate key on rebuild"));
    }
    current.insert(last, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse_dialect(content: &str, dialect: YamlDialect, language: &str) -> Parsed {
        Driver
            .parse(
                content.as_bytes(),
                &DriverOptions::new()
                    .with_language(language)
                    .with_yaml_dialect(dialect),
            )
            .unwrap()
    }

    #[test]
    fn test_plain_nested_flattening() {
        let parsed = parse_dialect(
            indoc! {r#"
                app:
                  title: Aplikace
                  menu:
                    file: Soubor
                plain: text
            "#},
            YamlDialect::Plain,
            "cs",
        );
        let identities: Vec<String> = parsed
            .catalog
            .units
            .iter()
            .map(|u| parsed.catalog.identity_of(u))
            .collect();
        assert_eq!(identities, ["app.title", "app.menu.file", "plain"]);
        assert_eq!(parsed.catalog.units[0].target().first(), "Aplikace");
    }

    #[test]
    fn test_root_key_dialect() {
        let parsed = parse_dialect(
            indoc! {r#"
                cs:
                  app:
                    title: Aplikace
            "#},
            YamlDialect::RootKey,
            "",
        );
        assert_eq!(parsed.catalog.meta.language, "cs");
        assert_eq!(
            parsed.catalog.identity_of(&parsed.catalog.units[0]),
            "app.title"
        );

        let bytes = Driver
            .serialize(
                &parsed.catalog,
                &DriverOptions::new().with_yaml_dialect(YamlDialect::RootKey),
            )
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("cs:\n"));
        assert!(text.contains("title: Aplikace"));
    }

    #[test]
    fn test_root_key_dialect_rejects_multiple_roots() {
        let result = Driver.parse(
            b"cs:\n  a: b\nde:\n  a: c\n",
            &DriverOptions::new().with_yaml_dialect(YamlDialect::RootKey),
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_round_trip_plain() {
        let content = indoc! {r#"
            app:
              title: Aplikace
            count: 42
            missing: null
        "#};
        let options = DriverOptions::new().with_language("cs");
        let parsed = Driver.parse(content.as_bytes(), &options).unwrap();
        assert_eq!(parsed.catalog.units[1].target().first(), "42");
        assert_eq!(parsed.catalog.units[2].state(), State::Empty);

        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("title: Aplikace"));
        assert!(text.contains("count: 42"));
    }

    #[test]
    fn test_plural_unit_rejected() {
        let mut catalog = Catalog::new(CatalogMeta::new("cs", IdentityRule::NativeKey));
        catalog.push_unit(
            Unit::new(Some("n".into()), Message::singular(""))
                .with_target(Message::plural(vec!["a".into(), "b".into(), "c".into()]))
                .with_state(State::Translated),
        );
        let result = Driver.serialize(&catalog, &DriverOptions::new());
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_non_mapping_root_is_malformed() {
        let result = Driver.parse(b"- a\n- b\n", &DriverOptions::new());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_template_mode_fills_source() {
        let parsed = Driver
            .parse(
                b"greeting: Hello\n",
                &DriverOptions::new().as_template(true),
            )
            .unwrap();
        assert_eq!(parsed.catalog.units[0].source().first(), "Hello");
        assert!(parsed.catalog.units[0].target().is_blank());
    }
}
