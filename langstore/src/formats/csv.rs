//! Support for delimiter-separated translation tables.
//!
//! Columns are discovered from the header row (`key`, `context`,
//! `source`, `target`, `state`, `comment`, in any order); headerless
//! input falls back to positional `key,target` or `key,source,target`.
//! The delimiter is auto-detected from the header row unless the caller
//! pins one.

use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

/// Disambiguation context read from a `context` column when the key
/// column already owns the identity.
const CONTEXT_KEY: &str = "csv.context";

const DELIMITER_HEADER: &str = "delimiter";
const COLUMNS_HEADER: &str = "columns";
const HEADERLESS_HEADER: &str = "headerless";

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Both,
            identity: IdentityRule::NativeKey,
            supports_plurals: false,
            supports_context: true,
            supports_flags: false,
            supports_locations: false,
            supports_obsolete: false,
            extra_states: &[State::NeedsEditing, State::Approved, State::ReadOnly],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let decoded = encoding::decode(bytes, options.encoding.as_deref())?;
        let mut report = ParseReport::new();

        let delimiter = match options.csv_delimiter {
            Some(delimiter) => delimiter,
            None => detect_delimiter(&decoded.text)?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(decoded.text.as_bytes());

        let mut records = reader.records();
        let first = match records.next() {
            Some(record) => record?,
            None => {
                let mut meta = meta_for(options, IdentityRule::NativeKey);
                meta.encoding = decoded.encoding;
                meta.bom = decoded.bom;
                meta.line_ending = decoded.line_ending;
                return Ok(Parsed {
                    catalog: Catalog::new(meta),
                    report,
                });
            }
        };

        let layout = Layout::from_first_record(&first)?;
        let rule = if layout.has(Column::Key) {
            IdentityRule::NativeKey
        } else {
            IdentityRule::ContextSource
        };

        let mut meta = meta_for(options, rule);
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;
        meta.header
            .insert(DELIMITER_HEADER.to_string(), (delimiter as char).to_string());
        meta.header
            .insert(COLUMNS_HEADER.to_string(), layout.names().join(","));
        if layout.headerless {
            meta.header
                .insert(HEADERLESS_HEADER.to_string(), "1".to_string());
        }

        let mut catalog = Catalog::new(meta);
        if layout.headerless {
            catalog.push_unit(layout.build_unit(&first, options)?);
        }
        for record in records {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            catalog.push_unit(layout.build_unit(&record, options)?);
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let delimiter = options
            .csv_delimiter
            .or_else(|| {
                catalog
                    .meta
                    .header
                    .get(DELIMITER_HEADER)
                    .and_then(|value| value.bytes().next())
            })
            .unwrap_or(b',');

        let columns = match catalog.meta.header.get(COLUMNS_HEADER) {
            Some(recorded) => recorded
                .split(',')
                .map(Column::from_name)
                .collect::<Vec<Column>>(),
            None => default_columns(catalog),
        };
        let headerless = catalog
            .meta
            .header
            .get(HEADERLESS_HEADER)
            .is_some_and(|value| value == "1");

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        if !headerless {
            writer.write_record(columns.iter().map(Column::name))?;
        }
        for unit in catalog.active_units() {
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                row.push(cell_for(unit, *column, &columns, options)?);
            }
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|error| Error::Csv(error.into_error().into()))?;
        let text = String::from_utf8(bytes)
            .map_err(|error| Error::encoding("UTF-8", error.to_string()))?;
        encoding::encode_output(&text, &catalog.meta)
    }
}

fn meta_for(options: &DriverOptions, rule: IdentityRule) -> CatalogMeta {
    let mut meta = CatalogMeta::new(options.language_code(), rule);
    meta.format = Some("csv".to_string());
    meta
}

/// Counts candidate delimiters outside quoted cells in the first line. A
/// unique maximum wins; anything else is ambiguous.
fn detect_delimiter(text: &str) -> Result<u8, Error> {
    const CANDIDATES: [u8; 3] = [b',', b';', b'\t'];
    let first_line = text.lines().next().unwrap_or("");
    let mut counts = [0usize; 3];
    let mut in_quotes = false;
    for ch in first_line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => counts[0] += 1,
            ';' if !in_quotes => counts[1] += 1,
            '\t' if !in_quotes => counts[2] += 1,
            _ => {}
        }
    }
    let best = counts.iter().copied().max().unwrap_or(0);
    if best == 0 {
        return Err(Error::malformed(
            1,
            "cannot detect a delimiter; pass one explicitly",
        ));
    }
    if counts.iter().filter(|&&count| count == best).count() > 1 {
        return Err(Error::malformed(
            1,
            "ambiguous delimiter; pass one explicitly",
        ));
    }
    let index = counts
        .iter()
        .position(|&count| count == best)
        .unwrap_or_default();
    Ok(CANDIDATES[index])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Key,
    Context,
    Source,
    Target,
    State,
    Comment,
    Ignored,
}

impl Column {
    fn from_name(name: &str) -> Column {
        match name.trim().to_ascii_lowercase().as_str() {
            "key" | "id" => Column::Key,
            "context" | "msgctxt" => Column::Context,
            "source" | "original" => Column::Source,
            "target" | "translation" => Column::Target,
            "state" | "status" => Column::State,
            "comment" | "note" => Column::Comment,
            _ => Column::Ignored,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Column::Key => "key",
            Column::Context => "context",
            Column::Source => "source",
            Column::Target => "target",
            Column::State => "state",
            Column::Comment => "comment",
            Column::Ignored => "",
        }
    }
}

struct Layout {
    columns: Vec<Column>,
    headerless: bool,
}

impl Layout {
    fn from_first_record(record: &csv::StringRecord) -> Result<Layout, Error> {
        let named: Vec<Column> = record.iter().map(Column::from_name).collect();
        if named.iter().any(|column| *column != Column::Ignored) {
            return Ok(Layout {
                columns: named,
                headerless: false,
            });
        }
        let columns = match record.len() {
            2 => vec![Column::Key, Column::Target],
            3 => vec![Column::Key, Column::Source, Column::Target],
            other => {
                return Err(Error::malformed(
                    record_line(record),
                    format!("headerless input needs 2 or 3 columns, found {other}"),
                ));
            }
        };
        Ok(Layout {
            columns,
            headerless: true,
        })
    }

    fn has(&self, wanted: Column) -> bool {
        self.columns.contains(&wanted)
    }

    fn names(&self) -> Vec<&'static str> {
        self.columns.iter().map(Column::name).collect()
    }

    fn cell<'a>(&self, record: &'a csv::StringRecord, wanted: Column) -> Option<&'a str> {
        self.columns
            .iter()
            .position(|column| *column == wanted)
            .and_then(|index| record.get(index))
    }

    fn build_unit(&self, record: &csv::StringRecord, options: &DriverOptions) -> Result<Unit, Error> {
        let line = record_line(record);
        let key = self.cell(record, Column::Key).unwrap_or("");
        if self.has(Column::Key) && key.is_empty() {
            return Err(Error::malformed(line, "row without a key"));
        }
        let context = self.cell(record, Column::Context).unwrap_or("");
        let source = self.cell(record, Column::Source).unwrap_or("");
        let target = self.cell(record, Column::Target).unwrap_or("");
        let comment = self.cell(record, Column::Comment).unwrap_or("");

        let bilingual = self.has(Column::Source);
        let unit_context = if self.has(Column::Key) {
            Some(key.to_string())
        } else if context.is_empty() {
            None
        } else {
            Some(context.to_string())
        };

        let mut unit = if bilingual {
            Unit::new(unit_context, Message::singular(source))
                .with_target(Message::singular(target))
        } else if options.template {
            Unit::new(unit_context, Message::singular(target))
        } else {
            Unit::new(unit_context, Message::singular(""))
                .with_target(Message::singular(target))
        };

        let state = match self.cell(record, Column::State) {
            Some(cell) if !cell.trim().is_empty() => cell
                .parse::<State>()
                .map_err(|_| Error::malformed(line, format!("unknown state `{}`", cell.trim())))?,
            _ => {
                if unit.target().is_blank() {
                    State::Empty
                } else {
                    State::Translated
                }
            }
        };
        unit = unit.with_state(state);

        if !comment.is_empty() {
            unit = unit.with_developer_note(comment);
        }
        if self.has(Column::Key) && !context.is_empty() {
            unit = unit.with_extra(CONTEXT_KEY, context);
        }
        Ok(unit)
    }
}

fn record_line(record: &csv::StringRecord) -> Option<usize> {
    record.position().map(|position| position.line() as usize)
}

fn default_columns(catalog: &Catalog) -> Vec<Column> {
    let mut columns = Vec::new();
    match catalog.meta.identity_rule {
        IdentityRule::NativeKey => columns.push(Column::Key),
        IdentityRule::ContextSource => columns.push(Column::Context),
    }
    if catalog
        .active_units()
        .any(|unit| unit.extra().contains_key(CONTEXT_KEY))
    {
        columns.push(Column::Context);
    }
    columns.extend([Column::Source, Column::Target, Column::State, Column::Comment]);
    columns.dedup();
    columns
}

fn cell_for(
    unit: &Unit,
    column: Column,
    columns: &[Column],
    options: &DriverOptions,
) -> Result<String, Error> {
    let singular = |message: &Message| -> Result<String, Error> {
        match message {
            Message::Singular(text) => Ok(text.clone()),
            Message::Plural(_) => Err(Error::unsupported(format!(
                "plural unit `{}` cannot be written as a table row",
                unit.label()
            ))),
        }
    };
    Ok(match column {
        Column::Key => unit.context().unwrap_or("").to_string(),
        Column::Context => {
            if columns.contains(&Column::Key) {
                unit.extra().get(CONTEXT_KEY).cloned().unwrap_or_default()
            } else {
                unit.context().unwrap_or("").to_string()
            }
        }
        Column::Source => singular(unit.source())?,
        Column::Target => {
            if options.template && !columns.contains(&Column::Source) {
                singular(unit.source())?
            } else {
                singular(unit.target())?
            }
        }
        Column::State => unit.state().as_str().to_string(),
        Column::Comment => unit
            .notes()
            .developer
            .clone()
            .unwrap_or_default(),
        Column::Ignored => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(content: &str) -> Parsed {
        Driver
            .parse(content.as_bytes(), &DriverOptions::new().with_language("cs"))
            .unwrap()
    }

    #[test]
    fn test_header_driven_columns() {
        let parsed = parse(indoc! {"
            key,source,target,state,comment
            greeting,Hello,Ahoj,translated,Shown at startup
            farewell,Bye,,,
        "});
        assert!(parsed.report.is_clean());
        let units = &parsed.catalog.units;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].context(), Some("greeting"));
        assert_eq!(units[0].source().first(), "Hello");
        assert_eq!(units[0].target().first(), "Ahoj");
        assert_eq!(units[0].state(), State::Translated);
        assert_eq!(units[0].notes().developer.as_deref(), Some("Shown at startup"));
        assert_eq!(units[1].state(), State::Empty);
    }

    #[test]
    fn test_semicolon_auto_detected() {
        let parsed = parse("key;target\ngreeting;Ahoj\n");
        assert_eq!(
            parsed.catalog.meta.header.get("delimiter").map(String::as_str),
            Some(";")
        );
        assert_eq!(parsed.catalog.units[0].target().first(), "Ahoj");
    }

    #[test]
    fn test_explicit_delimiter_wins() {
        let parsed = Driver
            .parse(
                b"key\tsource,and more\ngreeting\tHello, world\n",
                &DriverOptions::new().with_csv_delimiter(b'\t'),
            )
            .unwrap();
        assert_eq!(
            parsed.catalog.units[0].target().first(),
            "Hello, world"
        );
    }

    #[test]
    fn test_undetectable_delimiter_is_malformed() {
        let result = Driver.parse(b"hello\nworld\n", &DriverOptions::new());
        assert!(matches!(result, Err(Error::Malformed { line: Some(1), .. })));
    }

    #[test]
    fn test_headerless_two_columns() {
        let parsed = parse("greeting,Ahoj\nfarewell,Sbohem\n");
        assert_eq!(parsed.catalog.units.len(), 2);
        assert_eq!(parsed.catalog.units[0].context(), Some("greeting"));
        assert_eq!(parsed.catalog.units[0].target().first(), "Ahoj");
        assert!(parsed.catalog.units[0].source().is_blank());
    }

    #[test]
    fn test_headerless_three_columns_include_source() {
        let parsed = parse("greeting,Hello,Ahoj\n");
        assert_eq!(parsed.catalog.units[0].source().first(), "Hello");
        assert_eq!(parsed.catalog.units[0].target().first(), "Ahoj");
    }

    #[test]
    fn test_unknown_state_is_malformed_with_line() {
        let result = Driver.parse(
            b"key,target,state\ngreeting,Ahoj,sort-of-done\n",
            &DriverOptions::new(),
        );
        assert!(matches!(result, Err(Error::Malformed { line: Some(2), .. })));
    }

    #[test]
    fn test_quoted_cells_with_delimiter_and_newline() {
        let parsed = parse(indoc! {r#"
            key,target
            greeting,"Ahoj, světe"
            para,"First line
            second line"
        "#});
        assert_eq!(parsed.catalog.units[0].target().first(), "Ahoj, světe");
        assert_eq!(
            parsed.catalog.units[1].target().first(),
            "First line\nsecond line"
        );
    }

    #[test]
    fn test_round_trip_keeps_layout_and_delimiter() {
        let input = "key;target;comment\ngreeting;Ahoj;From the login page\n";
        let options = DriverOptions::new().with_language("cs");
        let parsed = Driver.parse(input.as_bytes(), &options).unwrap();
        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "key;target;comment\ngreeting;Ahoj;From the login page\n");
    }

    #[test]
    fn test_headerless_round_trip_stays_headerless() {
        let input = "greeting,Ahoj\n";
        let options = DriverOptions::new();
        let parsed = Driver.parse(input.as_bytes(), &options).unwrap();
        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "greeting,Ahoj\n");
    }

    #[test]
    fn test_template_parse_fills_source() {
        let parsed = Driver
            .parse(
                b"key,target\ngreeting,Hello\n",
                &DriverOptions::new().as_template(true),
            )
            .unwrap();
        assert_eq!(parsed.catalog.units[0].source().first(), "Hello");
        assert!(parsed.catalog.units[0].target().is_blank());
    }

    #[test]
    fn test_plural_unit_rejected() {
        let mut catalog = Catalog::new(CatalogMeta::new("cs", IdentityRule::NativeKey));
        catalog.push_unit(
            Unit::new(Some("files".into()), Message::singular(""))
                .with_target(Message::plural(vec!["a".into(), "b".into(), "c".into()]))
                .with_state(State::Translated),
        );
        let result = Driver.serialize(&catalog, &DriverOptions::new());
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_empty_input_yields_empty_catalog() {
        let parsed = Driver.parse(b"", &DriverOptions::new()).unwrap();
        assert!(parsed.catalog.units.is_empty());
    }
}
