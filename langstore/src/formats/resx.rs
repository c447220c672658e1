//! Support for .NET `.resx` resource files.
//!
//! Only string `<data>` entries are translation content. Binary or typed
//! resources (entries with `type`/`mimetype` attributes) are reported and
//! skipped. The `<resheader>` preamble survives a round trip through the
//! catalog header.

use quick_xml::{
    escape::escape,
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
        Warning,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

const RESHEADER_NAMES: [(&str, &str); 4] = [
    ("resmimetype", "text/microsoft-resx"),
    ("version", "2.0"),
    (
        "reader",
        "System.Resources.ResXResourceReader, System.Windows.Forms",
    ),
    (
        "writer",
        "System.Resources.ResXResourceWriter, System.Windows.Forms",
    ),
];

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
        meta.format = Some("resx".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;
        let mut catalog = Catalog::new(meta);

        let mut reader = Reader::from_reader(decoded.text.as_bytes());
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"root" => {}
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"resheader" => {
                    let name = name_attribute(e)?;
                    let entry = read_entry(&mut reader, b"resheader")?;
                    catalog.meta.header.insert(name, entry.value);
                }
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"data" => {
                    match data_header(e)? {
                        DataHeader::Text(name) => {
                            let entry = read_entry(&mut reader, b"data")?;
                            catalog.push_unit(build_unit(name, entry, options));
                        }
                        DataHeader::Typed(name) => {
                            report.push(Warning::StructuralAmbiguity {
                                key: name,
                                detail: "typed resource entry is not translatable text"
                                    .to_string(),
                            });
                            skip_subtree(&mut reader, b"data")?;
                        }
                    }
                }
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"data" => {
                    if let DataHeader::Text(name) = data_header(e)? {
                        catalog.push_unit(build_unit(name, Entry::default(), options));
                    }
                }
                Ok(Event::Start(ref e)) => {
                    // assembly, metadata, and the embedded xsd schema carry
                    // no translation content
                    let name = e.name().as_ref().to_vec();
                    skip_subtree(&mut reader, &name)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Xml(e)),
            }
            buf.clear();
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut content = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<root>\n");
        for (name, default) in RESHEADER_NAMES {
            let value = catalog
                .meta
                .header
                .get(name)
                .map(String::as_str)
                .unwrap_or(default);
            content.push_str(&format!(
                "  <resheader name=\"{}\">\n    <value>{}</value>\n  </resheader>\n",
                name,
                escape(value)
            ));
        }

        for unit in catalog.active_units() {
            let name = unit.context().unwrap_or_default();
            let message = if options.template {
                unit.source()
            } else {
                unit.target()
            };
            let text = match message {
                Message::Singular(text) => text,
                Message::Plural(_) => {
                    return Err(Error::unsupported(format!(
                        "plural unit `{}` cannot be written as a resx entry",
                        unit.label()
                    )));
                }
            };
            content.push_str(&format!(
                "  <data name=\"{}\" xml:space=\"preserve\">\n    <value>{}</value>\n",
                escape(name),
                escape(text.as_str())
            ));
            if let Some(note) = &unit.notes().developer {
                content.push_str(&format!("    <comment>{}</comment>\n", escape(note.as_str())));
            }
            content.push_str("  </data>\n");
        }
        content.push_str("</root>\n");
        encoding::encode_output(&content, &catalog.meta)
    }
}

enum DataHeader {
    Text(String),
    Typed(String),
}

fn data_header(e: &BytesStart) -> Result<DataHeader, Error> {
    let mut name = None;
    let mut typed = false;
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::malformed(None, e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.to_string()),
            b"type" | b"mimetype" => typed = true,
            _ => {}
        }
    }
    let name = name.ok_or_else(|| Error::malformed(None, "data element missing 'name'"))?;
    Ok(if typed {
        DataHeader::Typed(name)
    } else {
        DataHeader::Text(name)
    })
}

fn name_attribute(e: &BytesStart) -> Result<String, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::malformed(None, e.to_string()))?;
        if attr.key.as_ref() == b"name" {
            return Ok(attr.unescape_value()?.to_string());
        }
    }
    Err(Error::malformed(None, "element missing 'name'"))
}

#[derive(Default)]
struct Entry {
    value: String,
    comment: Option<String>,
}

/// Reads `<value>` and optional `<comment>` children up to the closing
/// tag. Value whitespace is content (`xml:space="preserve"`).
fn read_entry(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<Entry, Error> {
    let mut entry = Entry::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"value" => {
                entry.value = read_text(reader, b"value")?;
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"comment" => {
                let comment = read_text(reader, b"comment")?.trim().to_string();
                if !comment.is_empty() {
                    entry.comment = Some(comment);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == end => break,
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in data entry")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }
    Ok(entry)
}

fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, Error> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => text.push_str(&e.unescape()?),
            Ok(Event::CData(e)) => {
                text.push_str(
                    &String::from_utf8(e.to_vec())
                        .map_err(|e| Error::encoding("UTF-8", e.to_string()))?,
                );
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == end => break,
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in element")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }
    Ok(text)
}

fn skip_subtree(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<(), Error> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == end {
                    return Ok(());
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }
}

fn build_unit(name: String, entry: Entry, options: &DriverOptions) -> Unit {
    let message = Message::singular(entry.value);
    let mut unit = if options.template {
        Unit::new(Some(name), message)
    } else {
        let state = if message.is_blank() {
            State::Empty
        } else {
            State::Translated
        };
        Unit::new(Some(name), message.blank_like())
            .with_target(message)
            .with_state(state)
    };
    if let Some(comment) = entry.comment {
        unit = unit.with_developer_note(comment);
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="utf-8"?>
        <root>
          <resheader name="resmimetype">
            <value>text/microsoft-resx</value>
          </resheader>
          <resheader name="version">
            <value>2.0</value>
          </resheader>
          <data name="Greeting" xml:space="preserve">
            <value>Ahoj</value>
            <comment>Shown on the landing page</comment>
          </data>
          <data name="Empty" xml:space="preserve">
            <value></value>
          </data>
          <data name="Icon" type="System.Byte[], mscorlib">
            <value>AAEC</value>
          </data>
        </root>
    "#};

    #[test]
    fn test_parse_data_entries() {
        let parsed = Driver
            .parse(SAMPLE.as_bytes(), &DriverOptions::new().with_language("cs"))
            .unwrap();
        let units = &parsed.catalog.units;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].context(), Some("Greeting"));
        assert_eq!(units[0].target().first(), "Ahoj");
        assert_eq!(units[0].state(), State::Translated);
        assert_eq!(
            units[0].notes().developer.as_deref(),
            Some("Shown on the landing page")
        );
        assert_eq!(units[1].state(), State::Empty);
    }

    #[test]
    fn test_typed_entry_is_reported_and_skipped() {
        let parsed = Driver.parse(SAMPLE.as_bytes(), &DriverOptions::new()).unwrap();
        assert!(parsed.report.warnings.iter().any(|warning| matches!(
            warning,
            Warning::StructuralAmbiguity { key, .. } if key == "Icon"
        )));
    }

    #[test]
    fn test_resheaders_survive_round_trip() {
        let options = DriverOptions::new().with_language("cs");
        let parsed = Driver.parse(SAMPLE.as_bytes(), &options).unwrap();
        assert_eq!(
            parsed.catalog.meta.header.get("resmimetype").map(String::as_str),
            Some("text/microsoft-resx")
        );

        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<resheader name=\"resmimetype\">"));
        assert!(text.contains("<value>text/microsoft-resx</value>"));
        assert!(text.contains("<data name=\"Greeting\" xml:space=\"preserve\">"));
        assert!(text.contains("<value>Ahoj</value>"));
        assert!(text.contains("<comment>Shown on the landing page</comment>"));
    }

    #[test]
    fn test_serialize_escapes_markup() {
        let mut catalog = Catalog::new(CatalogMeta::new("cs", IdentityRule::NativeKey));
        catalog.push_unit(
            Unit::new(Some("Rich".into()), Message::singular(""))
                .with_target(Message::singular("a < b & \"c\""))
                .with_state(State::Translated),
        );
        let bytes = Driver.serialize(&catalog, &DriverOptions::new()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("a &lt; b &amp; &quot;c&quot;"));

        let reparsed = Driver.parse(&bytes, &DriverOptions::new()).unwrap();
        assert_eq!(reparsed.catalog.units[0].target().first(), "a < b & \"c\"");
    }

    #[test]
    fn test_template_mode_fills_source() {
        let parsed = Driver
            .parse(SAMPLE.as_bytes(), &DriverOptions::new().as_template(true))
            .unwrap();
        assert_eq!(parsed.catalog.units[0].source().first(), "Ahoj");
        assert!(parsed.catalog.units[0].target().is_blank());
    }

    #[test]
    fn test_value_whitespace_is_preserved() {
        let content = indoc! {r#"
            <root>
              <data name="Padded" xml:space="preserve">
                <value>  two spaces  </value>
              </data>
            </root>
        "#};
        let parsed = Driver.parse(content.as_bytes(), &DriverOptions::new()).unwrap();
        assert_eq!(parsed.catalog.units[0].target().first(), "  two spaces  ");
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let content = "<root><data xml:space=\"preserve\"><value>x</value></data></root>";
        let result = Driver.parse(content.as_bytes(), &DriverOptions::new());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
