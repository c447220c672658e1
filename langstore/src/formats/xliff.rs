//! Support for XLIFF 1.2 translation interchange files.
//!
//! Covers `<trans-unit>` with `source`/`target`, the `approved` and
//! `translate` attributes, target `state` values, developer/translator
//! notes, and `context-group` location records. Inline markup inside
//! `source`/`target` is flattened to its text content.

use std::io::Cursor;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};

use crate::{
    encoding,
    error::Error,
    flags::Flag,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
    },
    types::{Catalog, CatalogMeta, Location, Message, State, Unit},
};

/// Original `id` attribute, kept so `resname`-keyed units re-emit it.
const ID_KEY: &str = "xliff.id";

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Bilingual,
            identity: IdentityRule::NativeKey,
            supports_plurals: false,
            supports_context: true,
            supports_flags: false,
            supports_locations: true,
            supports_obsolete: false,
            extra_states: &[State::NeedsEditing, State::Approved, State::ReadOnly],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let decoded = encoding::decode(bytes, options.encoding.as_deref())?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::NativeKey);
        meta.format = Some("xliff".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        // No trim_text here: whitespace inside source/target is content,
        // and trimming would also eat spaces around inline markup.
        let mut reader = Reader::from_reader(decoded.text.as_bytes());

        let mut catalog = Catalog::new(meta);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"file" => {
                    absorb_file_attributes(e, &mut catalog.meta, options)?;
                }
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"trans-unit" => {
                    let unit = parse_trans_unit(e, &mut reader)?;
                    catalog.push_unit(unit);
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

    fn serialize(&self, catalog: &Catalog, _options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut out = Cursor::new(Vec::new());
        let mut writer = Writer::new_with_indent(&mut out, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut xliff = BytesStart::new("xliff");
        xliff.push_attribute(("version", "1.2"));
        xliff.push_attribute(("xmlns", "urn:oasis:names:tc:xliff:document:1.2"));
        writer.write_event(Event::Start(xliff))?;

        let header = &catalog.meta.header;
        let mut file = BytesStart::new("file");
        let original = header.get("original").map(String::as_str).unwrap_or("messages");
        let source_language = header
            .get("source-language")
            .map(String::as_str)
            .unwrap_or("en");
        let datatype = header.get("datatype").map(String::as_str).unwrap_or("plaintext");
        file.push_attribute(("original", original));
        file.push_attribute(("source-language", source_language));
        file.push_attribute(("target-language", catalog.meta.language.as_str()));
        file.push_attribute(("datatype", datatype));
        writer.write_event(Event::Start(file))?;
        writer.write_event(Event::Start(BytesStart::new("body")))?;

        for unit in catalog.active_units() {
            write_trans_unit(&mut writer, catalog, unit)?;
        }

        writer.write_event(Event::End(BytesEnd::new("body")))?;
        writer.write_event(Event::End(BytesEnd::new("file")))?;
        writer.write_event(Event::End(BytesEnd::new("xliff")))?;

        let text = String::from_utf8(out.into_inner())
            .map_err(|e| Error::encoding("UTF-8", e.to_string()))?;
        encoding::encode_output(&text, &catalog.meta)
    }
}

fn attribute_value(e: &BytesStart, name: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::malformed(None, e.to_string()))?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn absorb_file_attributes(
    e: &BytesStart,
    meta: &mut CatalogMeta,
    options: &DriverOptions,
) -> Result<(), Error> {
    for key in ["original", "source-language", "datatype"] {
        if let Some(value) = attribute_value(e, key.as_bytes())? {
            meta.header.insert(key.to_string(), value);
        }
    }
    if let Some(target_language) = attribute_value(e, b"target-language")? {
        if options.language.is_none() {
            meta.language = target_language;
        }
    }
    Ok(())
}

/// Reads one `<trans-unit>` subtree into a unit.
fn parse_trans_unit(start: &BytesStart, reader: &mut Reader<&[u8]>) -> Result<Unit, Error> {
    let id = attribute_value(start, b"id")?
        .ok_or_else(|| Error::malformed(None, "trans-unit missing 'id'"))?;
    let resname = attribute_value(start, b"resname")?;
    let approved = attribute_value(start, b"approved")?.as_deref() == Some("yes");
    let translate_no = attribute_value(start, b"translate")?.as_deref() == Some("no");

    let mut source = String::new();
    let mut target: Option<String> = None;
    let mut target_state: Option<String> = None;
    let mut developer_note: Option<String> = None;
    let mut translator_note: Option<String> = None;
    let mut locations = Vec::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"source" => source = read_text_content(reader, b"source")?,
                b"target" => {
                    target_state = attribute_value(e, b"state")?;
                    target = Some(read_text_content(reader, b"target")?);
                }
                b"note" => {
                    let from = attribute_value(e, b"from")?;
                    let text = read_text_content(reader, b"note")?;
                    match from.as_deref() {
                        Some("translator") => append_note(&mut translator_note, text.trim()),
                        _ => append_note(&mut developer_note, text.trim()),
                    }
                }
                b"context-group" => {
                    if let Some(location) = parse_context_group(reader)? {
                        locations.push(location);
                    }
                }
                _ => skip_subtree(reader, e.name().as_ref().to_vec())?,
            },
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"target" => {
                target_state = attribute_value(e, b"state")?;
                target = Some(String::new());
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"trans-unit" => break,
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in trans-unit")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }

    let target_text = target.unwrap_or_default();
    let state = if approved {
        State::Approved
    } else if matches!(
        target_state.as_deref(),
        Some("needs-translation")
            | Some("needs-adaptation")
            | Some("needs-l10n")
            | Some("needs-review-translation")
    ) {
        State::NeedsEditing
    } else if target_text.is_empty() {
        State::Empty
    } else {
        State::Translated
    };

    let context = resname.clone().unwrap_or_else(|| id.clone());
    let mut unit = Unit::new(Some(context), Message::singular(source))
        .with_target(Message::singular(target_text))
        .with_state(state)
        .with_locations(locations)
        .with_extra(ID_KEY, id);
    if translate_no {
        let mut flags = unit.file_flags().clone();
        flags.set(Flag::new("read-only"));
        unit = unit.with_file_flags(flags).with_state(State::ReadOnly);
    }
    if let Some(note) = developer_note {
        unit = unit.with_developer_note(note);
    }
    if let Some(note) = translator_note {
        unit = unit.with_translator_note(note);
    }
    Ok(unit)
}

fn append_note(buffer: &mut Option<String>, text: &str) {
    match buffer {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text);
        }
        None => *buffer = Some(text.to_string()),
    }
}

/// Concatenates the text of an element, flattening any inline markup.
fn read_text_content(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, Error> {
    let mut text = String::new();
    let mut depth = 0usize;
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
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == end {
                    return Ok(text);
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in element")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }
}

fn skip_subtree(reader: &mut Reader<&[u8]>, name: Vec<u8>) -> Result<(), Error> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == name.as_slice() {
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

/// Reads a `<context-group>`, returning a location when it carries the
/// conventional `sourcefile`/`linenumber` pair.
fn parse_context_group(reader: &mut Reader<&[u8]>) -> Result<Option<Location>, Error> {
    let mut file: Option<String> = None;
    let mut line: Option<u32> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"context" => {
                let context_type = attribute_value(e, b"context-type")?;
                let text = read_text_content(reader, b"context")?;
                match context_type.as_deref() {
                    Some("sourcefile") => file = Some(text.trim().to_string()),
                    Some("linenumber") => line = text.trim().parse().ok(),
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"context-group" => break,
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in context-group")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }
    Ok(file.map(|f| Location::new(f, line)))
}

fn write_trans_unit<W: std::io::Write>(
    writer: &mut Writer<W>,
    catalog: &Catalog,
    unit: &Unit,
) -> Result<(), Error> {
    let target_text = match unit.target() {
        Message::Singular(text) => text.as_str(),
        Message::Plural(_) => {
            return Err(Error::unsupported(format!(
                "XLIFF 1.2 cannot express the plural unit `{}`",
                unit.label()
            )));
        }
    };
    let source_text = match unit.source() {
        Message::Singular(text) => text.as_str(),
        Message::Plural(forms) => forms.first().map(String::as_str).unwrap_or(""),
    };

    let identity = catalog.identity_of(unit);
    let id = unit.extra().get(ID_KEY).cloned().unwrap_or(identity);
    let mut start = BytesStart::new("trans-unit");
    start.push_attribute(("id", id.as_str()));
    if let Some(context) = unit.context() {
        if context != id {
            start.push_attribute(("resname", context));
        }
    }
    if unit.state() == State::Approved {
        start.push_attribute(("approved", "yes"));
    }
    if unit.is_read_only() {
        start.push_attribute(("translate", "no"));
    }
    writer.write_event(Event::Start(start))?;

    writer.write_event(Event::Start(BytesStart::new("source")))?;
    writer.write_event(Event::Text(BytesText::new(source_text)))?;
    writer.write_event(Event::End(BytesEnd::new("source")))?;

    if unit.state() == State::Empty {
        writer.write_event(Event::Empty(BytesStart::new("target")))?;
    } else {
        let mut target = BytesStart::new("target");
        let state = match unit.state() {
            State::Approved => "final",
            State::NeedsEditing => "needs-translation",
            _ => "translated",
        };
        target.push_attribute(("state", state));
        writer.write_event(Event::Start(target))?;
        writer.write_event(Event::Text(BytesText::new(target_text)))?;
        writer.write_event(Event::End(BytesEnd::new("target")))?;
    }

    if let Some(note) = &unit.notes().developer {
        write_note(writer, "developer", note)?;
    }
    if let Some(note) = &unit.notes().translator {
        write_note(writer, "translator", note)?;
    }
    for location in unit.locations() {
        let mut group = BytesStart::new("context-group");
        group.push_attribute(("purpose", "location"));
        writer.write_event(Event::Start(group))?;
        let mut context = BytesStart::new("context");
        context.push_attribute(("context-type", "sourcefile"));
        writer.write_event(Event::Start(context))?;
        writer.write_event(Event::Text(BytesText::new(&location.file)))?;
        writer.write_event(Event::End(BytesEnd::new("context")))?;
        if let Some(line) = location.line {
            let mut context = BytesStart::new("context");
            context.push_attribute(("context-type", "linenumber"));
            writer.write_event(Event::Start(context))?;
            writer.write_event(Event::Text(BytesText::new(&line.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new("context")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("context-group")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("trans-unit")))?;
    Ok(())
}

fn write_note<W: std::io::Write>(
    writer: &mut Writer<W>,
    from: &str,
    note: &str,
) -> Result<(), Error> {
    let mut start = BytesStart::new("note");
    start.push_attribute(("from", from));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(note)))?;
    writer.write_event(Event::End(BytesEnd::new("note")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(content: &str) -> Parsed {
        Driver.parse(content.as_bytes(), &DriverOptions::new()).unwrap()
    }

    const SAMPLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="utf-8"?>
        <xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
          <file original="app.pot" source-language="en" target-language="cs" datatype="plaintext">
            <body>
              <trans-unit id="u1" resname="greeting" approved="yes">
                <source>Hello</source>
                <target state="final">Ahoj</target>
                <note from="developer">Shown on startup</note>
              </trans-unit>
              <trans-unit id="u2">
                <source>Goodbye</source>
                <target state="needs-review-translation">Sbohem</target>
              </trans-unit>
              <trans-unit id="u3">
                <source>Pending</source>
                <target/>
              </trans-unit>
              <trans-unit id="u4" translate="no">
                <source>BrandName</source>
                <target state="translated">BrandName</target>
              </trans-unit>
            </body>
          </file>
        </xliff>
    "#};

    #[test]
    fn test_parse_states_and_identity() {
        let parsed = parse(SAMPLE);
        let catalog = &parsed.catalog;
        assert_eq!(catalog.meta.language, "cs");
        assert_eq!(catalog.units.len(), 4);

        let greeting = &catalog.units[0];
        assert_eq!(greeting.context(), Some("greeting"));
        assert_eq!(greeting.state(), State::Approved);
        assert_eq!(greeting.notes().developer.as_deref(), Some("Shown on startup"));
        assert_eq!(catalog.identity_of(greeting), "greeting");

        assert_eq!(catalog.units[1].state(), State::NeedsEditing);
        assert_eq!(catalog.units[1].context(), Some("u2"));
        assert_eq!(catalog.units[2].state(), State::Empty);
        assert!(catalog.units[2].target().is_blank());
        assert_eq!(catalog.units[3].state(), State::ReadOnly);
        assert!(catalog.units[3].is_read_only());
    }

    #[test]
    fn test_round_trip_preserves_states() {
        let parsed = parse(SAMPLE);
        let bytes = Driver.serialize(&parsed.catalog, &DriverOptions::new()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains(r#"approved="yes""#));
        assert!(text.contains(r#"state="final""#));
        assert!(text.contains(r#"state="needs-translation""#));
        assert!(text.contains(r#"translate="no""#));
        assert!(text.contains(r#"resname="greeting""#));
        assert!(text.contains("<target/>"));

        let reparsed = Driver.parse(&bytes, &DriverOptions::new()).unwrap();
        for (a, b) in parsed.catalog.units.iter().zip(&reparsed.catalog.units) {
            assert_eq!(a.state(), b.state(), "state survives for {}", a.label());
            assert_eq!(a.target(), b.target());
            assert_eq!(a.context(), b.context());
        }
    }

    #[test]
    fn test_inline_markup_flattened() {
        let parsed = parse(indoc! {r#"
            <xliff version="1.2">
              <file source-language="en" target-language="de" datatype="plaintext" original="x">
                <body>
                  <trans-unit id="k">
                    <source>Press <g id="1">OK</g> now</source>
                    <target>Druecke <g id="1">OK</g> jetzt</target>
                  </trans-unit>
                </body>
              </file>
            </xliff>
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.source().first(), "Press OK now");
        assert_eq!(unit.target().first(), "Druecke OK jetzt");
    }

    #[test]
    fn test_locations_from_context_groups() {
        let parsed = parse(indoc! {r#"
            <xliff version="1.2">
              <file source-language="en" target-language="de" datatype="plaintext" original="x">
                <body>
                  <trans-unit id="k">
                    <source>Hi</source>
                    <target>Hallo</target>
                    <context-group purpose="location">
                      <context context-type="sourcefile">src/ui.rs</context>
                      <context context-type="linenumber">42</context>
                    </context-group>
                  </trans-unit>
                </body>
              </file>
            </xliff>
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.locations().len(), 1);
        assert_eq!(unit.locations()[0].file, "src/ui.rs");
        assert_eq!(unit.locations()[0].line, Some(42));

        let bytes = Driver.serialize(&parsed.catalog, &DriverOptions::new()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("context-type=\"sourcefile\""));
        assert!(text.contains(">42<"));
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let result = Driver.parse(
            br#"<xliff><file target-language="de"><body><trans-unit><source>x</source></trans-unit></body></file></xliff>"#,
            &DriverOptions::new(),
        );
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_plural_unit_rejected() {
        let mut catalog = Catalog::new(CatalogMeta::new("cs", IdentityRule::NativeKey));
        catalog.push_unit(
            Unit::new(Some("files".into()), Message::singular("%d files"))
                .with_target(Message::plural(vec!["a".into(), "b".into(), "c".into()])),
        );
        let result = Driver.serialize(&catalog, &DriverOptions::new());
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_explicit_language_option_wins() {
        let parsed = Driver
            .parse(SAMPLE.as_bytes(), &DriverOptions::new().with_language("sk"))
            .unwrap();
        assert_eq!(parsed.catalog.meta.language, "sk");
    }
}
