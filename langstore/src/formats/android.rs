//! Support for Android `strings.xml` resources.
//!
//! `<string>` and `<plurals>` elements under `<resources>`, with
//! `translatable="false"` mapped to the read-only flag and `<!-- -->`
//! comments attached to the following element. Plural items are keyed by
//! `quantity` and ordered by the catalog language's plural rules.

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
    plural::{self, PluralCategory},
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
        Warning,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Monolingual,
            identity: IdentityRule::NativeKey,
            supports_plurals: true,
            supports_context: true,
            supports_flags: true,
            supports_locations: false,
            supports_obsolete: false,
            extra_states: &[State::ReadOnly],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let decoded = encoding::decode(bytes, options.encoding.as_deref())?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::NativeKey);
        meta.format = Some("android".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let rules = plural::rules_for_str(&meta.language);
        let mut catalog = Catalog::new(meta);

        let mut reader = Reader::from_reader(decoded.text.as_bytes());
        let mut buf = Vec::new();
        let mut pending_comment: Option<String> = None;
        let mut inside_resources = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"resources" => {
                    inside_resources = true;
                }
                Ok(Event::Comment(ref e)) => {
                    let text = e.unescape()?.trim().to_string();
                    if inside_resources {
                        pending_comment = Some(text);
                    } else if catalog.meta.header_comment.is_none() {
                        catalog.meta.header_comment = Some(text);
                    }
                }
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"string" => {
                    let unit = parse_string(e, &mut reader, options, pending_comment.take())?;
                    catalog.push_unit(unit);
                }
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"string" => {
                    let unit = empty_string_unit(e, options, pending_comment.take())?;
                    catalog.push_unit(unit);
                }
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"plurals" => {
                    let unit = parse_plurals(
                        e,
                        &mut reader,
                        options,
                        rules,
                        pending_comment.take(),
                        &mut report,
                    )?;
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

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let rules = plural::rules_for_str(&catalog.meta.language);
        let mut out = Cursor::new(Vec::new());
        let mut writer = Writer::new_with_indent(&mut out, b' ', 4);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        if let Some(comment) = &catalog.meta.header_comment {
            writer.write_event(Event::Comment(BytesText::new(&format!(" {} ", comment))))?;
        }
        writer.write_event(Event::Start(BytesStart::new("resources")))?;

        for unit in catalog.active_units() {
            if let Some(note) = &unit.notes().developer {
                writer.write_event(Event::Comment(BytesText::new(&format!(" {} ", note))))?;
            }
            let name = unit.context().unwrap_or_default();
            let message = if options.template {
                unit.source()
            } else {
                unit.target()
            };
            match message {
                Message::Singular(text) => {
                    let mut start = BytesStart::new("string");
                    start.push_attribute(("name", name));
                    if unit.is_read_only() {
                        start.push_attribute(("translatable", "false"));
                    }
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(&escape_android(text))))?;
                    writer.write_event(Event::End(BytesEnd::new("string")))?;
                }
                Message::Plural(forms) => {
                    let mut start = BytesStart::new("plurals");
                    start.push_attribute(("name", name));
                    if unit.is_read_only() {
                        start.push_attribute(("translatable", "false"));
                    }
                    writer.write_event(Event::Start(start))?;
                    for (index, form) in forms.iter().enumerate() {
                        if form.is_empty() {
                            continue;
                        }
                        let quantity = rules
                            .category_at(index)
                            .unwrap_or(PluralCategory::Other)
                            .as_str();
                        let mut item = BytesStart::new("item");
                        item.push_attribute(("quantity", quantity));
                        writer.write_event(Event::Start(item))?;
                        writer.write_event(Event::Text(BytesText::new(&escape_android(form))))?;
                        writer.write_event(Event::End(BytesEnd::new("item")))?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("plurals")))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("resources")))?;
        let text = String::from_utf8(out.into_inner())
            .map_err(|e| Error::encoding("UTF-8", e.to_string()))?;
        encoding::encode_output(&text, &catalog.meta)
    }
}

fn name_and_translatable(e: &BytesStart) -> Result<(String, bool), Error> {
    let mut name = None;
    let mut translatable = true;
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::malformed(None, e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.to_string()),
            b"translatable" => translatable = attr.unescape_value()?.as_ref() != "false",
            _ => {}
        }
    }
    let name = name.ok_or_else(|| Error::malformed(None, "element missing 'name'"))?;
    Ok((name, translatable))
}

fn build_unit(
    name: String,
    message: Message,
    translatable: bool,
    options: &DriverOptions,
    comment: Option<String>,
) -> Unit {
    let mut unit = if options.template {
        Unit::new(Some(name), message)
    } else {
        let state = if !translatable {
            State::ReadOnly
        } else if message.is_blank() {
            State::Empty
        } else {
            State::Translated
        };
        Unit::new(Some(name), message.blank_like())
            .with_target(message)
            .with_state(state)
    };
    if !translatable {
        let mut flags = unit.file_flags().clone();
        flags.set(Flag::new("read-only"));
        unit = unit.with_file_flags(flags);
        if options.template {
            unit = unit.with_state(State::ReadOnly);
        }
    }
    if let Some(comment) = comment {
        unit = unit.with_developer_note(comment);
    }
    unit
}

fn parse_string(
    e: &BytesStart,
    reader: &mut Reader<&[u8]>,
    options: &DriverOptions,
    comment: Option<String>,
) -> Result<Unit, Error> {
    let (name, translatable) = name_and_translatable(e)?;
    let text = read_element_text(reader, b"string")?;
    Ok(build_unit(
        name,
        Message::singular(unescape_android(text.trim())),
        translatable,
        options,
        comment,
    ))
}

fn empty_string_unit(
    e: &BytesStart,
    options: &DriverOptions,
    comment: Option<String>,
) -> Result<Unit, Error> {
    let (name, translatable) = name_and_translatable(e)?;
    Ok(build_unit(
        name,
        Message::singular(String::new()),
        translatable,
        options,
        comment,
    ))
}

fn parse_plurals(
    e: &BytesStart,
    reader: &mut Reader<&[u8]>,
    options: &DriverOptions,
    rules: crate::plural::PluralRules,
    comment: Option<String>,
    report: &mut ParseReport,
) -> Result<Unit, Error> {
    let (name, translatable) = name_and_translatable(e)?;
    let mut forms = vec![String::new(); rules.arity()];

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref item)) if item.name().as_ref() == b"item" => {
                let mut quantity = None;
                for attr in item.attributes().with_checks(false) {
                    let attr = attr.map_err(|e| Error::malformed(None, e.to_string()))?;
                    if attr.key.as_ref() == b"quantity" {
                        quantity = Some(attr.unescape_value()?.to_string());
                    }
                }
                let quantity = quantity
                    .ok_or_else(|| Error::malformed(None, "plurals item missing 'quantity'"))?;
                let text = unescape_android(read_element_text(reader, b"item")?.trim());
                match quantity.parse::<PluralCategory>().ok().and_then(|c| rules.index_of(c)) {
                    Some(index) => forms[index] = text,
                    None => report.push(Warning::StructuralAmbiguity {
                        key: name.clone(),
                        detail: format!("plural quantity `{}` not used by this language", quantity),
                    }),
                }
            }
            Ok(Event::End(ref end)) if end.name().as_ref() == b"plurals" => break,
            Ok(Event::Eof) => return Err(Error::malformed(None, "unexpected EOF in plurals")),
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e)),
        }
        buf.clear();
    }

    Ok(build_unit(
        name,
        Message::plural(forms),
        translatable,
        options,
        comment,
    ))
}

/// Concatenates element text, flattening inline markup such as `<b>` or
/// `<xliff:g>`.
fn read_element_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, Error> {
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

fn unescape_android(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('@') => out.push('@'),
            Some('?') => out.push('?'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {}
        }
    }
    out
}

fn escape_android(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '@' | '?' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
