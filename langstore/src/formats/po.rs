//! Support for gettext `.po` catalogs.
//!
//! Line-oriented parser covering the full comment taxonomy (`#`, `#.`,
//! `#:`, `#,`, `#|`, `#~`), multi-line string continuations, C escapes,
//! the header entry, and plural entries. The serializer mirrors all of it
//! back, keeping the `fuzzy` flag in sync with the unit state.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    encoding,
    error::Error,
    flags::{Flag, Flags},
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
    },
    types::{Catalog, CatalogMeta, Location, Message, State, Unit},
};

/// Key under which a `#|` previous-msgid block is retained verbatim.
const PREVIOUS_KEY: &str = "po.previous";

/// Conventional header field order; anything else follows alphabetically.
const HEADER_ORDER: &[&str] = &[
    "Project-Id-Version",
    "Report-Msgid-Bugs-To",
    "POT-Creation-Date",
    "PO-Revision-Date",
    "Last-Translator",
    "Language-Team",
    "Language",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Plural-Forms",
];

lazy_static! {
    static ref CHARSET_RE: Regex = Regex::new(r"charset=([A-Za-z0-9_.:-]+)").unwrap();
    static ref MSGSTR_INDEX_RE: Regex = Regex::new(r"^msgstr\[(\d+)\]").unwrap();
}

pub struct Driver;

impl FormatDriver for Driver {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linguality: Linguality::Bilingual,
            identity: IdentityRule::ContextSource,
            supports_plurals: true,
            supports_context: true,
            supports_flags: true,
            supports_locations: true,
            supports_obsolete: true,
            extra_states: &[State::NeedsEditing],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let decoded = decode_with_charset_sniff(bytes, options)?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::ContextSource);
        meta.format = Some("po".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let mut units = Vec::new();
        let mut builder = EntryBuilder::new();
        let mut saw_header = false;

        for (index, raw_line) in decoded.text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim_end();
            let trimmed = line.trim_start();

            if trimmed.is_empty() {
                flush_entry(&mut builder, &mut meta, &mut units, &mut saw_header)?;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#~") {
                builder.obsolete = true;
                feed_keyword_line(&mut builder, rest.trim_start(), line_no)?;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#,") {
                for flag in Flags::from(rest.to_string()).iter() {
                    builder.flags.set(flag.clone());
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#.") {
                push_comment_line(&mut builder.developer, rest);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#:") {
                for token in rest.split_whitespace() {
                    builder.locations.push(Location::from_token(token));
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#|") {
                push_comment_line(&mut builder.previous, rest);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('#') {
                push_comment_line(&mut builder.translator, rest);
                continue;
            }

            feed_keyword_line(&mut builder, trimmed, line_no)?;
        }
        flush_entry(&mut builder, &mut meta, &mut units, &mut saw_header)?;

        let mut catalog = Catalog::new(meta);
        for unit in units {
            catalog.push_unit(unit);
        }
        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut out = String::new();

        if let Some(comment) = &catalog.meta.header_comment {
            for line in comment.lines() {
                push_prefixed(&mut out, "#", line);
            }
        }
        out.push_str("msgid \"\"\n");
        out.push_str("msgstr \"\"\n");
        for (key, value) in ordered_header(catalog) {
            out.push_str(&format!("\"{}: {}\\n\"\n", escape_po(&key), escape_po(&value)));
        }

        for unit in &catalog.units {
            if unit.is_obsolete() && !options.keep_obsolete {
                continue;
            }
            out.push('\n');
            write_unit(&mut out, unit);
        }

        encoding::encode_output(&out, &catalog.meta)
    }
}

/// Decodes PO bytes. When the bytes are not valid UTF-8 and no hint was
/// given, the header's `charset=` declaration (ASCII-compatible in every
/// charset gettext emits) decides the label for a second attempt.
fn decode_with_charset_sniff(
    bytes: &[u8],
    options: &DriverOptions,
) -> Result<encoding::Decoded, Error> {
    match encoding::decode(bytes, options.encoding.as_deref()) {
        Ok(decoded) => Ok(decoded),
        Err(first_error) => {
            if options.encoding.is_some() {
                return Err(first_error);
            }
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(2048)]).into_owned();
            match CHARSET_RE.captures(&head) {
                Some(captures) => encoding::decode(bytes, Some(&captures[1])),
                None => Err(first_error),
            }
        }
    }
}

/// Accumulates one entry's comment block and keyword segments.
struct EntryBuilder {
    translator: Option<String>,
    developer: Option<String>,
    locations: Vec<Location>,
    flags: Flags,
    previous: Option<String>,
    obsolete: bool,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: BTreeMap<usize, String>,
    /// Which buffer continuation lines append to.
    active: Segment,
}

#[derive(Clone, Copy, PartialEq)]
enum Segment {
    None,
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr(usize),
}

impl EntryBuilder {
    fn new() -> Self {
        EntryBuilder {
            translator: None,
            developer: None,
            locations: Vec::new(),
            flags: Flags::new(),
            previous: None,
            obsolete: false,
            msgctxt: None,
            msgid: None,
            msgid_plural: None,
            msgstr: BTreeMap::new(),
            active: Segment::None,
        }
    }

    fn is_blank(&self) -> bool {
        self.msgid.is_none()
            && self.msgctxt.is_none()
            && self.translator.is_none()
            && self.developer.is_none()
            && self.previous.is_none()
            && self.locations.is_empty()
            && self.flags.is_empty()
    }

    fn append(&mut self, text: &str, line_no: usize) -> Result<(), Error> {
        let buffer = match self.active {
            Segment::None => {
                return Err(Error::malformed(line_no, "string continuation outside an entry"));
            }
            Segment::Msgctxt => self.msgctxt.get_or_insert_with(String::new),
            Segment::Msgid => self.msgid.get_or_insert_with(String::new),
            Segment::MsgidPlural => self.msgid_plural.get_or_insert_with(String::new),
            Segment::Msgstr(index) => self.msgstr.entry(index).or_default(),
        };
        buffer.push_str(text);
        Ok(())
    }
}

fn push_comment_line(buffer: &mut Option<String>, rest: &str) {
    let text = rest.strip_prefix(' ').unwrap_or(rest);
    match buffer {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text);
        }
        None => *buffer = Some(text.to_string()),
    }
}

fn push_prefixed(out: &mut String, prefix: &str, line: &str) {
    if line.is_empty() {
        out.push_str(prefix);
    } else {
        out.push_str(prefix);
        out.push(' ');
        out.push_str(line);
    }
    out.push('\n');
}

/// Consumes one `msgid`/`msgstr`/continuation line.
fn feed_keyword_line(builder: &mut EntryBuilder, line: &str, line_no: usize) -> Result<(), Error> {
    if line.starts_with('"') {
        let text = parse_quoted(line, line_no)?;
        return builder.append(&text, line_no);
    }

    if let Some(captures) = MSGSTR_INDEX_RE.captures(line) {
        let index: usize = captures[1]
            .parse()
            .map_err(|_| Error::malformed(line_no, "bad msgstr index"))?;
        builder.active = Segment::Msgstr(index);
        let rest = &line[captures[0].len()..];
        let text = parse_quoted(rest.trim_start(), line_no)?;
        return builder.append(&text, line_no);
    }

    let (keyword, segment) = if let Some(rest) = line.strip_prefix("msgid_plural") {
        (rest, Segment::MsgidPlural)
    } else if let Some(rest) = line.strip_prefix("msgctxt") {
        (rest, Segment::Msgctxt)
    } else if let Some(rest) = line.strip_prefix("msgid") {
        (rest, Segment::Msgid)
    } else if let Some(rest) = line.strip_prefix("msgstr") {
        (rest, Segment::Msgstr(0))
    } else {
        return Err(Error::malformed(
            line_no,
            format!("unrecognized line: {}", line.chars().take(40).collect::<String>()),
        ));
    };

    // A keyword restarts its buffer even if it appeared before.
    builder.active = segment;
    match segment {
        Segment::Msgctxt => builder.msgctxt = Some(String::new()),
        Segment::Msgid => builder.msgid = Some(String::new()),
        Segment::MsgidPlural => builder.msgid_plural = Some(String::new()),
        Segment::Msgstr(index) => {
            builder.msgstr.insert(index, String::new());
        }
        Segment::None => {}
    }
    let text = parse_quoted(keyword.trim_start(), line_no)?;
    builder.append(&text, line_no)
}

/// Extracts and unescapes the content of one `"..."` literal.
fn parse_quoted(text: &str, line_no: usize) -> Result<String, Error> {
    let inner = text
        .strip_prefix('"')
        .ok_or_else(|| Error::malformed(line_no, "expected a quoted string"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    loop {
        match chars.next() {
            None => return Err(Error::malformed(line_no, "unterminated string")),
            Some('"') => break,
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('a') => out.push('\u{7}'),
                Some('v') => out.push('\u{b}'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    let byte = u8::from_str_radix(&hex, 16)
                        .map_err(|_| Error::malformed(line_no, "bad \\x escape"))?;
                    out.push(byte as char);
                }
                Some(other) => {
                    // Lenient: preserve unknown escapes literally.
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(Error::malformed(line_no, "dangling backslash")),
            },
            Some(other) => out.push(other),
        }
    }
    let trailing = chars.as_str().trim();
    if !trailing.is_empty() {
        return Err(Error::malformed(line_no, "text after closing quote"));
    }
    Ok(out)
}

fn escape_po(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Completes the pending entry, routing the header entry into the metadata
/// and everything else into the unit list.
fn flush_entry(
    builder: &mut EntryBuilder,
    meta: &mut CatalogMeta,
    units: &mut Vec<Unit>,
    saw_header: &mut bool,
) -> Result<(), Error> {
    let entry = std::mem::replace(builder, EntryBuilder::new());
    if entry.is_blank() {
        return Ok(());
    }
    let msgid = match &entry.msgid {
        Some(msgid) => msgid.clone(),
        None => return Err(Error::malformed(None, "entry without msgid")),
    };

    if msgid.is_empty() && entry.msgctxt.is_none() && !*saw_header && !entry.obsolete {
        *saw_header = true;
        absorb_header(&entry, meta);
        return Ok(());
    }

    let source = match &entry.msgid_plural {
        Some(plural) => Message::plural(vec![msgid, plural.clone()]),
        None => Message::singular(msgid),
    };
    let target = if entry.msgid_plural.is_some() {
        let highest = entry.msgstr.keys().next_back().copied().unwrap_or(0);
        let mut forms = vec![String::new(); highest + 1];
        for (index, text) in &entry.msgstr {
            forms[*index] = text.clone();
        }
        Message::plural(forms)
    } else {
        Message::singular(entry.msgstr.get(&0).cloned().unwrap_or_default())
    };

    let state = if entry.flags.has("fuzzy") {
        State::NeedsEditing
    } else if target.is_blank() {
        State::Empty
    } else {
        State::Translated
    };

    let mut unit = Unit::new(entry.msgctxt.clone(), source)
        .with_target(target)
        .with_state(state)
        .with_file_flags(entry.flags.clone())
        .with_locations(entry.locations.clone())
        .with_obsolete(entry.obsolete);
    if let Some(note) = &entry.developer {
        unit = unit.with_developer_note(note.clone());
    }
    if let Some(note) = &entry.translator {
        unit = unit.with_translator_note(note.clone());
    }
    if let Some(previous) = &entry.previous {
        unit = unit.with_extra(PREVIOUS_KEY, previous.clone());
    }
    units.push(unit);
    Ok(())
}

fn absorb_header(entry: &EntryBuilder, meta: &mut CatalogMeta) {
    meta.header_comment = entry.translator.clone();
    if let Some(body) = entry.msgstr.get(&0) {
        for line in body.lines() {
            if let Some((key, value)) = line.split_once(':') {
                meta.header.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }
    if let Some(language) = meta.header.get("Language") {
        if !language.is_empty() && meta.language.is_empty() {
            meta.language = language.clone();
        }
    }
}

/// Header fields in conventional order, with `Language`, `Content-Type`,
/// and `Plural-Forms` synthesized when absent.
fn ordered_header(catalog: &Catalog) -> Vec<(String, String)> {
    let mut header = catalog.meta.header.clone();
    header
        .entry("Language".to_string())
        .or_insert_with(|| catalog.meta.language.clone());
    header
        .entry("MIME-Version".to_string())
        .or_insert_with(|| "1.0".to_string());
    header
        .entry("Content-Type".to_string())
        .or_insert_with(|| "text/plain; charset=UTF-8".to_string());
    header
        .entry("Content-Transfer-Encoding".to_string())
        .or_insert_with(|| "8bit".to_string());

    let mut ordered = Vec::with_capacity(header.len());
    for key in HEADER_ORDER {
        if let Some(value) = header.remove(*key) {
            ordered.push((key.to_string(), value));
        }
    }
    ordered.extend(header);
    ordered
}

fn write_unit(out: &mut String, unit: &Unit) {
    if let Some(note) = &unit.notes().translator {
        for line in note.lines() {
            push_prefixed(out, "#", line);
        }
    }
    if let Some(note) = &unit.notes().developer {
        for line in note.lines() {
            push_prefixed(out, "#.", line);
        }
    }
    if !unit.locations().is_empty() {
        let tokens: Vec<String> = unit.locations().iter().map(|l| l.to_string()).collect();
        push_prefixed(out, "#:", &tokens.join(" "));
    }

    // The fuzzy flag always mirrors the state, whichever way it changed.
    let mut flags = unit.file_flags().clone();
    if unit.state() == State::NeedsEditing {
        flags.set(Flag::new("fuzzy"));
    } else {
        flags.remove("fuzzy");
    }
    if !flags.is_empty() {
        let tokens: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        push_prefixed(out, "#,", &tokens.join(", "));
    }
    if let Some(previous) = unit.extra().get(PREVIOUS_KEY) {
        for line in previous.lines() {
            push_prefixed(out, "#|", line);
        }
    }

    let prefix = if unit.is_obsolete() { "#~ " } else { "" };
    if let Some(context) = unit.context() {
        write_keyword(out, prefix, "msgctxt", context);
    }
    match unit.source() {
        Message::Singular(text) => write_keyword(out, prefix, "msgid", text),
        Message::Plural(forms) => {
            write_keyword(out, prefix, "msgid", forms.first().map(String::as_str).unwrap_or(""));
            write_keyword(
                out,
                prefix,
                "msgid_plural",
                forms.get(1).map(String::as_str).unwrap_or(""),
            );
        }
    }
    match unit.target() {
        Message::Singular(text) => write_keyword(out, prefix, "msgstr", text),
        Message::Plural(forms) => {
            for (index, form) in forms.iter().enumerate() {
                write_keyword(out, prefix, &format!("msgstr[{}]", index), form);
            }
        }
    }
}

/// Writes one keyword with its value, splitting internal newlines into
/// gettext-style continuation lines.
fn write_keyword(out: &mut String, prefix: &str, keyword: &str, value: &str) {
    if value.contains('\n') {
        out.push_str(&format!("{}{} \"\"\n", prefix, keyword));
        for segment in value.split_inclusive('\n') {
            out.push_str(&format!("{}\"{}\"\n", prefix, escape_po(segment)));
        }
    } else {
        out.push_str(&format!("{}{} \"{}\"\n", prefix, keyword, escape_po(value)));
    }
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
    fn test_parse_basic_entry() {
        let parsed = parse(indoc! {r#"
            msgid ""
            msgstr ""
            "Language: cs\n"
            "Content-Type: text/plain; charset=UTF-8\n"

            #. Greeting on the landing page
            #: src/main.rs:10 src/lib.rs:4
            msgid "Hello"
            msgstr "Ahoj"
        "#});
        assert_eq!(parsed.catalog.units.len(), 1);
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.source().first(), "Hello");
        assert_eq!(unit.target().first(), "Ahoj");
        assert_eq!(unit.state(), State::Translated);
        assert_eq!(
            unit.notes().developer.as_deref(),
            Some("Greeting on the landing page")
        );
        assert_eq!(unit.locations().len(), 2);
        assert_eq!(unit.locations()[0].file, "src/main.rs");
        assert_eq!(unit.locations()[0].line, Some(10));
        assert_eq!(parsed.catalog.meta.header.get("Language").map(String::as_str), Some("cs"));
    }

    #[test]
    fn test_fuzzy_maps_to_needs_editing() {
        let parsed = parse(indoc! {r#"
            #, fuzzy
            msgid "Monday"
            msgstr ""
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.state(), State::NeedsEditing);
        assert!(unit.target().is_blank());
        assert!(unit.file_flags().has("fuzzy"));
    }

    #[test]
    fn test_plural_entry_pinned_to_language_arity() {
        // Czech wants three forms; the file only has two.
        let parsed = parse(indoc! {r#"
            msgid "One file"
            msgid_plural "%d files"
            msgstr[0] "Jeden soubor"
            msgstr[1] "%d soubory"
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.source().arity(), 2);
        assert_eq!(unit.target().arity(), 3);
        assert_eq!(unit.target().forms()[2], "");
        assert!(parsed
            .report
            .warnings
            .iter()
            .any(|w| matches!(w, crate::traits::Warning::PluralArityMismatch { .. })));
    }

    #[test]
    fn test_msgctxt_and_multiline_strings() {
        let parsed = parse(indoc! {r#"
            msgctxt "menu"
            msgid ""
            "First line\n"
            "Second line"
            msgstr ""
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.context(), Some("menu"));
        assert_eq!(unit.source().first(), "First line\nSecond line");
        assert_eq!(unit.state(), State::Empty);
    }

    #[test]
    fn test_obsolete_entries_round_trip() {
        let content = indoc! {r#"
            msgid "Kept"
            msgstr "Drzeno"

            #~ msgid "Old"
            #~ msgstr "Stare"
        "#};
        let parsed = parse(content);
        assert_eq!(parsed.catalog.units.len(), 2);
        assert!(parsed.catalog.units[1].is_obsolete());
        assert_eq!(parsed.catalog.units[1].target().first(), "Stare");

        let options = DriverOptions::new().with_language("cs");
        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("#~ msgid \"Old\""));
        assert!(text.contains("#~ msgstr \"Stare\""));

        let dropped = Driver
            .serialize(&parsed.catalog, &options.clone().with_keep_obsolete(false))
            .unwrap();
        assert!(!String::from_utf8(dropped).unwrap().contains("Old"));
    }

    #[test]
    fn test_escapes_round_trip() {
        let parsed = parse(indoc! {r#"
            msgid "Tab\there \"quoted\" and\\slashed"
            msgstr ""
        "#});
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.source().first(), "Tab\there \"quoted\" and\\slashed");
        assert_eq!(
            escape_po(unit.source().first()),
            r#"Tab\there \"quoted\" and\\slashed"#
        );
    }

    #[test]
    fn test_serializer_syncs_fuzzy_with_state() {
        let parsed = parse(indoc! {r#"
            msgid "Hello"
            msgstr "Ahoj"
        "#});
        let mut catalog = parsed.catalog;
        catalog.units[0].set_state(State::NeedsEditing).unwrap();
        let bytes = Driver.serialize(&catalog, &DriverOptions::new()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("#, fuzzy"));
    }

    #[test]
    fn test_fuzzy_cleared_when_state_left_needs_editing() {
        let parsed = parse(indoc! {r#"
            #, fuzzy
            msgid "Hello"
            msgstr "Ahoj"
        "#});
        let mut catalog = parsed.catalog;
        catalog.units[0].set_state(State::Translated).unwrap();
        let bytes = Driver.serialize(&catalog, &DriverOptions::new()).unwrap();
        assert!(!String::from_utf8(bytes).unwrap().contains("fuzzy"));
    }

    #[test]
    fn test_header_comment_and_order_preserved() {
        let parsed = parse(indoc! {r#"
            # Czech translations.
            # Copyright (C) 2024
            msgid ""
            msgstr ""
            "Project-Id-Version: demo 1.0\n"
            "Language: cs\n"
            "Plural-Forms: nplurals=3; plural=(n==1) ? 0 : (n>=2 && n<=4) ? 1 : 2;\n"

            msgid "Hello"
            msgstr ""
        "#});
        assert_eq!(
            parsed.catalog.meta.header_comment.as_deref(),
            Some("Czech translations.\nCopyright (C) 2024")
        );
        let bytes = Driver.serialize(&parsed.catalog, &DriverOptions::new()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let project = text.find("Project-Id-Version").unwrap();
        let language = text.find("\"Language:").unwrap();
        let plural = text.find("Plural-Forms").unwrap();
        assert!(project < language && language < plural);
        assert!(text.starts_with("# Czech translations.\n"));
    }

    #[test]
    fn test_multiline_value_serialization() {
        let mut catalog = Catalog::new(CatalogMeta::new("de", IdentityRule::ContextSource));
        catalog.push_unit(
            Unit::new(None, Message::singular("a\nb"))
                .with_target(Message::singular("x\ny"))
                .with_state(State::Translated),
        );
        let bytes = Driver.serialize(&catalog, &DriverOptions::new()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("msgid \"\"\n\"a\\n\"\n\"b\"\n"));
        let reparsed = Driver.parse(&text.into_bytes(), &DriverOptions::new()).unwrap();
        assert_eq!(reparsed.catalog.units[0].source().first(), "a\nb");
        assert_eq!(reparsed.catalog.units[0].target().first(), "x\ny");
    }

    #[test]
    fn test_latin2_charset_sniffed_from_header() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"msgid \"\"\nmsgstr \"\"\n");
        bytes.extend_from_slice(b"\"Content-Type: text/plain; charset=ISO-8859-2\\n\"\n\n");
        bytes.extend_from_slice(b"msgid \"Hello\"\nmsgstr \"P\xF8elo\xBEeno\"\n");
        let parsed = Driver.parse(&bytes, &DriverOptions::new().with_language("cs")).unwrap();
        assert_eq!(parsed.catalog.units[0].target().first(), "Přeloženo");
        assert_eq!(parsed.catalog.meta.encoding, "ISO-8859-2");
    }

    #[test]
    fn test_duplicate_identity_warns() {
        let parsed = parse(indoc! {r#"
            msgid "Hello"
            msgstr "A"

            msgid "Hello"
            msgstr "B"
        "#});
        assert!(parsed
            .report
            .warnings
            .iter()
            .any(|w| matches!(w, crate::traits::Warning::DuplicateIdentity { .. })));
    }

    #[test]
    fn test_unterminated_string_is_malformed() {
        let result = Driver.parse(b"msgid \"broken\nmsgstr \"\"\n", &DriverOptions::new());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_previous_msgid_preserved() {
        let content = indoc! {r#"
            #| msgid "Helo"
            msgid "Hello"
            msgstr "Ahoj"
        "#};
        let parsed = parse(content);
        let unit = &parsed.catalog.units[0];
        assert_eq!(unit.extra().get(PREVIOUS_KEY).map(String::as_str), Some("msgid \"Helo\""));
        let bytes = Driver.serialize(&parsed.catalog, &DriverOptions::new()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("#| msgid \"Helo\""));
    }
}
