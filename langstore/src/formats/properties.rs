//! Support for Java `.properties` files.
//!
//! `key=value` lines with `#`/`!` comments, backslash line continuations,
//! and `\uXXXX` escapes. Files without a BOM or explicit hint are read as
//! ISO-8859-1, the format's historical default; non-ASCII output is
//! `\u`-escaped unless the catalog encoding is UTF-8.

use super::strings::monolingual_text;
use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

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
            extra_states: &[],
        }
    }

    fn parse(&self, bytes: &[u8], options: &DriverOptions) -> Result<Parsed, Error> {
        let hint = options.encoding.as_deref().unwrap_or("ISO-8859-1");
        let decoded = encoding::decode(bytes, Some(hint))?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::NativeKey);
        meta.format = Some("properties".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let mut catalog = Catalog::new(meta);
        let mut pending_comment: Vec<String> = Vec::new();

        let mut lines = decoded.text.lines().enumerate().peekable();
        while let Some((index, raw_line)) = lines.next() {
            let line_no = index + 1;
            let line = raw_line.trim_start();
            if line.is_empty() {
                pending_comment.clear();
                continue;
            }
            if let Some(rest) = line.strip_prefix(['#', '!']) {
                pending_comment.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
                continue;
            }

            // Logical line: join physical lines ending in an odd number of
            // backslashes, stripping the continuation and leading blanks.
            let mut logical = line.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            let key = unescape(key, line_no)?;
            let value = unescape(value, line_no)?;
            if key.is_empty() {
                return Err(Error::malformed(line_no, "property line without a key"));
            }

            let text = Message::singular(value);
            let mut unit = if options.template {
                Unit::new(Some(key), text)
            } else {
                let state = if text.is_blank() {
                    State::Empty
                } else {
                    State::Translated
                };
                Unit::new(Some(key), Message::singular(String::new()))
                    .with_target(text)
                    .with_state(state)
            };
            if !pending_comment.is_empty() {
                unit = unit.with_developer_note(pending_comment.join("\n"));
                pending_comment.clear();
            }
            catalog.push_unit(unit);
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let ascii_only = !catalog.meta.encoding.to_ascii_uppercase().starts_with("UTF-8");
        let mut out = String::new();
        for unit in catalog.active_units() {
            if let Some(note) = &unit.notes().developer {
                for line in note.lines() {
                    out.push_str(&format!("# {}\n", line));
                }
            }
            let key = unit.context().unwrap_or_default();
            let text = monolingual_text(unit, options)?;
            out.push_str(&format!(
                "{}={}\n",
                escape_key(key, ascii_only),
                escape_value(text, ascii_only)
            ));
        }
        encoding::encode_output(&out, &catalog.meta)
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits at the first unescaped `=`, `:`, or whitespace run.
fn split_key_value(logical: &str) -> (&str, &str) {
    let bytes = logical.as_bytes();
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'=' | b':' => {
                return (logical[..i].trim_end(), logical[i + 1..].trim_start());
            }
            b' ' | b'\t' => {
                let rest = logical[i..].trim_start();
                // A separator may still follow the whitespace run.
                let rest = rest
                    .strip_prefix(['=', ':'])
                    .map(str::trim_start)
                    .unwrap_or(rest);
                return (&logical[..i], rest);
            }
            _ => {}
        }
    }
    (logical, "")
}

fn unescape(text: &str, line_no: usize) -> Result<String, Error> {
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
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(Error::malformed(line_no, "truncated \\u escape"));
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| Error::malformed(line_no, "bad \\u escape"))?;
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn escape_key(key: &str, ascii_only: bool) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            ' ' => out.push_str("\\ "),
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            '#' => out.push_str("\\#"),
            '!' => out.push_str("\\!"),
            _ => push_char(&mut out, c, ascii_only),
        }
    }
    out
}

fn escape_value(value: &str, ascii_only: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ' ' if i == 0 => out.push_str("\\ "),
            _ => push_char(&mut out, c, ascii_only),
        }
    }
    out
}

fn push_char(out: &mut String, c: char, ascii_only: bool) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c if ascii_only && !c.is_ascii() => {
            let mut buf = [0u16; 2];
            for code_unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04X}", code_unit));
            }
        }
        c => out.push(c),
    }
}
