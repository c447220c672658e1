//! Support for Apple `.strings` localization files.
//!
//! `"key" = "value";` pairs with `/* block */` and `// line` comments.
//! `//: Key: Value` lines carry file-level metadata. Files are frequently
//! UTF-16 with a BOM; the detected encoding is restored on write.

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
        let decoded = encoding::decode(bytes, options.encoding.as_deref())?;
        let mut report = ParseReport::new();

        let mut meta = CatalogMeta::new(options.language_code(), IdentityRule::NativeKey);
        meta.format = Some("strings".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;

        let mut catalog = Catalog::new(meta);
        let mut scanner = Scanner::new(&decoded.text);
        let mut pending_comment: Option<String> = None;

        loop {
            scanner.skip_whitespace();
            if scanner.is_at_end() {
                break;
            }
            if scanner.peek() == Some('/') {
                match scanner.read_comment()? {
                    Comment::Header(key, value) => {
                        catalog.meta.header.insert(key, value);
                    }
                    Comment::Plain(text) => pending_comment = Some(text),
                }
                continue;
            }

            let key = scanner.read_string()?;
            scanner.skip_whitespace();
            scanner.expect('=')?;
            scanner.skip_whitespace();
            let value = scanner.read_string()?;
            scanner.skip_whitespace();
            scanner.expect(';')?;

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
            if let Some(comment) = pending_comment.take() {
                unit = unit.with_developer_note(comment);
            }
            catalog.push_unit(unit);
        }

        if let Some(language) = catalog.meta.header.get("Language") {
            if catalog.meta.language.is_empty() {
                catalog.meta.language = language.clone();
            }
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut out = String::new();
        for (key, value) in &catalog.meta.header {
            out.push_str(&format!("//: {}: {}\n", key, value));
        }
        if !catalog.meta.header.is_empty() {
            out.push('\n');
        }

        let mut first = true;
        for unit in catalog.active_units() {
            if !first {
                out.push('\n');
            }
            first = false;
            if let Some(note) = &unit.notes().developer {
                out.push_str(&format!("/* {} */\n", note.replace("*/", "*\\/")));
            }
            let key = unit.context().unwrap_or_default();
            let text = monolingual_text(unit, options)?;
            out.push_str(&format!("\"{}\" = \"{}\";\n", escape(key), escape(text)));
        }
        encoding::encode_output(&out, &catalog.meta)
    }
}

/// The text a monolingual serializer emits for a unit: the source in
/// template mode, the target otherwise.
pub(crate) fn monolingual_text<'a>(
    unit: &'a Unit,
    options: &DriverOptions,
) -> Result<&'a str, Error> {
    let message = if options.template {
        unit.source()
    } else {
        unit.target()
    };
    match message {
        Message::Singular(text) => Ok(text),
        Message::Plural(_) => Err(Error::unsupported(format!(
            "plural unit `{}` cannot be written to a singular-only format",
            unit.label()
        ))),
    }
}

enum Comment {
    /// A `//: Key: Value` metadata line.
    Header(String, String),
    Plain(String),
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn is_at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(Error::malformed(
                self.line,
                format!("expected `{}`, found `{}`", expected, c),
            )),
            None => Err(Error::malformed(
                self.line,
                format!("expected `{}`, found end of file", expected),
            )),
        }
    }

    fn read_comment(&mut self) -> Result<Comment, Error> {
        self.advance(); // leading '/'
        match self.advance() {
            Some('/') => {
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.advance();
                }
                // langcodec-style metadata line: "//: Language: cs"
                if let Some(rest) = text.strip_prefix(':') {
                    if let Some((key, value)) = rest.split_once(':') {
                        return Ok(Comment::Header(
                            key.trim().to_string(),
                            value.trim().to_string(),
                        ));
                    }
                }
                Ok(Comment::Plain(text.trim().to_string()))
            }
            Some('*') => {
                let mut text = String::new();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            return Ok(Comment::Plain(text.trim().to_string()));
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Err(Error::malformed(self.line, "unterminated comment"));
                        }
                    }
                }
            }
            _ => Err(Error::malformed(self.line, "stray `/`")),
        }
    }

    /// Reads a quoted string or a bare (unquoted) key token.
    fn read_string(&mut self) -> Result<String, Error> {
        if self.peek() != Some('"') {
            let mut token = String::new();
            while let Some(c) = self.peek() {
                if c.is_whitespace() || c == '=' || c == ';' {
                    break;
                }
                token.push(c);
                self.advance();
            }
            if token.is_empty() {
                return Err(Error::malformed(self.line, "expected a string"));
            }
            return Ok(token);
        }

        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(out),
                Some('\\') => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('U') | Some('u') => {
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.peek() {
                                Some(c) if c.is_ascii_hexdigit() => {
                                    hex.push(c);
                                    self.advance();
                                }
                                _ => break,
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| Error::malformed(self.line, "bad \\U escape"))?;
                        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    }
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => return Err(Error::malformed(self.line, "dangling backslash")),
                },
                Some(c) => out.push(c),
                None => return Err(Error::malformed(self.line, "unterminated string")),
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
