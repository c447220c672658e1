//! Support for SubRip `.srt` subtitle files.
//!
//! Cues are keyed by their index line. The timing line is carried
//! verbatim per unit and written back unchanged; this driver never
//! recomputes timestamps.

use crate::{
    encoding,
    error::Error,
    identity::IdentityRule,
    traits::{
        finalize_parse, Capabilities, DriverOptions, FormatDriver, Linguality, Parsed, ParseReport,
    },
    types::{Catalog, CatalogMeta, Message, State, Unit},
};

/// Timing line of the cue, kept byte-for-byte.
const TIMING_KEY: &str = "srt.timing";

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
        meta.format = Some("srt".to_string());
        meta.encoding = decoded.encoding;
        meta.bom = decoded.bom;
        meta.line_ending = decoded.line_ending;
        let mut catalog = Catalog::new(meta);

        let lines: Vec<&str> = decoded.text.lines().collect();
        let mut cursor = 0usize;
        while cursor < lines.len() {
            if lines[cursor].trim().is_empty() {
                cursor += 1;
                continue;
            }

            let index_line = cursor + 1;
            let index = lines[cursor].trim();
            if index.parse::<u64>().is_err() {
                return Err(Error::malformed(
                    index_line,
                    format!("expected a cue index, found `{index}`"),
                ));
            }
            cursor += 1;

            let timing = match lines.get(cursor) {
                Some(line) if line.contains("-->") => line.trim().to_string(),
                _ => {
                    return Err(Error::malformed(
                        cursor + 1,
                        "expected a timing line with `-->`",
                    ));
                }
            };
            cursor += 1;

            let mut text_lines = Vec::new();
            while cursor < lines.len() && !lines[cursor].trim().is_empty() {
                text_lines.push(lines[cursor]);
                cursor += 1;
            }
            let text = text_lines.join("\n");

            catalog.push_unit(build_unit(index.to_string(), timing, text, options));
        }

        finalize_parse(&mut catalog, &mut report, options);
        Ok(Parsed { catalog, report })
    }

    fn serialize(&self, catalog: &Catalog, options: &DriverOptions) -> Result<Vec<u8>, Error> {
        let mut blocks = Vec::new();
        for (position, unit) in catalog.active_units().enumerate() {
            let message = if options.template {
                unit.source()
            } else {
                unit.target()
            };
            let text = match message {
                Message::Singular(text) => text,
                Message::Plural(_) => {
                    return Err(Error::unsupported(format!(
                        "plural unit `{}` cannot be written as a subtitle cue",
                        unit.label()
                    )));
                }
            };
            let timing = unit.extra().get(TIMING_KEY).ok_or_else(|| {
                Error::mismatch(format!("cue `{}` has no timing line", unit.label()))
            })?;
            let index = unit
                .context()
                .and_then(|key| key.parse::<u64>().ok())
                .unwrap_or(position as u64 + 1);

            let mut block = format!("{index}\n{timing}");
            if !text.is_empty() {
                block.push('\n');
                block.push_str(text);
            }
            blocks.push(block);
        }

        let mut text = blocks.join("\n\n");
        text.push('\n');
        encoding::encode_output(&text, &catalog.meta)
    }
}

fn build_unit(index: String, timing: String, text: String, options: &DriverOptions) -> Unit {
    let message = Message::singular(text);
    let unit = if options.template {
        Unit::new(Some(index), message)
    } else {
        let state = if message.is_blank() {
            State::Empty
        } else {
            State::Translated
        };
        Unit::new(Some(index), message.blank_like())
            .with_target(message)
            .with_state(state)
    };
    unit.with_extra(TIMING_KEY, timing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SAMPLE: &str = indoc! {"
        1
        00:00:01,000 --> 00:00:04,000
        Ahoj, světe!

        2
        00:00:05,500 --> 00:00:08,250
        První řádek
        a druhý řádek
    "};

    #[test]
    fn test_parse_cues() {
        let parsed = Driver
            .parse(SAMPLE.as_bytes(), &DriverOptions::new().with_language("cs"))
            .unwrap();
        let units = &parsed.catalog.units;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].context(), Some("1"));
        assert_eq!(units[0].target().first(), "Ahoj, světe!");
        assert_eq!(
            units[0].extra().get("srt.timing").map(String::as_str),
            Some("00:00:01,000 --> 00:00:04,000")
        );
        assert_eq!(units[1].target().first(), "První řádek\na druhý řádek");
        assert_eq!(units[1].state(), State::Translated);
    }

    #[test]
    fn test_round_trip_is_byte_faithful() {
        let options = DriverOptions::new().with_language("cs");
        let parsed = Driver.parse(SAMPLE.as_bytes(), &options).unwrap();
        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), SAMPLE);
    }

    #[test]
    fn test_crlf_round_trip() {
        let input = SAMPLE.replace('\n', "\r\n");
        let options = DriverOptions::new();
        let parsed = Driver.parse(input.as_bytes(), &options).unwrap();
        let bytes = Driver.serialize(&parsed.catalog, &options).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), input);
    }

    #[test]
    fn test_template_mode_fills_source() {
        let parsed = Driver
            .parse(SAMPLE.as_bytes(), &DriverOptions::new().as_template(true))
            .unwrap();
        assert_eq!(parsed.catalog.units[0].source().first(), "Ahoj, světe!");
        assert!(parsed.catalog.units[0].target().is_blank());
    }

    #[test]
    fn test_missing_timing_line_is_malformed() {
        let result = Driver.parse(b"1\nAhoj\n", &DriverOptions::new());
        assert!(matches!(result, Err(Error::Malformed { line: Some(2), .. })));
    }

    #[test]
    fn test_non_numeric_index_is_malformed() {
        let result = Driver.parse(
            b"one\n00:00:01,000 --> 00:00:02,000\nAhoj\n",
            &DriverOptions::new(),
        );
        assert!(matches!(result, Err(Error::Malformed { line: Some(1), .. })));
    }

    #[test]
    fn test_unit_without_timing_cannot_serialize() {
        let mut catalog = Catalog::new(CatalogMeta::new("cs", IdentityRule::NativeKey));
        catalog.push_unit(
            Unit::new(Some("1".into()), Message::singular(""))
                .with_target(Message::singular("Ahoj"))
                .with_state(State::Translated),
        );
        let result = Driver.serialize(&catalog, &DriverOptions::new());
        assert!(matches!(result, Err(Error::Mismatch(_))));
    }

    #[test]
    fn test_extra_blank_lines_between_cues() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n";
        let parsed = Driver.parse(content.as_bytes(), &DriverOptions::new()).unwrap();
        assert_eq!(parsed.catalog.units.len(), 2);
    }
}
