//! Byte-level decoding and encoding for format drivers.
//!
//! Drivers receive raw bytes; this module turns them into normalized text
//! (BOM sniffed, optional label hint honored, line endings recorded and
//! normalized to `\n`) and turns serializer output back into bytes in the
//! catalog's original encoding, line-ending convention, and BOM presence.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::{
    error::Error,
    types::{CatalogMeta, LineEnding},
};

/// The result of decoding input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Text with line endings normalized to `\n`.
    pub text: String,
    /// Canonical encoding name (e.g. "UTF-8", "UTF-16LE", "windows-1252").
    pub encoding: String,
    /// Whether the input started with a byte-order mark.
    pub bom: bool,
    /// Line-ending convention the input used.
    pub line_ending: LineEnding,
}

/// Decodes input bytes: a BOM wins, then the label hint, then strict
/// UTF-8. Undecodable input fails with [`Error::Encoding`]; the caller can
/// retry with an explicit hint.
pub fn decode(bytes: &[u8], hint: Option<&str>) -> Result<Decoded, Error> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        if had_errors {
            return Err(Error::encoding(
                encoding.name(),
                "invalid byte sequence after byte-order mark",
            ));
        }
        return Ok(finish(text, encoding.name(), true));
    }

    if let Some(label) = hint {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::encoding(label, "unknown encoding label"))?;
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(Error::encoding(encoding.name(), "invalid byte sequence"));
        }
        return Ok(finish(text, encoding.name(), false));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(finish(Cow::Borrowed(text), UTF_8.name(), false)),
        Err(error) => Err(Error::encoding(
            UTF_8.name(),
            format!("invalid byte sequence at offset {}", error.valid_up_to()),
        )),
    }
}

fn finish(text: Cow<'_, str>, encoding: &str, bom: bool) -> Decoded {
    let line_ending = if text.contains("\r\n") {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    };
    let normalized = match line_ending {
        LineEnding::Lf => text.into_owned(),
        LineEnding::CrLf => text.replace("\r\n", "\n"),
    };
    Decoded {
        text: normalized,
        encoding: encoding.to_string(),
        bom,
        line_ending,
    }
}

/// Encodes serializer output (always `\n`-separated internally) into the
/// catalog's recorded line endings, encoding, and BOM presence.
pub fn encode_output(text: &str, meta: &CatalogMeta) -> Result<Vec<u8>, Error> {
    let text: Cow<'_, str> = match meta.line_ending {
        LineEnding::Lf => Cow::Borrowed(text),
        LineEnding::CrLf => Cow::Owned(text.replace('\n', "\r\n")),
    };
    match meta.encoding.as_str() {
        "UTF-16LE" => Ok(utf16_bytes(&text, false, meta.bom)),
        "UTF-16BE" => Ok(utf16_bytes(&text, true, meta.bom)),
        label => {
            let encoding = Encoding::for_label(label.as_bytes())
                .ok_or_else(|| Error::encoding(label, "unknown encoding label"))?;
            if encoding == UTF_8 {
                let mut out = Vec::with_capacity(text.len() + 3);
                if meta.bom {
                    out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
                }
                out.extend_from_slice(text.as_bytes());
                Ok(out)
            } else {
                let (bytes, _, had_unmappable) = encoding.encode(&text);
                if had_unmappable {
                    return Err(Error::encoding(
                        label,
                        "text contains characters not representable in this encoding",
                    ));
                }
                Ok(bytes.into_owned())
            }
        }
    }
}

// encoding_rs only encodes to UTF-8 and legacy encodings, so UTF-16 output
// is assembled here.
fn utf16_bytes(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2 + 2);
    if bom {
        out.extend_from_slice(if big_endian {
            &[0xFE, 0xFF]
        } else {
            &[0xFF, 0xFE]
        });
    }
    for code_unit in text.encode_utf16() {
        let bytes = if big_endian {
            code_unit.to_be_bytes()
        } else {
            code_unit.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityRule;

    fn meta(encoding: &str, bom: bool, line_ending: LineEnding) -> CatalogMeta {
        let mut meta = CatalogMeta::new("en", IdentityRule::NativeKey);
        meta.encoding = encoding.to_string();
        meta.bom = bom;
        meta.line_ending = line_ending;
        meta
    }

    #[test]
    fn test_decode_plain_utf8() {
        let decoded = decode("ahoj světe".as_bytes(), None).unwrap();
        assert_eq!(decoded.text, "ahoj světe");
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(!decoded.bom);
        assert_eq!(decoded.line_ending, LineEnding::Lf);
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("hello".as_bytes());
        let decoded = decode(&bytes, None).unwrap();
        assert_eq!(decoded.text, "hello");
        assert!(decoded.bom);
    }

    #[test]
    fn test_decode_utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "key".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode(&bytes, None).unwrap();
        assert_eq!(decoded.text, "key");
        assert_eq!(decoded.encoding, "UTF-16LE");
        assert!(decoded.bom);
    }

    #[test]
    fn test_decode_with_latin1_hint() {
        // 0xE9 is é in ISO-8859-1 and invalid alone in UTF-8.
        let decoded = decode(&[0x63, 0x61, 0x66, 0xE9], Some("ISO-8859-1")).unwrap();
        assert_eq!(decoded.text, "café");
    }

    #[test]
    fn test_decode_invalid_utf8_reports_offset() {
        let error = decode(&[0x61, 0x62, 0xFF, 0x63], None).unwrap_err();
        match error {
            Error::Encoding { label, message } => {
                assert_eq!(label, "UTF-8");
                assert!(message.contains("offset 2"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_label() {
        let error = decode(b"x", Some("no-such-charset")).unwrap_err();
        assert!(matches!(error, Error::Encoding { .. }));
    }

    #[test]
    fn test_decode_normalizes_crlf() {
        let decoded = decode(b"a\r\nb\r\n", None).unwrap();
        assert_eq!(decoded.text, "a\nb\n");
        assert_eq!(decoded.line_ending, LineEnding::CrLf);
    }

    #[test]
    fn test_encode_restores_crlf() {
        let meta = meta("UTF-8", false, LineEnding::CrLf);
        let bytes = encode_output("a\nb\n", &meta).unwrap();
        assert_eq!(bytes, b"a\r\nb\r\n");
    }

    #[test]
    fn test_encode_restores_utf8_bom() {
        let meta = meta("UTF-8", true, LineEnding::Lf);
        let bytes = encode_output("x", &meta).unwrap();
        assert_eq!(bytes, vec![0xEF, 0xBB, 0xBF, b'x']);
    }

    #[test]
    fn test_utf16le_round_trip() {
        let meta = meta("UTF-16LE", true, LineEnding::Lf);
        let bytes = encode_output("key", &meta).unwrap();
        let decoded = decode(&bytes, None).unwrap();
        assert_eq!(decoded.text, "key");
        assert_eq!(decoded.encoding, "UTF-16LE");
    }

    #[test]
    fn test_encode_unmappable_fails() {
        let meta = meta("ISO-8859-2", false, LineEnding::Lf);
        let error = encode_output("日本語", &meta).unwrap_err();
        assert!(matches!(error, Error::Encoding { .. }));
    }

    #[test]
    fn test_latin1_round_trip() {
        let decoded = decode(&[0x63, 0x61, 0x66, 0xE9], Some("ISO-8859-1")).unwrap();
        let meta = meta(&decoded.encoding, false, LineEnding::Lf);
        let bytes = encode_output(&decoded.text, &meta).unwrap();
        assert_eq!(bytes, vec![0x63, 0x61, 0x66, 0xE9]);
    }
}
