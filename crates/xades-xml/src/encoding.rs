#![forbid(unsafe_code)]

//! Input decoding.
//!
//! UTF-16 and UTF-8 are recognized from a BOM (or the `<?` autodetection
//! pattern of UTF-16). Byte documents are decoded with the encoding named
//! in their XML declaration, looked up by label in `encoding_rs`, or as
//! UTF-8 without one. The XML declaration is dropped from the decoded text
//! because the signed output always carries its own UTF-8 declaration.

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};
use xades_core::Error;

/// Decode raw document bytes into text without its XML declaration.
pub fn decode_document(data: &[u8]) -> Result<String, Error> {
    let text = decode_to_string(data)?;
    tracing::trace!(bytes = data.len(), chars = text.chars().count(), "decoded input document");
    Ok(strip_declaration(&text).to_owned())
}

fn decode_to_string(data: &[u8]) -> Result<String, Error> {
    match data {
        [0xEF, 0xBB, 0xBF, rest @ ..] => decode(UTF_8, rest),
        [0xFF, 0xFE, rest @ ..] => decode(UTF_16LE, rest),
        [0xFE, 0xFF, rest @ ..] => decode(UTF_16BE, rest),
        [0x3C, 0x00, 0x3F, 0x00, ..] => decode(UTF_16LE, data),
        [0x00, 0x3C, 0x00, 0x3F, ..] => decode(UTF_16BE, data),
        _ => match declared_encoding(data) {
            None => decode(UTF_8, data),
            Some(label) => {
                let encoding = Encoding::for_label(label.trim().as_bytes())
                    .filter(|e| *e != REPLACEMENT)
                    .ok_or_else(|| {
                        Error::MalformedInput(format!("unsupported document encoding: {label}"))
                    })?;
                if is_ascii_label(&label) {
                    if let Some(pos) = data.iter().position(|b| !b.is_ascii()) {
                        return Err(Error::MalformedInput(format!(
                            "non-ASCII byte at offset {pos} in US-ASCII document"
                        )));
                    }
                }
                // A byte document cannot be UTF-16; `output_encoding` maps
                // such a declaration to UTF-8.
                decode(encoding.output_encoding(), data)
            }
        },
    }
}

fn decode(encoding: &'static Encoding, data: &[u8]) -> Result<String, Error> {
    encoding
        .decode_without_bom_handling_and_without_replacement(data)
        .map(|text| text.into_owned())
        .ok_or_else(|| Error::MalformedInput(format!("invalid {} input", encoding.name())))
}

/// `encoding_rs` treats ASCII labels as windows-1252; XML does not.
fn is_ascii_label(label: &str) -> bool {
    matches!(
        label.trim().to_ascii_lowercase().as_str(),
        "us-ascii" | "ascii" | "ansi_x3.4-1968" | "iso646-us"
    )
}

/// Read the `encoding` pseudo-attribute of a byte-oriented XML declaration.
fn declared_encoding(data: &[u8]) -> Option<String> {
    let end = data.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&data[..end]).ok()?;
    let rest = decl.strip_prefix("<?xml")?;
    let idx = rest.find("encoding")?;
    let rest = rest[idx + "encoding".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let close = rest.find(quote)?;
    Some(rest[..close].to_owned())
}

/// Return `text` without a leading `<?xml ...?>` declaration.
pub fn strip_declaration(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("<?xml") else {
        return text;
    };
    if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        // a processing instruction such as <?xml-stylesheet?>
        return text;
    }
    match rest.find("?>") {
        Some(end) => &rest[end + 2..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_with_declaration() {
        let text = decode_document(b"<?xml version=\"1.0\"?>\n<a>x</a>").unwrap();
        assert_eq!(text, "\n<a>x</a>");
    }

    #[test]
    fn test_utf8_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("<a>\u{e9}</a>".as_bytes());
        assert_eq!(decode_document(&data).unwrap(), "<a>\u{e9}</a>");
    }

    #[test]
    fn test_utf16le_bom() {
        let mut data = vec![0xFF, 0xFE];
        for u in "<a>\u{e9}</a>".encode_utf16() {
            data.extend_from_slice(&u.to_le_bytes());
        }
        assert_eq!(decode_document(&data).unwrap(), "<a>\u{e9}</a>");
    }

    #[test]
    fn test_utf16be_declaration() {
        let mut data = vec![0xFE, 0xFF];
        for u in "<?xml version=\"1.0\" encoding=\"UTF-16\"?><a/>".encode_utf16() {
            data.extend_from_slice(&u.to_be_bytes());
        }
        assert_eq!(decode_document(&data).unwrap(), "<a/>");
    }

    #[test]
    fn test_latin1() {
        let mut data = b"<?xml version='1.0' encoding='ISO-8859-1'?><a>".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b"</a>");
        assert_eq!(decode_document(&data).unwrap(), "<a>\u{e9}</a>");
    }

    #[test]
    fn test_windows_1252() {
        let mut data = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><a>".to_vec();
        data.extend_from_slice(&[0xE9, 0x80]);
        data.extend_from_slice(b"</a>");
        assert_eq!(decode_document(&data).unwrap(), "<a>\u{e9}\u{20ac}</a>");
    }

    #[test]
    fn test_iso_8859_15() {
        let mut data = b"<?xml version=\"1.0\" encoding=\"ISO-8859-15\"?><a>".to_vec();
        data.push(0xA4);
        data.extend_from_slice(b"</a>");
        assert_eq!(decode_document(&data).unwrap(), "<a>\u{20ac}</a>");
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let mut data = b"<?xml version=\"1.0\" encoding=\"US-ASCII\"?><a>".to_vec();
        data.push(0xE9);
        data.extend_from_slice(b"</a>");
        assert!(matches!(
            decode_document(&data),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_unknown_encoding() {
        let data = b"<?xml version=\"1.0\" encoding=\"EBCDIC\"?><a/>";
        let err = decode_document(data).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        assert!(err.to_string().contains("EBCDIC"));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(decode_document(&[b'<', b'a', b'>', 0xFF, b'<', b'/', b'a', b'>']).is_err());
    }

    #[test]
    fn test_stylesheet_pi_is_kept() {
        let text = "<?xml-stylesheet href=\"a.xsl\"?><a/>";
        assert_eq!(strip_declaration(text), text);
    }
}
