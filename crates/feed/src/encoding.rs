// ABOUTME: Charset handling: converts response bodies to UTF-8 and sniffs raw XML bytes.
// ABOUTME: Uses encoding_rs for conversion and chardetng as a last-resort guess for undeclared input.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::debug;

use crate::error::FeedError;

/// Encoding every document is converted to before tree building.
pub const CANONICAL_ENCODING: &str = "utf-8";

/// Charset assumed when a response declares none.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// How far into a document the XML declaration is searched for.
const DECLARATION_WINDOW: usize = 1024;

static DECLARED_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:\-]+)["']"#)
        .expect("declaration pattern is valid")
});

/// Converts `body`, encoded in `declared_charset`, to UTF-8.
///
/// Fails when the charset label is unknown or when `body` contains byte
/// sequences that are invalid in it; nothing is ever replaced silently.
pub fn normalize<'a>(body: &'a [u8], declared_charset: &str) -> Result<Cow<'a, str>, FeedError> {
    let label = declared_charset.trim();
    let label = if label.is_empty() { DEFAULT_CHARSET } else { label };

    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| FeedError::encoding(format!("unsupported charset: {}", label)))?;

    debug!(charset = %label, encoding = encoding.name(), bytes = body.len(), "converting body to utf-8");

    // A BOM for a different encoding is a lie in the header; strip only a matching one.
    let body = match Encoding::for_bom(body) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &body[bom_len..],
        _ => body,
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            FeedError::encoding(format!(
                "invalid byte sequence for charset {}",
                encoding.name()
            ))
        })
}

/// Raw document bytes decoded for tree building.
#[derive(Debug)]
pub struct SniffedText<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
}

/// Decodes raw XML bytes of unknown encoding.
///
/// Order: byte-order mark, the XML declaration's `encoding`, then UTF-8. Input
/// that is not valid UTF-8 and declares nothing is decoded with a detected
/// encoding instead of failing, as the tree builder recovers from the rest.
pub fn sniff_document(bytes: &[u8]) -> SniffedText<'_> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return SniffedText { text, encoding };
    }

    if let Some(encoding) = declared_encoding(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            debug!(encoding = encoding.name(), "replaced invalid sequences in document");
        }
        return SniffedText { text, encoding };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return SniffedText {
            text: Cow::Borrowed(text),
            encoding: UTF_8,
        };
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    debug!(encoding = encoding.name(), "document is not utf-8 and declares no encoding, guessed");
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    SniffedText { text, encoding }
}

/// Encoding named by the XML declaration, if it is one encoding_rs knows.
///
/// A declaration naming a UTF-16 variant is read as UTF-8: bytes that reached
/// this point without a BOM are ASCII-compatible.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let label = DECLARED_ENCODING_RE.captures(window)?.get(1)?.as_bytes();
    let encoding = Encoding::for_label(label)?;
    if encoding.output_encoding() != encoding {
        return Some(encoding.output_encoding());
    }
    Some(encoding)
}
