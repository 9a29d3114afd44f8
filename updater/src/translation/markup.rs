//! Opaque encoding of inline markup.
//!
//! `<tag ...>text</tag>` spans (closing tag on the same line) and
//! self-closing `<tag .../>` become `__TAG__<base64>__TAG__` so the remote
//! service cannot rewrite them. A literal `__TAG__` already in the text is
//! encoded the same way, so `decode(encode(s)) == s` for any input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const TAG_MARKER: &str = "__TAG__";

pub fn encode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let span_end = match bytes[i] {
            b'<' => markup_span_end(bytes, i),
            b'_' if text[i..].starts_with(TAG_MARKER) => Some(i + TAG_MARKER.len()),
            _ => None,
        };

        if let Some(end) = span_end {
            out.push_str(&text[copied..i]);
            out.push_str(TAG_MARKER);
            out.push_str(&STANDARD.encode(&text[i..end]));
            out.push_str(TAG_MARKER);
            copied = end;
            i = end;
            continue;
        }
        i += 1;
    }

    out.push_str(&text[copied..]);
    out
}

/// Tokens that are not valid base64 of UTF-8 text are left as they are.
pub fn decode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(TAG_MARKER) {
        let after_marker = &rest[start + TAG_MARKER.len()..];
        let payload_len = after_marker
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
            .count();
        let payload = &after_marker[..payload_len];

        let decoded = if payload_len > 0 && after_marker[payload_len..].starts_with(TAG_MARKER) {
            STANDARD
                .decode(payload)
                .ok()
                .and_then(|raw| String::from_utf8(raw).ok())
        } else {
            None
        };

        match decoded {
            Some(markup) => {
                out.push_str(&rest[..start]);
                out.push_str(&markup);
                rest = &after_marker[payload_len + TAG_MARKER.len()..];
            }
            None => {
                out.push_str(&rest[..start + 1]);
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// End (exclusive) of a markup span starting at `start`, if there is one.
fn markup_span_end(bytes: &[u8], start: usize) -> Option<usize> {
    if let Some(open_end) = tag_end(bytes, start) {
        let mut j = open_end;
        while j < bytes.len() && !matches!(bytes[j], b'\n' | b'\r') {
            if bytes[j] == b'<' && bytes.get(j + 1) == Some(&b'/') {
                if let Some(close_end) = tag_end(bytes, j + 1).filter(|&e| e > j + 3) {
                    return Some(close_end);
                }
            }
            j += 1;
        }
    }

    self_closing_end(bytes, start)
}

/// `<` followed by at least one non-`>` byte and a `>`; returns the index after `>`.
fn tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let gt = bytes[start + 1..].iter().position(|&b| b == b'>')? + start + 1;
    (gt > start + 1).then_some(gt + 1)
}

fn self_closing_end(bytes: &[u8], start: usize) -> Option<usize> {
    let body = bytes[start + 1..]
        .iter()
        .take_while(|&&b| b != b'/' && b != b'>')
        .count();
    let slash = start + 1 + body;
    (body > 0 && bytes.get(slash) == Some(&b'/') && bytes.get(slash + 1) == Some(&b'>'))
        .then_some(slash + 2)
}
