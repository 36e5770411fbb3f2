//! HTML Character Reference Decoding
//!
//! Handles decoding of character references:
//! - Common named entities: &amp; &lt; &nbsp; &copy; ...
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no references are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling character references
///
/// Returns Borrowed if no references are present (zero-copy),
/// returns Owned if references were decoded.
#[inline]
pub fn decode(input: &str) -> Cow<'_, str> {
    // Fast path: check for '&' using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    // Slow path: decode references
    Cow::Owned(decode_references(input))
}

/// Decode all character references in the input
fn decode_references(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if let Some(amp_pos) = memchr(b'&', &bytes[pos..]) {
            // Copy everything before the reference
            result.push_str(&input[pos..pos + amp_pos]);
            pos += amp_pos;

            // Find the semicolon; references longer than 32 bytes are not real
            let search_end = (pos + 32).min(bytes.len());
            if let Some(semi_offset) = memchr(b';', &bytes[pos..search_end]) {
                let entity = &input[pos + 1..pos + semi_offset];

                if let Some(decoded) = decode_reference(entity) {
                    result.push_str(&decoded);
                    pos += semi_offset + 1;
                } else {
                    // Unknown entity, keep as-is
                    result.push('&');
                    pos += 1;
                }
            } else {
                // No semicolon found, keep the ampersand
                result.push('&');
                pos += 1;
            }
        } else {
            // No more references, copy the rest
            result.push_str(&input[pos..]);
            break;
        }
    }

    result
}

/// Decode a single reference (without & and ;)
fn decode_reference(entity: &str) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    // Numeric character reference
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric(numeric);
    }

    named_entity(entity).map(str::to_string)
}

/// Decode a numeric character reference body (after '#')
fn decode_numeric(body: &str) -> Option<String> {
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

/// Look up a named entity
///
/// Covers the references that actually occur in real-world markup; the long
/// tail of HTML5 names is left undecoded rather than carrying a 2000-entry
/// table.
fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "sect" => "\u{a7}",
        "para" => "\u{b6}",
        "dagger" => "\u{2020}",
        "deg" => "\u{b0}",
        "plusmn" => "\u{b1}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "micro" => "\u{b5}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "yen" => "\u{a5}",
        "cent" => "\u{a2}",
        "frac12" => "\u{bd}",
        "frac14" => "\u{bc}",
        "frac34" => "\u{be}",
        "sup1" => "\u{b9}",
        "sup2" => "\u{b2}",
        "sup3" => "\u{b3}",
        "iexcl" => "\u{a1}",
        "iquest" => "\u{bf}",
        "szlig" => "\u{df}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_references_is_borrowed() {
        let decoded = decode("plain text");
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "plain text");
    }

    #[test]
    fn test_named_entities() {
        assert_eq!(decode("a &amp; b"), "a & b");
        assert_eq!(decode("&lt;p&gt;"), "<p>");
        assert_eq!(decode("caf&eacute;"), "caf&eacute;"); // unknown kept as-is
        assert_eq!(decode("1&nbsp;000"), "1\u{a0}000");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode("&#65;"), "A");
        assert_eq!(decode("&#x41;"), "A");
        assert_eq!(decode("&#X41;"), "A");
        assert_eq!(decode("&#x20AC;"), "\u{20ac}");
    }

    #[test]
    fn test_invalid_numeric_kept() {
        assert_eq!(decode("&#xD800;"), "&#xD800;"); // surrogate, not a char
        assert_eq!(decode("&#zzz;"), "&#zzz;");
    }

    #[test]
    fn test_unterminated_ampersand() {
        assert_eq!(decode("fish & chips"), "fish & chips");
        assert_eq!(decode("trailing &"), "trailing &");
    }

    #[test]
    fn test_adjacent_references() {
        assert_eq!(decode("&lt;&lt;&gt;&gt;"), "<<>>");
    }
}
