//! Path segment escaping for event parameters.
//!
//! Parameters travel as URL path segments, not a query string, and the
//! collection endpoint expects most URL punctuation to arrive verbatim. Only
//! control characters, the few printable ASCII characters that are never legal
//! in a URL, and non-ASCII bytes are escaped.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;

/// Bytes escaped in a path segment. Everything else in ASCII (including
/// space and `! * ' " ( ) ; : @ & = + $ , / ? # [ ] %`) passes through.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode `input` for use inside a URL path segment.
pub fn url_path_encode(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, PATH_SEGMENT).into()
}
