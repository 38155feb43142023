//! SigV4 URI encoding.
//!
//! Object keys and query pairs are encoded byte-wise with the RFC 3986
//! unreserved set and uppercase hex, which is what the canonical request
//! hashes. Keys keep their `/` separators; query components do not.

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn keep_verbatim(byte: u8, in_path: bool) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(byte, b'-' | b'_' | b'.' | b'~')
        || (in_path && byte == b'/')
}

fn encode(input: &str, in_path: bool) -> String {
    input.bytes().fold(String::with_capacity(input.len()), |mut out, b| {
        if keep_verbatim(b, in_path) {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX_UPPER[usize::from(b >> 4)]));
            out.push(char::from(HEX_UPPER[usize::from(b & 0x0F)]));
        }
        out
    })
}

/// Encodes a query name or value. `/` is escaped.
pub(crate) fn aws_percent_encode(input: &str) -> String {
    encode(input, false)
}

/// Encodes an object key for the request path.
pub(crate) fn aws_percent_encode_path(input: &str) -> String {
    encode(input, true)
}

/// Encoded `name=value` pairs sorted by name, then value, joined by `&`.
pub(crate) fn canonical_query_string(params: &[(String, String)]) -> String {
    let mut pairs = params
        .iter()
        .map(|(name, value)| (aws_percent_encode(name), aws_percent_encode(value)))
        .collect::<Vec<_>>();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
