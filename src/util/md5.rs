use base64::Engine as _;
use http::HeaderValue;

use crate::{Result, error::Error};

pub(crate) const MD5_LEN: usize = 16;

pub(crate) fn content_md5_header_value(bytes: &[u8]) -> Result<HeaderValue> {
    use md5::Digest as _;

    let digest = md5::Md5::digest(bytes);
    encode_header(&digest)
}

/// Parses a caller-supplied hex MD5 into a `Content-MD5` header value.
///
/// Blank input means no integrity check was requested.
pub(crate) fn content_md5_from_hex(md5_hex: &str) -> Result<Option<HeaderValue>> {
    match parse_md5_hex(md5_hex)? {
        Some(digest) => encode_header(&digest).map(Some),
        None => Ok(None),
    }
}

/// Decodes a hex MD5 digest. Blank input yields `None`.
pub(crate) fn parse_md5_hex(md5_hex: &str) -> Result<Option<[u8; MD5_LEN]>> {
    let md5_hex = md5_hex.trim();
    if md5_hex.is_empty() {
        return Ok(None);
    }

    let digest = hex::decode(md5_hex)
        .map_err(|_| Error::invalid_config(format!("content md5 is not valid hex: {md5_hex}")))?;
    let len = digest.len();
    let digest = <[u8; MD5_LEN]>::try_from(digest).map_err(|_| {
        Error::invalid_config(format!("content md5 must be {MD5_LEN} bytes, got {len}"))
    })?;
    Ok(Some(digest))
}

fn encode_header(digest: &[u8]) -> Result<HeaderValue> {
    let value = base64::engine::general_purpose::STANDARD.encode(digest);
    HeaderValue::from_str(&value).map_err(|_| Error::invalid_config("invalid Content-MD5 header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_md5_in_base64() {
        let hv = content_md5_header_value(b"").unwrap();
        assert_eq!(hv.to_str().unwrap(), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn hex_digest_is_reencoded_as_base64() {
        let hv = content_md5_from_hex("d41d8cd98f00b204e9800998ecf8427e")
            .unwrap()
            .unwrap();
        assert_eq!(hv.to_str().unwrap(), "1B2M2Y8AsgTpgAmY7PhCfg==");

        // md5("hello")
        let hv = content_md5_from_hex("5d41402abc4b2a76b9719d911017c592")
            .unwrap()
            .unwrap();
        assert_eq!(hv, content_md5_header_value(b"hello").unwrap());
    }

    #[test]
    fn blank_digest_means_no_check() {
        assert!(content_md5_from_hex("").unwrap().is_none());
        assert!(content_md5_from_hex("  ").unwrap().is_none());
    }

    #[test]
    fn malformed_digest_is_a_config_error() {
        for bad in ["zz", "abc", "d41d8cd98f00b204", "not-hex-at-all-but-thirty-two-ch"] {
            let err = content_md5_from_hex(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { .. }), "{bad}: {err:?}");
        }
    }
}
