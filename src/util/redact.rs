use http::header::HeaderName;

use crate::error::Error;

/// Keeps the first and last four characters of a secret-ish value.
pub(crate) fn redact_value(value: &str) -> String {
    let chars = value.trim().chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }

    let head = chars[..4].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}

pub(crate) fn metadata_header_name(value: &str) -> Result<HeaderName, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_config("metadata key must not be empty"));
    }

    let name = format!("x-amz-meta-{}", value.to_ascii_lowercase());
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::invalid_config("invalid metadata key for x-amz-meta-* header"))
}
