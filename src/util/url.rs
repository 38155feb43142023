use std::net::IpAddr;

use url::Url;

use crate::{auth::AddressingStyle, error::Error};

pub(crate) struct ResolvedUrl {
    pub(crate) url: Url,
    pub(crate) canonical_uri: String,
    pub(crate) canonical_query_string: String,
}

pub(crate) fn resolve_url(
    base_url: &Url,
    bucket: Option<&str>,
    key: Option<&str>,
    query_params: &[(String, String)],
    addressing: AddressingStyle,
) -> Result<ResolvedUrl, Error> {
    let mut url = base_url.clone();

    let canonical_query_string = crate::util::encode::canonical_query_string(query_params);

    if canonical_query_string.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&canonical_query_string));
    }

    let Some(bucket) = bucket else {
        url.set_path("/");
        return Ok(ResolvedUrl {
            url,
            canonical_uri: "/".to_string(),
            canonical_query_string,
        });
    };

    let host = base_url
        .host_str()
        .ok_or_else(|| Error::invalid_config("endpoint must include host"))?;

    let resolved_style = resolve_addressing_style(base_url, host, bucket, addressing);

    let (final_host, raw_path) = match resolved_style {
        AddressingStyle::Path => {
            let raw_path = match key {
                Some(key) => format!("/{bucket}/{key}"),
                None => format!("/{bucket}"),
            };
            (host.to_string(), raw_path)
        }
        AddressingStyle::VirtualHosted => {
            if !is_dns_compatible_bucket(bucket) {
                return Err(Error::invalid_config(
                    "bucket is not DNS compatible for virtual-hosted-style",
                ));
            }
            let raw_path = match key {
                Some(key) if !key.is_empty() => format!("/{key}"),
                _ => "/".to_string(),
            };
            (format!("{bucket}.{host}"), raw_path)
        }
        AddressingStyle::Auto => {
            return Err(Error::invalid_config(
                "internal error: auto addressing style must be resolved",
            ));
        }
    };

    let canonical_uri = crate::util::encode::aws_percent_encode_path(&raw_path);

    url.set_path(&canonical_uri);
    url.set_host(Some(&final_host))
        .map_err(|_| Error::invalid_config("invalid endpoint host"))?;

    Ok(ResolvedUrl {
        url,
        canonical_uri,
        canonical_query_string,
    })
}

fn resolve_addressing_style(
    base_url: &Url,
    host: &str,
    bucket: &str,
    addressing: AddressingStyle,
) -> AddressingStyle {
    match addressing {
        AddressingStyle::Path | AddressingStyle::VirtualHosted => addressing,
        AddressingStyle::Auto => {
            if host == "localhost" || host.parse::<IpAddr>().is_ok() {
                return AddressingStyle::Path;
            }

            if base_url.scheme() == "https" && bucket.contains('.') {
                return AddressingStyle::Path;
            }

            if !is_dns_compatible_bucket(bucket) {
                return AddressingStyle::Path;
            }

            AddressingStyle::VirtualHosted
        }
    }
}

/// Maximum object key length accepted by S3, in bytes.
const MAX_KEY_LEN: usize = 1024;

/// S3 bucket naming rules: 3-63 chars of lowercase letters, digits, `-` and
/// `.`, alphanumeric at both ends, no `..`, and not an IP address.
pub(crate) fn is_valid_bucket_name(bucket: &str) -> bool {
    is_dns_compatible_bucket(bucket)
}

pub(crate) fn validate_destination(bucket: &str, key: &str) -> Result<(), Error> {
    if !is_valid_bucket_name(bucket) {
        return Err(Error::invalid_config(format!(
            "invalid bucket name: {bucket:?}"
        )));
    }
    if key.is_empty() {
        return Err(Error::invalid_config("object key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::invalid_config(format!(
            "object key must be at most {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

fn is_dns_compatible_bucket(bucket: &str) -> bool {
    let bytes = bucket.as_bytes();
    if bytes.len() < 3 || bytes.len() > 63 {
        return false;
    }

    if bytes.iter().any(|b| b.is_ascii_uppercase()) {
        return false;
    }

    let is_allowed = |b: u8| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.');
    if !bytes.iter().all(|&b| is_allowed(b)) {
        return false;
    }

    let starts_ok = matches!(bytes[0], b'a'..=b'z' | b'0'..=b'9');
    let ends_ok = matches!(bytes[bytes.len() - 1], b'a'..=b'z' | b'0'..=b'9');
    if !starts_ok || !ends_ok {
        return false;
    }

    if bucket.contains("..") {
        return false;
    }

    if bucket.parse::<IpAddr>().is_ok() {
        return false;
    }

    true
}
