use http::{HeaderMap, HeaderName, HeaderValue, header::AsHeaderName};

use crate::error::{Error, Result};

pub(crate) fn header_string<N>(headers: &HeaderMap, name: N) -> Option<String>
where
    N: AsHeaderName,
{
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

pub(crate) fn header_u64<N>(headers: &HeaderMap, name: N) -> Option<u64>
where
    N: AsHeaderName,
{
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Inserts a caller-supplied header value, naming the header in the error.
pub(crate) fn insert_checked(
    headers: &mut HeaderMap,
    name: HeaderName,
    value: &str,
) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| Error::invalid_config(format!("invalid {name} header")))?;
    headers.insert(name, value);
    Ok(())
}
