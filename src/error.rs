use std::{error::Error as StdError, fmt, sync::Arc};

use http::StatusCode;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

type Source = Arc<dyn StdError + Send + Sync + 'static>;

/// Error type for request building, transport, API responses, and local I/O.
///
/// Errors are cheap to clone so a single upload failure can be reported to
/// both the blocked writer and every reader of the completion outcome.
#[non_exhaustive]
#[derive(Clone)]
pub enum Error {
    /// Invalid configuration or parameters.
    InvalidConfig { message: String },

    /// Request signing failed.
    Signing { message: String },

    /// Service answered with a status other than the expected success code.
    Api {
        status: StatusCode,
        code: Option<String>,
        message: Option<String>,
        request_id: Option<String>,
        host_id: Option<String>,
        body_snippet: Option<String>,
    },

    /// Transport-level failure (HTTP client, IO, TLS).
    Transport {
        message: String,
        source: Option<Source>,
    },

    /// Response decode or parse failure.
    Decode {
        message: String,
        source: Option<Source>,
    },

    /// Upload pipe used after one of its ends was closed.
    ClosedPipe { message: String },

    /// Local path does not exist.
    NotFound { path: String },

    /// Local path is a directory where a file was expected.
    IsDirectory { path: String },

    /// Requested byte range is outside the object.
    InvalidRange { offset: i64, length: i64 },

    /// Local filesystem failure.
    Io {
        message: String,
        source: Option<Source>,
    },
}

/// Coarse classification used to decide how to react to an [`Error`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally before any network side effect; fix the input and retry.
    Configuration,
    /// Connection, DNS, TLS or timeout failure.
    Transport,
    /// The remote service refused the request.
    RemoteRejection,
    /// Response could not be decoded.
    Decode,
    /// A handle was used against its contract.
    ContractViolation,
    /// Local filesystem backend failure.
    Local,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => f
                .debug_struct("InvalidConfig")
                .field("message", message)
                .finish(),
            Self::Signing { message } => {
                f.debug_struct("Signing").field("message", message).finish()
            }
            Self::Api {
                status,
                code,
                message,
                request_id,
                host_id,
                body_snippet,
            } => f
                .debug_struct("Api")
                .field("status", status)
                .field("code", code)
                .field("message", message)
                .field("request_id", request_id)
                .field("host_id", host_id)
                .field("body_snippet", body_snippet)
                .finish(),
            Self::Transport { message, source } => f
                .debug_struct("Transport")
                .field("message", message)
                .field("source", source)
                .finish(),
            Self::Decode { message, source } => f
                .debug_struct("Decode")
                .field("message", message)
                .field("source", source)
                .finish(),
            Self::ClosedPipe { message } => f
                .debug_struct("ClosedPipe")
                .field("message", message)
                .finish(),
            Self::NotFound { path } => f.debug_struct("NotFound").field("path", path).finish(),
            Self::IsDirectory { path } => {
                f.debug_struct("IsDirectory").field("path", path).finish()
            }
            Self::InvalidRange { offset, length } => f
                .debug_struct("InvalidRange")
                .field("offset", offset)
                .field("length", length)
                .finish(),
            Self::Io { message, source } => f
                .debug_struct("Io")
                .field("message", message)
                .field("source", source)
                .finish(),
        }
    }
}

impl Error {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a transport error with optional source.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a decode error with optional source.
    pub fn decode(
        message: impl Into<String>,
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a closed pipe error.
    pub fn closed_pipe(message: impl Into<String>) -> Self {
        Self::ClosedPipe {
            message: message.into(),
        }
    }

    /// Creates a local I/O error from a `std::io::Error`.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns the crate error carried inside an `std::io::Error`, if any.
    ///
    /// Upload writers report pipe failures through `std::io::Write`; this
    /// recovers the original error.
    pub fn from_io_ref(err: &std::io::Error) -> Option<&Error> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Error>())
    }

    pub(crate) fn into_io(self) -> std::io::Error {
        std::io::Error::other(self)
    }

    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::Signing { .. } => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Api { .. } => ErrorKind::RemoteRejection,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::ClosedPipe { .. } => ErrorKind::ContractViolation,
            Self::NotFound { .. }
            | Self::IsDirectory { .. }
            | Self::InvalidRange { .. }
            | Self::Io { .. } => ErrorKind::Local,
        }
    }

    /// Returns an HTTP status when available.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the request id if reported by the service.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the error is safe to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Transport { .. } | Self::Io { .. } => true,
            Self::InvalidConfig { .. }
            | Self::Signing { .. }
            | Self::Decode { .. }
            | Self::ClosedPipe { .. }
            | Self::NotFound { .. }
            | Self::IsDirectory { .. }
            | Self::InvalidRange { .. } => false,
        }
    }
}

fn format_optional_field(label: &str, value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => format!(" {label}={v}"),
        _ => String::new(),
    }
}

fn format_optional_message(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => format!(" ({v})"),
        _ => String::new(),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "invalid config: {message}"),
            Self::Signing { message } => write!(f, "signing error: {message}"),
            Self::Api {
                status,
                code,
                message,
                request_id,
                ..
            } => {
                let code = format_optional_field("code", code);
                let request_id = format_optional_field("request_id", request_id);
                let msg = format_optional_message(message);
                write!(f, "api error: {status}{code}{request_id}{msg}")
            }
            Self::Transport { message, .. } => write!(f, "transport error: {message}"),
            Self::Decode { message, .. } => write!(f, "decode error: {message}"),
            Self::ClosedPipe { message } => write!(f, "closed pipe: {message}"),
            Self::NotFound { path } => write!(f, "not found: {path}"),
            Self::IsDirectory { path } => write!(f, "is a directory: {path}"),
            Self::InvalidRange { offset, length } => {
                write!(f, "invalid range: offset={offset} length={length}")
            }
            Self::Io { message, .. } => write!(f, "io error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport { source, .. }
            | Self::Decode { source, .. }
            | Self::Io { source, .. } => source.as_deref().map(|e| e as &(dyn StdError + 'static)),
            Self::InvalidConfig { .. }
            | Self::Signing { .. }
            | Self::Api { .. }
            | Self::ClosedPipe { .. }
            | Self::NotFound { .. }
            | Self::IsDirectory { .. }
            | Self::InvalidRange { .. } => None,
        }
    }
}
