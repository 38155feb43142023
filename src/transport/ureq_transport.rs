use std::time::Duration;

#[cfg(feature = "metrics")]
use std::time::Instant;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::{
    error::{Error, Result},
    transport::{RequestBody, Transport, TransportRequest, TransportResponse},
};

/// Default [`Transport`] backed by a blocking `ureq` agent.
///
/// Non-success statuses are returned as responses so the caller can decide how
/// to interpret them. Requests are sent once; nothing is retried.
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Option<Duration>,
    user_agent: String,
}

impl UreqTransport {
    /// Creates a transport with an optional global per-request timeout.
    pub fn new(user_agent: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        #[cfg(feature = "rustls")]
        crate::transport::tls::ensure_rustls_crypto_provider();

        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
            user_agent: user_agent.unwrap_or_else(default_user_agent),
        })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: TransportRequest<'_>) -> Result<TransportResponse> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        #[cfg(feature = "tracing")]
        let _guard = tracing::debug_span!(
            "objclient.http",
            method = %method,
            host = url.host_str().unwrap_or(""),
            path = url.path(),
        )
        .entered();
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let result = match method.as_str() {
            "GET" => {
                ensure_empty_body(&body)?;
                apply_headers(
                    self.agent.get(url.as_str()),
                    &headers,
                    &self.user_agent,
                    self.timeout,
                )
                .call()
            }
            "HEAD" => {
                ensure_empty_body(&body)?;
                apply_headers(
                    self.agent.head(url.as_str()),
                    &headers,
                    &self.user_agent,
                    self.timeout,
                )
                .call()
            }
            "DELETE" => {
                ensure_empty_body(&body)?;
                apply_headers(
                    self.agent.delete(url.as_str()),
                    &headers,
                    &self.user_agent,
                    self.timeout,
                )
                .call()
            }
            "PUT" | "POST" => {
                let builder = if method == Method::PUT {
                    self.agent.put(url.as_str())
                } else {
                    self.agent.post(url.as_str())
                };
                let req = apply_headers(builder, &headers, &self.user_agent, self.timeout);
                match body {
                    RequestBody::Empty => req.send_empty(),
                    RequestBody::Bytes(b) => req.send(b.as_ref()),
                    RequestBody::Reader { reader, .. } => {
                        req.send(ureq::SendBody::from_reader(reader))
                    }
                }
            }
            _ => return Err(Error::invalid_config("unsupported HTTP method")),
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(err) => {
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "objclient_http_errors_total",
                    "method" => method_label(&method),
                )
                .increment(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(error = ?err, "transport error");

                return Err(Error::transport(
                    format!("request failed: {}", request_context(&method, &url)),
                    Some(Box::new(err)),
                ));
            }
        };

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "objclient_http_requests_total",
                "method" => method_label(&method),
                "class" => status_class(resp.status()),
            )
            .increment(1);
            metrics::histogram!(
                "objclient_http_request_duration_seconds",
                "method" => method_label(&method),
            )
            .record(start.elapsed().as_secs_f64());
        }

        let (parts, body) = resp.into_parts();
        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            body: Box::new(body.into_reader()),
        })
    }
}

pub(crate) fn response_error(status: StatusCode, headers: &HeaderMap, body: &str) -> Error {
    let request_id = headers
        .get("x-amz-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let snippet = crate::util::text::truncate_snippet(body, crate::util::text::MAX_SNIPPET);

    if let Some(parsed) = crate::util::xml::parse_error_xml(body) {
        return Error::Api {
            status,
            code: parsed.code,
            message: parsed.message,
            request_id: parsed.request_id.or(request_id),
            host_id: parsed.host_id,
            body_snippet: Some(snippet),
        };
    }

    Error::Api {
        status,
        code: None,
        message: None,
        request_id,
        host_id: None,
        body_snippet: Some(snippet),
    }
}

fn request_context(method: &Method, url: &Url) -> String {
    let authority = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    if authority.is_empty() {
        format!("{method} {}", url.path())
    } else {
        format!("{method} {authority}{}", url.path())
    }
}

fn ensure_empty_body(body: &RequestBody<'_>) -> Result<()> {
    match body {
        RequestBody::Empty => Ok(()),
        RequestBody::Bytes(_) | RequestBody::Reader { .. } => Err(Error::invalid_config(
            "this operation does not accept a request body",
        )),
    }
}

#[cfg(feature = "metrics")]
fn status_class(status: StatusCode) -> &'static str {
    if status.is_informational() {
        "1xx"
    } else if status.is_success() {
        "2xx"
    } else if status.is_redirection() {
        "3xx"
    } else if status.is_client_error() {
        "4xx"
    } else if status.is_server_error() {
        "5xx"
    } else {
        "other"
    }
}

#[cfg(feature = "metrics")]
fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "PUT" => "PUT",
        "HEAD" => "HEAD",
        "DELETE" => "DELETE",
        "POST" => "POST",
        _ => "OTHER",
    }
}

fn apply_headers<B>(
    mut req: ureq::RequestBuilder<B>,
    headers: &HeaderMap,
    user_agent: &str,
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    req = req.header(http::header::USER_AGENT, user_agent);
    for (name, value) in headers.iter() {
        let Ok(value_str) = value.to_str() else {
            continue;
        };
        req = req.header(name.as_str(), value_str);
    }

    if let Some(timeout) = timeout {
        req = req.config().timeout_global(Some(timeout)).build();
    }

    req
}

fn default_user_agent() -> String {
    format!("objclient/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use std::{
        io::{ErrorKind, Read, Write},
        net::TcpListener,
        sync::mpsc,
        time::Instant,
    };

    use super::*;

    fn read_request(stream: &mut std::net::TcpStream) -> Vec<u8> {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    request.extend_from_slice(&buf[..n]);
                    if request.len() > 64 * 1024 {
                        break;
                    }
                    if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                        let declared = head
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if request.len() >= end + 4 + declared {
                            break;
                        }
                    }
                }
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break;
                }
                Err(_) => break,
            }
        }
        request
    }

    fn serve_once(response: &'static [u8]) -> (String, mpsc::Receiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));
                        let request = read_request(&mut stream);
                        let _ = stream.write_all(response);
                        let _ = stream.flush();
                        let _ = tx.send(request);
                        break;
                    }
                    Err(err) if err.kind() == ErrorKind::WouldBlock => {
                        if Instant::now() >= deadline {
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        (format!("http://{addr}/"), rx)
    }

    #[test]
    fn execute_returns_response_for_http_error_status() {
        let (url, _rx) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let transport = UreqTransport::new(None, Some(Duration::from_secs(5))).unwrap();

        let resp = transport
            .execute(TransportRequest {
                method: Method::GET,
                url: Url::parse(&url).unwrap(),
                headers: HeaderMap::new(),
                body: RequestBody::Empty,
            })
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn streamed_put_sends_declared_content_length() {
        let (url, rx) = serve_once(
            b"HTTP/1.1 200 OK\r\nETag: \"abc\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let transport = UreqTransport::new(None, Some(Duration::from_secs(5))).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_LENGTH,
            http::HeaderValue::from_static("5"),
        );
        let mut reader: &[u8] = b"hello";

        let resp = transport
            .execute(TransportRequest {
                method: Method::PUT,
                url: Url::parse(&url).unwrap(),
                headers,
                body: RequestBody::Reader {
                    reader: &mut reader,
                    content_length: 5,
                },
            })
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
        assert!(text.starts_with("put / http/1.1"));
        assert!(text.contains("content-length: 5"));
        assert!(!text.contains("transfer-encoding"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn get_rejects_request_body() {
        let transport = UreqTransport::new(None, None).unwrap();
        let err = transport
            .execute(TransportRequest {
                method: Method::GET,
                url: Url::parse("http://127.0.0.1:9/").unwrap(),
                headers: HeaderMap::new(),
                body: RequestBody::Bytes(bytes::Bytes::from_static(b"x")),
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn response_error_parses_xml_error_fields() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-amz-request-id",
            http::HeaderValue::from_static("req-outer"),
        );

        let body = r#"
<Error>
  <Code>AccessDenied</Code>
  <Message>Access Denied</Message>
  <RequestId>req-inner</RequestId>
  <HostId>host-1</HostId>
</Error>
"#;

        match response_error(StatusCode::FORBIDDEN, &headers, body) {
            Error::Api {
                status,
                code,
                message,
                request_id,
                host_id,
                body_snippet,
            } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(code.as_deref(), Some("AccessDenied"));
                assert_eq!(message.as_deref(), Some("Access Denied"));
                assert_eq!(request_id.as_deref(), Some("req-inner"));
                assert_eq!(host_id.as_deref(), Some("host-1"));
                assert!(body_snippet.unwrap_or_default().contains("AccessDenied"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn response_error_keeps_plain_text_body() {
        match response_error(StatusCode::FORBIDDEN, &HeaderMap::new(), "Forbidden") {
            Error::Api {
                status,
                code,
                body_snippet,
                ..
            } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(code, None);
                assert_eq!(body_snippet.as_deref(), Some("Forbidden"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
