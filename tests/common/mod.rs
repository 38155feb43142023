#![allow(dead_code)]

use std::{
    collections::HashMap,
    env,
    io::Read as _,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use http::{HeaderMap, HeaderValue, Method, StatusCode};
use md5::Digest as _;

use objclient::{
    AddressingStyle, Auth, Client, Error, Region, RequestBody, Transport, TransportRequest,
    TransportResponse,
};

static KEY_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

pub fn client_with(transport: Arc<dyn Transport>) -> Client {
    Client::builder("http://127.0.0.1:9000")
        .unwrap()
        .region("us-east-1")
        .transport(transport)
        .build()
        .unwrap()
}

/// Canned-response transport for upload tests.
///
/// Counts calls, optionally drains and records the streamed body per URL
/// path, and can delay each response by a per-path amount.
pub struct StubTransport {
    status: StatusCode,
    body: &'static str,
    read_body: bool,
    fail_with: Option<&'static str>,
    jitter: bool,
    pub calls: AtomicUsize,
    pub body_errors: AtomicUsize,
    pub received: Mutex<HashMap<String, Vec<u8>>>,
}

impl StubTransport {
    /// Reads the whole body and answers 200 with the body's MD5 as ETag.
    pub fn ok() -> Self {
        Self::respond(StatusCode::OK, "")
    }

    /// Answers `status` with `body` without reading the request body.
    pub fn reject(status: StatusCode, body: &'static str) -> Self {
        Self {
            read_body: false,
            ..Self::respond(status, body)
        }
    }

    /// Fails every request at the transport level.
    pub fn unreachable(message: &'static str) -> Self {
        Self {
            read_body: false,
            fail_with: Some(message),
            ..Self::ok()
        }
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn respond(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            read_body: true,
            fail_with: None,
            jitter: false,
            calls: AtomicUsize::new(0),
            body_errors: AtomicUsize::new(0),
            received: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self, path: &str) -> Option<Vec<u8>> {
        self.received.lock().unwrap().get(path).cloned()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: TransportRequest<'_>) -> objclient::Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_with {
            return Err(Error::transport(message, None));
        }

        let path = request.url.path().to_string();
        let mut body = Vec::new();
        if self.read_body {
            if let RequestBody::Reader { reader, .. } = request.body {
                if let Err(err) = reader.read_to_end(&mut body) {
                    self.body_errors.fetch_add(1, Ordering::SeqCst);
                    return Err(Error::transport("failed to read request body", Some(Box::new(err))));
                }
            }
        }

        if self.jitter {
            let spread = path.bytes().map(u64::from).sum::<u64>() % 15;
            thread::sleep(Duration::from_millis(spread));
        }

        let mut headers = HeaderMap::new();
        if self.status == StatusCode::OK {
            let etag = format!("\"{}\"", md5_hex(&body));
            headers.insert(http::header::ETAG, HeaderValue::from_str(&etag).unwrap());
        }
        self.received.lock().unwrap().insert(path, body);

        Ok(TransportResponse::new(self.status, headers, self.body))
    }
}

/// A tiny in-memory object store speaking just enough S3 for the facade.
#[derive(Default)]
pub struct MemoryTransport {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl Transport for MemoryTransport {
    fn execute(&self, request: TransportRequest<'_>) -> objclient::Result<TransportResponse> {
        let path = request.url.path().to_string();
        let mut objects = self.objects.lock().unwrap();

        if request.method == Method::PUT {
            let mut body = Vec::new();
            if let RequestBody::Reader { reader, .. } = request.body {
                reader
                    .read_to_end(&mut body)
                    .map_err(|e| Error::transport("body read failed", Some(Box::new(e))))?;
            }
            objects.insert(path, body);
            return Ok(TransportResponse::new(StatusCode::OK, HeaderMap::new(), ""));
        }

        if request.method != Method::GET && request.method != Method::HEAD {
            return Ok(TransportResponse::new(
                StatusCode::METHOD_NOT_ALLOWED,
                HeaderMap::new(),
                "",
            ));
        }

        let Some(data) = objects.get(&path) else {
            return Ok(TransportResponse::new(
                StatusCode::NOT_FOUND,
                HeaderMap::new(),
                "NoSuchKey",
            ));
        };
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(data.len()));
        let body = if request.method == Method::GET {
            data.clone()
        } else {
            Vec::new()
        };
        Ok(TransportResponse::new(StatusCode::OK, headers, body))
    }
}

/// Polls `cond` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub struct LiveConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: Region,
    pub auth: Auth,
}

/// Reads the live-suite settings. Returns `None` unless `S3_TEST_ENDPOINT`,
/// `S3_TEST_BUCKET` and credentials are all present.
pub fn load_live_config() -> Result<Option<LiveConfig>, Error> {
    let (Ok(endpoint), Ok(bucket)) = (env::var("S3_TEST_ENDPOINT"), env::var("S3_TEST_BUCKET"))
    else {
        return Ok(None);
    };

    let region = env::var("S3_TEST_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    let region = Region::new(region)?;

    let Ok(auth) = Auth::from_env() else {
        return Ok(None);
    };

    Ok(Some(LiveConfig {
        endpoint,
        bucket,
        region,
        auth,
    }))
}

pub fn build_live_client(cfg: &LiveConfig) -> Result<Client, Error> {
    Client::builder(&cfg.endpoint)?
        .region(cfg.region.as_str())
        .auth(cfg.auth.clone())
        .addressing_style(AddressingStyle::Auto)
        .timeout(Duration::from_secs(30))
        .build()
}

pub fn unique_key(prefix: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let n = KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{now}-{n}")
}
