use std::{fmt, sync::Arc, time::Duration};

use http::{HeaderMap, Method};
use time::OffsetDateTime;
use url::Url;

use crate::{
    api,
    auth::{AddressingStyle, Auth, Region},
    backend::RemoteObject,
    error::{Error, Result},
    transport::{RequestBody, Transport, TransportRequest, TransportResponse, UreqTransport},
    util::{self, url::ResolvedUrl},
};

/// Blocking client for an S3-compatible endpoint.
///
/// Cheap to clone; clones share the endpoint configuration and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

pub struct ClientBuilder {
    endpoint: Url,
    region: Option<String>,
    auth: Auth,
    addressing: AddressingStyle,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

struct Inner {
    endpoint: Url,
    region: Region,
    auth: Auth,
    addressing: AddressingStyle,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("region", &self.inner.region)
            .field("auth", &self.inner.auth)
            .field("addressing", &self.inner.addressing)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder(endpoint: impl AsRef<str>) -> Result<ClientBuilder> {
        ClientBuilder::new(endpoint.as_ref())
    }

    pub fn objects(&self) -> api::ObjectsService {
        api::ObjectsService::new(self.clone())
    }

    pub fn buckets(&self) -> api::BucketsService {
        api::BucketsService::new(self.clone())
    }

    /// Binds this client to one object for use through
    /// [`ObjectClient`](crate::ObjectClient).
    pub fn object(&self, bucket: impl Into<String>, key: impl Into<String>) -> RemoteObject {
        RemoteObject::new(self.clone(), bucket.into(), key.into())
    }

    pub fn region(&self) -> &Region {
        &self.inner.region
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    pub(crate) fn resolve(
        &self,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: &[(String, String)],
    ) -> Result<ResolvedUrl> {
        util::url::resolve_url(
            &self.inner.endpoint,
            bucket,
            key,
            query_params,
            self.inner.addressing,
        )
    }

    /// Signs `headers` when credentials are configured; anonymous clients
    /// leave them untouched.
    pub(crate) fn sign(
        &self,
        method: &Method,
        resolved: &ResolvedUrl,
        headers: &mut HeaderMap,
        payload_hash: &str,
    ) -> Result<()> {
        let Some(creds) = self.inner.auth.credentials() else {
            return Ok(());
        };

        util::signing::sign_headers(
            method,
            resolved,
            headers,
            payload_hash,
            &self.inner.region,
            creds,
            OffsetDateTime::now_utc(),
        )
    }

    /// Resolves, signs and sends a request with a buffered or empty body.
    pub(crate) fn execute(
        &self,
        method: Method,
        bucket: Option<&str>,
        key: Option<&str>,
        query_params: Vec<(String, String)>,
        mut headers: HeaderMap,
        body: RequestBody<'_>,
    ) -> Result<TransportResponse> {
        #[cfg(feature = "tracing")]
        let _guard = tracing::info_span!(
            "objclient.request",
            method = %method,
            bucket = bucket.unwrap_or(""),
            key = key.unwrap_or(""),
            host = self.inner.endpoint.host_str().unwrap_or(""),
        )
        .entered();

        let resolved = self.resolve(bucket, key, &query_params)?;

        let payload_hash = match &body {
            RequestBody::Empty => util::signing::payload_hash_empty(),
            RequestBody::Bytes(b) => util::signing::payload_hash_bytes(b),
            RequestBody::Reader { .. } => util::signing::UNSIGNED_PAYLOAD.to_string(),
        };
        self.sign(&method, &resolved, &mut headers, &payload_hash)?;

        self.inner.transport.execute(TransportRequest {
            method,
            url: resolved.url,
            headers,
            body,
        })
    }
}

impl ClientBuilder {
    fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|_| Error::invalid_config("endpoint must be a valid absolute URL"))?;

        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(Error::invalid_config(
                "endpoint scheme must be http or https",
            ));
        }
        if endpoint.host_str().is_none() {
            return Err(Error::invalid_config("endpoint must include host"));
        }
        if endpoint.query().is_some() || endpoint.fragment().is_some() {
            return Err(Error::invalid_config(
                "endpoint must not include query or fragment",
            ));
        }
        if endpoint.path() != "/" && !endpoint.path().is_empty() {
            return Err(Error::invalid_config("endpoint must not include a path"));
        }

        Ok(Self {
            endpoint,
            region: None,
            auth: Auth::Anonymous,
            addressing: AddressingStyle::Auto,
            timeout: None,
            user_agent: None,
            transport: None,
        })
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn addressing_style(mut self, style: AddressingStyle) -> Self {
        self.addressing = style;
        self
    }

    /// Global per-request timeout for the default transport. Ignored when a
    /// custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replaces the default `ureq` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client> {
        let region = self
            .region
            .ok_or_else(|| Error::invalid_config("region is required"))
            .and_then(Region::new)?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new(self.user_agent, self.timeout)?),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                endpoint: self.endpoint,
                region,
                auth: self.auth,
                addressing: self.addressing,
                transport,
            }),
        })
    }
}
