//! Object operations.

use http::{HeaderMap, Method};

use crate::{
    client::Client,
    error::Result,
    transport::RequestBody,
    types::{ByteStream, GetObjectOutput, HeadObjectOutput, ListObjectsV2Output},
    upload::{self, TransferDescriptor, UploadWriter},
    util,
};

/// Object operations service.
#[derive(Clone)]
pub struct ObjectsService {
    client: Client,
}

impl ObjectsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Starts a streaming upload of exactly `content_length` bytes.
    ///
    /// A negative length is rejected by [`UploadRequest::begin`].
    pub fn upload(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        content_length: i64,
    ) -> UploadRequest {
        UploadRequest {
            client: self.client.clone(),
            descriptor: TransferDescriptor {
                bucket: bucket.into(),
                key: key.into(),
                content_length,
                ..TransferDescriptor::default()
            },
        }
    }

    /// Starts a request to GET an object.
    pub fn get(&self, bucket: impl Into<String>, key: impl Into<String>) -> GetObjectRequest {
        GetObjectRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
            range: None,
        }
    }

    /// Starts a request to HEAD an object.
    pub fn head(&self, bucket: impl Into<String>, key: impl Into<String>) -> HeadObjectRequest {
        HeadObjectRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Starts a ListObjectsV2 request.
    pub fn list_v2(&self, bucket: impl Into<String>) -> ListObjectsV2Request {
        ListObjectsV2Request {
            client: self.client.clone(),
            bucket: bucket.into(),
            prefix: None,
            delimiter: None,
            continuation_token: None,
            start_after: None,
            max_keys: None,
        }
    }
}

/// Request builder for a streaming upload.
pub struct UploadRequest {
    client: Client,
    descriptor: TransferDescriptor,
}

impl UploadRequest {
    /// Hex MD5 of the full body, sent as `Content-MD5`. Blank means none.
    pub fn content_md5_hex(mut self, value: impl Into<String>) -> Self {
        self.descriptor.content_md5_hex = Some(value.into());
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.descriptor.content_type = Some(value.into());
        self
    }

    /// Adds a user metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.metadata.push((key.into(), value.into()));
        self
    }

    /// Validates the request and starts the transfer.
    pub fn begin(self) -> Result<UploadWriter> {
        upload::begin(&self.client, self.descriptor)
    }
}

/// Request builder for fetching an object.
pub struct GetObjectRequest {
    client: Client,
    bucket: String,
    key: String,
    range: Option<String>,
}

impl GetObjectRequest {
    /// Sets an inclusive byte range.
    pub fn range_bytes(mut self, start: u64, end_inclusive: u64) -> Self {
        self.range = Some(format!("bytes={start}-{end_inclusive}"));
        self
    }

    /// Sends the request.
    pub fn send(self) -> Result<GetObjectOutput> {
        let mut headers = HeaderMap::new();
        if let Some(range) = self.range {
            util::headers::insert_checked(&mut headers, http::header::RANGE, &range)?;
        }

        let resp = self.client.execute(
            Method::GET,
            Some(&self.bucket),
            Some(&self.key),
            Vec::new(),
            headers,
            RequestBody::Empty,
        )?;

        if !resp.status.is_success() {
            return Err(resp.into_error());
        }

        Ok(GetObjectOutput {
            etag: util::headers::header_string(&resp.headers, http::header::ETAG),
            content_length: util::headers::header_u64(&resp.headers, http::header::CONTENT_LENGTH),
            content_type: util::headers::header_string(&resp.headers, http::header::CONTENT_TYPE),
            body: ByteStream::new(resp.body),
        })
    }
}

/// Request builder for fetching object metadata via HEAD.
pub struct HeadObjectRequest {
    client: Client,
    bucket: String,
    key: String,
}

impl HeadObjectRequest {
    /// Sends the request.
    pub fn send(self) -> Result<HeadObjectOutput> {
        let resp = self.client.execute(
            Method::HEAD,
            Some(&self.bucket),
            Some(&self.key),
            Vec::new(),
            HeaderMap::new(),
            RequestBody::Empty,
        )?;

        if !resp.status.is_success() {
            return Err(resp.into_error());
        }

        Ok(HeadObjectOutput {
            etag: util::headers::header_string(&resp.headers, http::header::ETAG),
            content_length: util::headers::header_u64(&resp.headers, http::header::CONTENT_LENGTH),
            content_type: util::headers::header_string(&resp.headers, http::header::CONTENT_TYPE),
            last_modified: util::headers::header_string(
                &resp.headers,
                http::header::LAST_MODIFIED,
            ),
        })
    }
}

/// Request builder for ListObjectsV2.
#[derive(Clone)]
pub struct ListObjectsV2Request {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    delimiter: Option<String>,
    continuation_token: Option<String>,
    start_after: Option<String>,
    max_keys: Option<u32>,
}

impl ListObjectsV2Request {
    /// Filters by key prefix.
    pub fn prefix(mut self, value: impl Into<String>) -> Self {
        self.prefix = Some(value.into());
        self
    }

    /// Groups keys by delimiter.
    pub fn delimiter(mut self, value: impl Into<String>) -> Self {
        self.delimiter = Some(value.into());
        self
    }

    /// Sets the continuation token for pagination.
    pub fn continuation_token(mut self, value: impl Into<String>) -> Self {
        self.continuation_token = Some(value.into());
        self
    }

    /// Starts listing after the given key.
    pub fn start_after(mut self, value: impl Into<String>) -> Self {
        self.start_after = Some(value.into());
        self
    }

    /// Sets the maximum number of keys to return.
    pub fn max_keys(mut self, value: u32) -> Self {
        self.max_keys = Some(value);
        self
    }

    /// Converts this request into a pager that follows continuation tokens.
    pub fn pager(self) -> ListObjectsV2Pager {
        ListObjectsV2Pager {
            request: self,
            done: false,
        }
    }

    /// Sends the request.
    pub fn send(self) -> Result<ListObjectsV2Output> {
        let mut query = vec![("list-type".to_string(), "2".to_string())];
        if let Some(v) = self.prefix {
            query.push(("prefix".to_string(), v));
        }
        if let Some(v) = self.delimiter {
            query.push(("delimiter".to_string(), v));
        }
        if let Some(v) = self.continuation_token {
            query.push(("continuation-token".to_string(), v));
        }
        if let Some(v) = self.start_after {
            query.push(("start-after".to_string(), v));
        }
        if let Some(v) = self.max_keys {
            query.push(("max-keys".to_string(), v.to_string()));
        }

        let resp = self.client.execute(
            Method::GET,
            Some(&self.bucket),
            None,
            query,
            HeaderMap::new(),
            RequestBody::Empty,
        )?;

        if !resp.status.is_success() {
            return Err(resp.into_error());
        }

        let xml = resp.body_string()?;
        util::xml::parse_list_objects_v2(&xml)
    }
}

/// Pager for ListObjectsV2 responses.
///
/// Yields one page per request and stops after the first untruncated page
/// or the first error.
pub struct ListObjectsV2Pager {
    request: ListObjectsV2Request,
    done: bool,
}

impl Iterator for ListObjectsV2Pager {
    type Item = Result<ListObjectsV2Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut page = self.request.clone();
        if page.continuation_token.is_some() {
            page.start_after = None;
        }

        match page.send() {
            Ok(page) => {
                self.request.continuation_token = page.next_continuation_token.clone();
                if !page.is_truncated || page.next_continuation_token.is_none() {
                    self.done = true;
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
