//! Bucket operations.

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::{
    client::Client,
    error::{Error, Result},
    transport::RequestBody,
    types::CreateBucketOutput,
    util,
};

/// Canned ACLs accepted when creating a bucket.
pub(crate) const CANNED_ACLS: [&str; 3] = ["private", "public-read", "public-read-write"];

/// Checks a canned ACL name. Blank means the service default.
pub(crate) fn validate_acl(acl: &str) -> Result<()> {
    if acl.is_empty() || CANNED_ACLS.contains(&acl) {
        return Ok(());
    }
    Err(Error::invalid_config(format!("unsupported bucket acl: {acl:?}")))
}

/// Bucket operations service.
#[derive(Clone)]
pub struct BucketsService {
    client: Client,
}

impl BucketsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Starts a request to create a bucket.
    pub fn create(&self, bucket: impl Into<String>) -> CreateBucketRequest {
        CreateBucketRequest {
            client: self.client.clone(),
            bucket: bucket.into(),
            acl: None,
            location_constraint: None,
        }
    }
}

/// Request builder for creating a bucket.
pub struct CreateBucketRequest {
    client: Client,
    bucket: String,
    acl: Option<String>,
    location_constraint: Option<String>,
}

impl CreateBucketRequest {
    /// Sets a canned ACL: `private`, `public-read` or `public-read-write`.
    pub fn acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    /// Sets the location constraint for bucket creation.
    pub fn location_constraint(mut self, region: impl Into<String>) -> Self {
        self.location_constraint = Some(region.into());
        self
    }

    /// Sends the request.
    pub fn send(self) -> Result<CreateBucketOutput> {
        if !util::url::is_valid_bucket_name(&self.bucket) {
            return Err(Error::invalid_config(format!(
                "invalid bucket name: {:?}",
                self.bucket
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(acl) = self.acl.as_deref().filter(|acl| !acl.is_empty()) {
            validate_acl(acl)?;
            util::headers::insert_checked(&mut headers, HeaderName::from_static("x-amz-acl"), acl)?;
        }

        let body = match self.location_constraint {
            Some(region) => {
                let body = util::xml::encode_create_bucket_configuration(&region)?;
                headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/xml"),
                );
                headers.insert(
                    HeaderName::from_static("content-md5"),
                    util::md5::content_md5_header_value(body.as_ref())?,
                );
                RequestBody::Bytes(body)
            }
            None => RequestBody::Empty,
        };

        let resp = self.client.execute(
            Method::PUT,
            Some(&self.bucket),
            None,
            Vec::new(),
            headers,
            body,
        )?;

        if resp.status == StatusCode::OK || resp.status == StatusCode::NO_CONTENT {
            return Ok(CreateBucketOutput);
        }
        Err(resp.into_error())
    }
}
