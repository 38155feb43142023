use http::StatusCode;
use time::{
    OffsetDateTime,
    format_description::well_known::{Rfc2822, Rfc3339},
};

use super::{ObjectClient, ObjectWriter, checked_range};
use crate::{
    api,
    client::Client,
    error::{Error, Result},
    types::{ByteStream, GetObjectOutput, Item, ItemKind, ListObjectsV2Output},
};

const DEFAULT_REGION: &str = "us-east-1";

/// One object on an S3-compatible service, created by
/// [`Client::object`](crate::Client::object).
#[derive(Clone, Debug)]
pub struct RemoteObject {
    client: Client,
    bucket: String,
    key: String,
}

impl RemoteObject {
    pub(crate) fn new(client: Client, bucket: String, key: String) -> Self {
        Self {
            client,
            bucket,
            key,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl ObjectClient for RemoteObject {
    fn put(&self, md5_hex: &str, size: i64) -> Result<Box<dyn ObjectWriter>> {
        let writer = self
            .client
            .objects()
            .upload(&self.bucket, &self.key, size)
            .content_md5_hex(md5_hex)
            .begin()?;
        Ok(Box::new(writer))
    }

    fn get(&self) -> Result<GetObjectOutput> {
        self.client.objects().get(&self.bucket, &self.key).send()
    }

    fn get_range(&self, offset: i64, length: i64) -> Result<GetObjectOutput> {
        let (start, len) = checked_range(offset, length)?;
        if len == 0 {
            return Ok(GetObjectOutput {
                body: ByteStream::new(std::io::empty()),
                etag: None,
                content_length: Some(0),
                content_type: None,
            });
        }
        let end = start
            .checked_add(len - 1)
            .ok_or(Error::InvalidRange { offset, length })?;

        match self
            .client
            .objects()
            .get(&self.bucket, &self.key)
            .range_bytes(start, end)
            .send()
        {
            Err(err) if err.status() == Some(StatusCode::RANGE_NOT_SATISFIABLE) => {
                Err(Error::InvalidRange { offset, length })
            }
            other => other,
        }
    }

    fn stat(&self) -> Result<Item> {
        let head = self.client.objects().head(&self.bucket, &self.key).send()?;
        Ok(Item {
            name: self.key.clone(),
            size: head.content_length.unwrap_or(0),
            modified: head
                .last_modified
                .as_deref()
                .and_then(|v| OffsetDateTime::parse(v, &Rfc2822).ok()),
            kind: ItemKind::File,
        })
    }

    fn list(&self) -> Box<dyn Iterator<Item = Result<Item>> + Send> {
        let mut request = self.client.objects().list_v2(&self.bucket);
        if !self.key.is_empty() {
            request = request.prefix(&self.key);
        }

        Box::new(request.pager().flat_map(|page| match page {
            Ok(page) => page_items(page),
            Err(err) => vec![Err(err)],
        }))
    }

    fn make_bucket(&self, acl: &str) -> Result<()> {
        api::validate_acl(acl)?;

        let mut request = self.client.buckets().create(&self.bucket);
        if !acl.is_empty() {
            request = request.acl(acl);
        }
        let region = self.client.region().as_str();
        if region != DEFAULT_REGION {
            request = request.location_constraint(region);
        }
        request.send().map(|_| ())
    }
}

fn page_items(page: ListObjectsV2Output) -> Vec<Result<Item>> {
    let objects = page.contents.into_iter().map(|object| {
        Ok(Item {
            name: object.key,
            size: object.size,
            modified: object
                .last_modified
                .as_deref()
                .and_then(|v| OffsetDateTime::parse(v, &Rfc3339).ok()),
            kind: ItemKind::File,
        })
    });
    let prefixes = page.common_prefixes.into_iter().map(|prefix| {
        Ok(Item {
            name: prefix,
            size: 0,
            modified: None,
            kind: ItemKind::Directory,
        })
    });
    objects.chain(prefixes).collect()
}
