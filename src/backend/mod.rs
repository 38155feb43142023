//! One object-level API over two storage backends.
//!
//! [`RemoteObject`] talks to an S3-compatible service through a
//! [`Client`](crate::Client); [`LocalObject`] maps the same operations onto
//! the local filesystem. Callers that only hold a `dyn ObjectClient` cannot
//! tell them apart.

use std::io::Write;

use crate::{
    error::{Error, Result},
    types::{GetObjectOutput, Item, PutObjectOutput},
    upload::UploadWriter,
};

mod local;
mod remote;

pub use local::LocalObject;
pub use remote::RemoteObject;

/// Operations on a single object (or directory tree, for `list`).
pub trait ObjectClient: Send + Sync {
    /// Starts writing exactly `size` bytes. `md5_hex` is an optional hex
    /// digest of the full body; pass `""` to skip the integrity check.
    fn put(&self, md5_hex: &str, size: i64) -> Result<Box<dyn ObjectWriter>>;

    fn get(&self) -> Result<GetObjectOutput>;

    /// Reads `length` bytes starting at `offset`.
    fn get_range(&self, offset: i64, length: i64) -> Result<GetObjectOutput>;

    fn stat(&self) -> Result<Item>;

    /// Lists everything below this object's name, lazily.
    fn list(&self) -> Box<dyn Iterator<Item = Result<Item>> + Send>;

    /// Creates the container this object lives in. `acl` is one of `""`,
    /// `private`, `public-read` or `public-read-write`.
    fn make_bucket(&self, acl: &str) -> Result<()>;
}

/// Write side of [`ObjectClient::put`].
pub trait ObjectWriter: Write + Send {
    /// Finishes the write and reports the outcome.
    fn close(self: Box<Self>) -> Result<PutObjectOutput>;
}

impl ObjectWriter for UploadWriter {
    fn close(self: Box<Self>) -> Result<PutObjectOutput> {
        UploadWriter::close(*self)
    }
}

/// Rejects negative offsets and lengths.
fn checked_range(offset: i64, length: i64) -> Result<(u64, u64)> {
    match (u64::try_from(offset), u64::try_from(length)) {
        (Ok(offset), Ok(length)) => Ok((offset, length)),
        _ => Err(Error::InvalidRange { offset, length }),
    }
}
