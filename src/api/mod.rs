mod buckets;
mod objects;

pub(crate) use buckets::validate_acl;
pub use buckets::{BucketsService, CreateBucketRequest};
pub use objects::{
    GetObjectRequest, HeadObjectRequest, ListObjectsV2Pager, ListObjectsV2Request,
    ObjectsService, UploadRequest,
};
