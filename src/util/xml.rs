use bytes::Bytes;

use crate::{error::Error, types};

const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

pub(crate) fn parse_error_xml(body: &str) -> Option<types::XmlError> {
    let body = body.trim();
    if !body.starts_with('<') {
        return None;
    }

    quick_xml::de::from_str::<types::XmlError>(body).ok()
}

pub(crate) fn parse_list_objects_v2(body: &str) -> Result<types::ListObjectsV2Output, Error> {
    let parsed = quick_xml::de::from_str::<types::XmlListBucketResult>(body).map_err(|e| {
        Error::decode(
            "failed to parse ListObjectsV2 XML response",
            Some(Box::new(e)),
        )
    })?;
    Ok(types::ListObjectsV2Output::from(parsed))
}

pub(crate) fn encode_create_bucket_configuration(region: &str) -> Result<Bytes, Error> {
    if region.trim().is_empty() {
        return Err(Error::invalid_config(
            "create bucket location constraint must not be empty",
        ));
    }

    #[derive(serde::Serialize)]
    #[serde(rename = "CreateBucketConfiguration")]
    struct XmlCreateBucketConfiguration<'a> {
        #[serde(rename = "@xmlns")]
        xmlns: &'static str,
        #[serde(rename = "LocationConstraint")]
        location_constraint: &'a str,
    }

    let xml = quick_xml::se::to_string(&XmlCreateBucketConfiguration {
        xmlns: S3_XMLNS,
        location_constraint: region,
    })
    .map_err(|e| {
        Error::decode(
            "failed to encode CreateBucketConfiguration XML",
            Some(Box::new(e)),
        )
    })?;
    Ok(Bytes::from(xml))
}
