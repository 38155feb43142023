//! Streaming uploads.
//!
//! [`begin`] validates an upload up front, then starts one worker thread that
//! pushes a single PUT through the client's transport while the caller writes
//! into an [`UploadWriter`]. Bytes flow through an unbuffered [`pipe`], so the
//! caller can never run ahead of the network. The worker's verdict is
//! published through a [`gate`] that [`UploadWriter::close`] waits on.

use std::{
    fmt, io,
    thread::{self, JoinHandle},
};

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::{
    client::Client,
    error::{Error, Result},
    transport::{RequestBody, TransportRequest},
    types::PutObjectOutput,
    util::{self, url::ResolvedUrl},
};

pub(crate) mod gate;
pub(crate) mod pipe;

use gate::{CompletionGate, Resolver};
use pipe::{PipeReader, PipeWriter};

const WORKER_NAME: &str = "objclient-upload";

/// Everything needed to start one upload. Fixed once the upload begins.
#[derive(Clone, Debug, Default)]
pub(crate) struct TransferDescriptor {
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) content_length: i64,
    pub(crate) content_md5_hex: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) metadata: Vec<(String, String)>,
}

/// A validated upload, ready for the worker.
struct PreparedUpload {
    client: Client,
    bucket: String,
    key: String,
    resolved: ResolvedUrl,
    headers: HeaderMap,
    content_length: u64,
}

/// Validates `descriptor` and starts the upload worker.
///
/// Every input error is reported here, before a pipe or thread exists and
/// before the transport sees any request.
pub(crate) fn begin(client: &Client, descriptor: TransferDescriptor) -> Result<UploadWriter> {
    let prepared = prepare(client, descriptor)?;

    let (writer, reader) = pipe::pipe();
    let (resolver, gate) = gate::gate();

    let worker = thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(move || run(prepared, reader, resolver))
        .map_err(|e| Error::transport("failed to spawn upload worker", Some(Box::new(e))))?;

    Ok(UploadWriter {
        pipe: Some(writer),
        gate,
        worker: Some(worker),
    })
}

fn prepare(client: &Client, descriptor: TransferDescriptor) -> Result<PreparedUpload> {
    let TransferDescriptor {
        bucket,
        key,
        content_length,
        content_md5_hex,
        content_type,
        metadata,
    } = descriptor;

    util::url::validate_destination(&bucket, &key)?;

    let content_length = u64::try_from(content_length).map_err(|_| {
        Error::invalid_config(format!(
            "content length must not be negative, got {content_length}"
        ))
    })?;

    let content_md5 = match content_md5_hex.as_deref() {
        Some(hex) => util::md5::content_md5_from_hex(hex)?,
        None => None,
    };

    let resolved = client.resolve(Some(&bucket), Some(&key), &[])?;

    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Some(value) = content_md5 {
        headers.insert(HeaderName::from_static("content-md5"), value);
    }
    if let Some(value) = content_type {
        util::headers::insert_checked(&mut headers, http::header::CONTENT_TYPE, &value)?;
    }
    for (name, value) in metadata {
        let name = util::redact::metadata_header_name(&name)?;
        util::headers::insert_checked(&mut headers, name, &value)?;
    }

    Ok(PreparedUpload {
        client: client.clone(),
        bucket,
        key,
        resolved,
        headers,
        content_length,
    })
}

fn run(upload: PreparedUpload, mut reader: PipeReader, resolver: Resolver) {
    #[cfg(feature = "tracing")]
    let _guard = tracing::debug_span!(
        "objclient.upload",
        bucket = %upload.bucket,
        key = %upload.key,
        content_length = upload.content_length,
    )
    .entered();
    #[cfg(not(feature = "tracing"))]
    let _ = (&upload.bucket, &upload.key);

    let outcome = transfer(upload, &mut reader);

    #[cfg(feature = "tracing")]
    match &outcome {
        Ok(out) => tracing::debug!(bytes = reader.consumed(), etag = ?out.etag, "upload complete"),
        Err(err) => tracing::debug!(bytes = reader.consumed(), error = %err, "upload failed"),
    }
    #[cfg(feature = "metrics")]
    metrics::counter!(
        "objclient_uploads_total",
        "outcome" => if outcome.is_ok() { "ok" } else { "error" },
    )
    .increment(1);

    // Release the writer before publishing, so a blocked write never outlives
    // the outcome.
    match &outcome {
        Ok(_) => reader.close(),
        Err(err) => reader.close_with_error(err.clone()),
    }
    resolver.resolve(outcome);
}

fn transfer(upload: PreparedUpload, reader: &mut PipeReader) -> Result<PutObjectOutput> {
    let PreparedUpload {
        client,
        resolved,
        mut headers,
        content_length,
        ..
    } = upload;

    client.sign(
        &Method::PUT,
        &resolved,
        &mut headers,
        util::signing::UNSIGNED_PAYLOAD,
    )?;

    let resp = client.transport().execute(TransportRequest {
        method: Method::PUT,
        url: resolved.url,
        headers,
        body: RequestBody::Reader {
            reader,
            content_length,
        },
    })?;

    if resp.status != StatusCode::OK {
        return Err(resp.into_error());
    }

    Ok(PutObjectOutput {
        etag: util::headers::header_string(&resp.headers, http::header::ETAG),
    })
}

/// Caller side of a streaming upload.
///
/// Each `write` returns once the worker has taken the bytes, or fails with
/// the upload's error once the worker has given up. Call [`close`] to finish
/// the upload and learn its outcome. Dropping the writer without closing it
/// aborts the upload.
///
/// [`close`]: UploadWriter::close
pub struct UploadWriter {
    pipe: Option<PipeWriter>,
    gate: CompletionGate,
    worker: Option<JoinHandle<()>>,
}

impl UploadWriter {
    /// Ends the stream and blocks until the upload has finished.
    ///
    /// Every call path of an upload ends here with the same outcome the
    /// worker recorded.
    pub fn close(mut self) -> Result<PutObjectOutput> {
        if let Some(pipe) = self.pipe.take() {
            pipe.close();
        }
        let outcome = self.gate.wait();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        outcome
    }

    /// The upload's outcome if the worker has already finished.
    pub fn outcome(&self) -> Option<Result<PutObjectOutput>> {
        self.gate.try_get()
    }
}

impl io::Write for UploadWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(pipe) = self.pipe.as_ref() else {
            return Err(Error::closed_pipe("write on closed upload").into_io());
        };
        pipe.write(buf).map_err(Error::into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        if let Some(pipe) = self.pipe.take() {
            pipe.close_with_error(Error::closed_pipe("upload writer dropped before close"));
        }
    }
}

impl fmt::Debug for UploadWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadWriter")
            .field("open", &self.pipe.is_some())
            .field("finished", &self.gate.try_get().is_some())
            .finish()
    }
}
