mod common;

use std::{io::Write as _, sync::Arc, thread, time::Duration};

use http::StatusCode;

use objclient::{Error, ErrorKind};

use common::{StubTransport, client_with, eventually, md5_hex};

fn crate_error(err: &std::io::Error) -> Error {
    Error::from_io_ref(err)
        .cloned()
        .unwrap_or_else(|| panic!("io error does not carry a crate error: {err:?}"))
}

#[test]
fn hello_upload_succeeds() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    let mut writer = client
        .objects()
        .upload("bucket", "hello.txt", 5)
        .content_md5_hex(md5_hex(b"hello"))
        .begin()
        .unwrap();
    writer.write_all(b"hello").unwrap();
    let out = writer.close().unwrap();

    assert_eq!(out.etag, Some(format!("\"{}\"", md5_hex(b"hello"))));
    assert_eq!(stub.calls(), 1);
    assert_eq!(stub.received("/bucket/hello.txt").unwrap(), b"hello");
}

#[test]
fn empty_upload_succeeds() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    let writer = client.objects().upload("bucket", "empty", 0).begin().unwrap();
    writer.close().unwrap();

    assert_eq!(stub.received("/bucket/empty").unwrap(), b"");
}

#[test]
fn negative_length_fails_before_the_transport_is_called() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    let err = client
        .objects()
        .upload("bucket", "hello.txt", -1)
        .begin()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert_eq!(stub.calls(), 0);
}

#[test]
fn malformed_digest_fails_before_the_transport_is_called() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    for digest in ["not-hex", "d41d8cd98f00b204"] {
        let err = client
            .objects()
            .upload("bucket", "hello.txt", 5)
            .content_md5_hex(digest)
            .begin()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }), "{digest}");
    }
    assert_eq!(stub.calls(), 0);
}

#[test]
fn invalid_destination_fails_before_the_transport_is_called() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    assert!(client.objects().upload("ab", "key", 1).begin().is_err());
    assert!(client.objects().upload("bucket", "", 1).begin().is_err());
    assert!(
        client
            .objects()
            .upload("bucket", "k".repeat(1025), 1)
            .begin()
            .is_err()
    );
    assert_eq!(stub.calls(), 0);
}

#[test]
fn rejected_upload_fails_writes_and_close_with_the_same_error() {
    let stub = Arc::new(StubTransport::reject(StatusCode::FORBIDDEN, "Forbidden"));
    let client = client_with(stub.clone());

    let mut writer = client
        .objects()
        .upload("bucket", "hello.txt", 5)
        .begin()
        .unwrap();

    // Nobody reads the body, so this write stays blocked until the worker
    // has the 403 and closes the pipe with it.
    let first = crate_error(&writer.write(b"hello").unwrap_err());
    let second = crate_error(&writer.write(b"again").unwrap_err());
    let closed = writer.close().unwrap_err();

    match &closed {
        Error::Api {
            status,
            body_snippet,
            ..
        } => {
            assert_eq!(*status, StatusCode::FORBIDDEN);
            assert_eq!(body_snippet.as_deref(), Some("Forbidden"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
    assert_eq!(closed.kind(), ErrorKind::RemoteRejection);
    assert_eq!(first.to_string(), closed.to_string());
    assert_eq!(second.to_string(), closed.to_string());
    assert_eq!(stub.calls(), 1);
}

#[test]
fn transport_failure_is_reported_as_transport_error() {
    let stub = Arc::new(StubTransport::unreachable("connection refused"));
    let client = client_with(stub.clone());

    let writer = client
        .objects()
        .upload("bucket", "hello.txt", 5)
        .begin()
        .unwrap();
    let err = writer.close().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
}

#[test]
fn concurrent_uploads_do_not_mix_bytes_or_outcomes() {
    const UPLOADS: usize = 16;

    let stub = Arc::new(StubTransport::ok().with_jitter());
    let client = client_with(stub.clone());

    let handles = (0..UPLOADS)
        .map(|i| {
            let client = client.clone();
            thread::spawn(move || {
                let payload = format!("upload-{i};").repeat(50 + i * 7).into_bytes();
                let key = format!("objects/{i}");
                let mut writer = client
                    .objects()
                    .upload("bucket", &key, payload.len() as i64)
                    .content_md5_hex(md5_hex(&payload))
                    .begin()
                    .unwrap();
                for chunk in payload.chunks(97) {
                    writer.write_all(chunk).unwrap();
                }
                let out = writer.close().unwrap();
                (key, payload, out)
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let (key, payload, out) = handle.join().unwrap();
        assert_eq!(out.etag, Some(format!("\"{}\"", md5_hex(&payload))));
        assert_eq!(stub.received(&format!("/bucket/{key}")).unwrap(), payload);
    }
    assert_eq!(stub.calls(), UPLOADS);
}

#[test]
fn dropping_the_writer_aborts_the_transfer() {
    let stub = Arc::new(StubTransport::ok());
    let client = client_with(stub.clone());

    let mut writer = client
        .objects()
        .upload("bucket", "partial.bin", 1024)
        .begin()
        .unwrap();
    writer.write_all(b"only a little").unwrap();
    drop(writer);

    let aborted = eventually(Duration::from_secs(5), || {
        stub.body_errors.load(std::sync::atomic::Ordering::SeqCst) == 1
    });
    assert!(aborted);
    assert!(stub.received("/bucket/partial.bin").is_none());
}
