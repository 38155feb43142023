//! Blocking object storage client with streaming uploads.
//!
//! ## Streaming upload
//!
//! ```no_run
//! # fn demo() -> Result<(), objclient::Error> {
//! use std::io::Write as _;
//!
//! use objclient::{Auth, Client};
//!
//! let client = Client::builder("https://s3.example.com")?
//!     .region("us-east-1")
//!     .auth(Auth::from_env()?)
//!     .build()?;
//!
//! let mut writer = client
//!     .objects()
//!     .upload("my-bucket", "path/to/object.txt", 5)
//!     .content_md5_hex("5d41402abc4b2a76b9719d911017c592")
//!     .begin()?;
//! writer.write_all(b"hello").map_err(|e| {
//!     objclient::Error::from_io_ref(&e)
//!         .cloned()
//!         .unwrap_or_else(|| objclient::Error::io("write failed", e))
//! })?;
//! let out = writer.close()?;
//! println!("etag: {:?}", out.etag);
//! # Ok(())
//! # }
//! ```
//!
//! ## Local or remote, one API
//!
//! ```no_run
//! # fn demo(client: objclient::Client) -> Result<(), objclient::Error> {
//! use objclient::{LocalObject, ObjectClient};
//!
//! let targets: Vec<Box<dyn ObjectClient>> = vec![
//!     Box::new(client.object("my-bucket", "reports/")),
//!     Box::new(LocalObject::new("/var/reports")?),
//! ];
//! for target in &targets {
//!     for item in target.list() {
//!         println!("{}", item?.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(all(
    feature = "rustls",
    feature = "native-tls",
    not(feature = "allow-both-tls")
))]
compile_error!("Enable only one of: rustls, native-tls.");

/// Service entry points and request builders.
pub mod api;
/// Shared request/response types.
pub mod types;

mod auth;
mod backend;
mod client;
mod error;
mod transport;
mod upload;
mod util;

pub use auth::{AddressingStyle, Auth, Credentials, Region};
pub use backend::{LocalObject, ObjectClient, ObjectWriter, RemoteObject};
pub use client::{Client, ClientBuilder};
pub use error::{Error, ErrorKind, Result};
pub use transport::{RequestBody, Transport, TransportRequest, TransportResponse, UreqTransport};
pub use upload::UploadWriter;
