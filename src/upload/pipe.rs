//! Unbuffered in-process byte pipe.
//!
//! Every write is handed to the reader through a zero-capacity channel, so a
//! write returns only once the reader has taken the bytes. A slow consumer
//! therefore slows the producer down in lock-step.

use std::{
    io,
    sync::{
        Arc, OnceLock,
        mpsc::{self, Receiver, SyncSender},
    },
};

use bytes::{Buf as _, Bytes};

use crate::error::{Error, Result};

struct Shared {
    /// Why the read side stopped; every later or blocked write fails with it.
    reader_closed: OnceLock<Error>,
    /// Why the write side aborted; the reader fails with it once drained.
    writer_closed: OnceLock<Error>,
}

/// Creates a connected writer/reader pair.
pub(crate) fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::sync_channel(0);
    let shared = Arc::new(Shared {
        reader_closed: OnceLock::new(),
        writer_closed: OnceLock::new(),
    });

    (
        PipeWriter {
            tx,
            shared: Arc::clone(&shared),
        },
        PipeReader {
            rx,
            pending: Bytes::new(),
            consumed: 0,
            shared,
        },
    )
}

pub(crate) struct PipeWriter {
    tx: SyncSender<Bytes>,
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Blocks until the reader takes `buf`, or fails with the reader's
    /// recorded error.
    pub(crate) fn write(&self, buf: &[u8]) -> Result<usize> {
        if let Some(err) = self.shared.reader_closed.get() {
            return Err(err.clone());
        }
        // An empty chunk would read as end of stream.
        if buf.is_empty() {
            return Ok(0);
        }

        match self.tx.send(Bytes::copy_from_slice(buf)) {
            Ok(()) => Ok(buf.len()),
            Err(_) => Err(self.reader_error()),
        }
    }

    fn reader_error(&self) -> Error {
        self.shared
            .reader_closed
            .get()
            .cloned()
            .unwrap_or_else(|| Error::closed_pipe("upload pipe reader went away"))
    }

    /// Signals end of stream.
    pub(crate) fn close(self) {}

    /// Aborts the stream; the reader's next read after draining fails with `err`.
    pub(crate) fn close_with_error(self, err: Error) {
        let _ = self.shared.writer_closed.set(err);
    }
}

pub(crate) struct PipeReader {
    rx: Receiver<Bytes>,
    pending: Bytes,
    consumed: u64,
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Total bytes handed out through `read`.
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Stops reading; writes from now on fail with [`Error::ClosedPipe`].
    pub(crate) fn close(self) {
        let _ = self
            .shared
            .reader_closed
            .set(Error::closed_pipe("write on closed upload pipe"));
    }

    /// Stops reading; writes from now on, and any write blocked right now,
    /// fail with `err`.
    pub(crate) fn close_with_error(self, err: Error) {
        let _ = self.shared.reader_closed.set(err);
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => {
                    return match self.shared.writer_closed.get() {
                        Some(err) => Err(err.clone().into_io()),
                        None => Ok(0),
                    };
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        self.consumed += n as u64;
        Ok(n)
    }
}
