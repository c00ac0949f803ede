//! Streaming object bodies
//!
//! The extractor runs on the blocking pool and writes through a
//! [`BodyWriter`]; the sink reads the paired [`ObjectBody`] chunk by chunk.
//! The channel is bounded, so a slow destination holds the extractor back
//! instead of letting a whole table pile up in memory.
//!
//! A body is complete only once the writer calls [`BodyWriter::finish`]. A
//! writer that aborts, or is dropped unfinished, makes the reader fail, and
//! sinks never commit a failed body.

use futures::Stream;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Bytes buffered before a chunk is handed to the sink
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks in flight between extractor and sink
const CHANNEL_CAPACITY: usize = 4;

enum Frame {
    Data(Vec<u8>),
    End,
    Failed(io::Error),
}

/// Create a connected writer/body pair
pub fn object_body() -> (BodyWriter, ObjectBody) {
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = BodyWriter {
        sender,
        buffer: Vec::with_capacity(CHUNK_SIZE),
        bytes: 0,
    };
    let body = ObjectBody {
        source: Source::Channel { receiver, done: false },
    };
    (writer, body)
}

/// Producer half; blocking, use it from the blocking pool or a plain thread
pub struct BodyWriter {
    sender: mpsc::Sender<Frame>,
    buffer: Vec<u8>,
    bytes: u64,
}

impl BodyWriter {
    fn send(&self, frame: Frame) -> io::Result<()> {
        self.sender.blocking_send(frame).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "object body reader went away")
        })
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(CHUNK_SIZE));
        self.send(Frame::Data(chunk))
    }

    /// Send the buffered tail and mark the body complete
    ///
    /// Returns the total number of bytes written.
    pub fn finish(mut self) -> io::Result<u64> {
        self.send_buffered()?;
        self.send(Frame::End)?;
        Ok(self.bytes)
    }

    /// Fail the body; the sink sees `error` instead of an end of stream
    pub fn abort(self, error: io::Error) {
        // A gone reader has already failed on its own
        let _ = self.send(Frame::Failed(error));
    }
}

impl Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.bytes += buf.len() as u64;
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

enum Source {
    Buffered(Option<Vec<u8>>),
    Channel {
        receiver: mpsc::Receiver<Frame>,
        done: bool,
    },
}

/// Consumer half, handed to [`ObjectSink::put`](super::sink::ObjectSink::put)
pub struct ObjectBody {
    source: Source,
}

impl ObjectBody {
    /// A body that is already in memory
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ObjectBody {
            source: Source::Buffered(Some(bytes.into())),
        }
    }

    /// Next chunk, `Ok(None)` once the body is complete
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        match &mut self.source {
            Source::Buffered(bytes) => Ok(bytes.take().filter(|b| !b.is_empty())),
            Source::Channel { done: true, .. } => Ok(None),
            Source::Channel { receiver, done } => match receiver.recv().await {
                Some(Frame::Data(chunk)) => Ok(Some(chunk)),
                Some(Frame::End) => {
                    *done = true;
                    Ok(None)
                }
                Some(Frame::Failed(error)) => {
                    *done = true;
                    Err(error)
                }
                None => {
                    *done = true;
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "object body ended before it was finished",
                    ))
                }
            },
        }
    }

    /// Drain the whole body into memory
    pub async fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    pub fn into_stream(self) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
        futures::stream::try_unfold(self, |mut body| async move {
            Ok(body.next_chunk().await?.map(|chunk| (chunk, body)))
        })
    }
}
