use log::{debug, info};
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{Receiver, Sender};

const PUMP_CHUNK: usize = 256;

/// A byte stream that can be read without blocking.
pub trait ByteSource {
    /// Copies whatever is available into `buf`. `Ok(0)` means nothing is
    /// available right now, an error means the stream is gone for good.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// In-memory source, used for replays and tests.
#[derive(Debug, Default)]
pub struct QueueSource {
    data: VecDeque<u8>,
    closed: bool,
}

impl QueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut source = Self::new();
        source.push(bytes);
        source
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
    }

    /// Once closed and drained the source reports end of stream.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for QueueSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            if self.closed {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "byte source closed"));
            }
            return Ok(0);
        }

        let count = buf.len().min(self.data.len());
        for (slot, byte) in buf.iter_mut().zip(self.data.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

/// Receiving end of a [`pump`] task.
pub struct ChannelSource {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<Vec<u8>>) -> Self {
        Self { receiver, pending: Vec::new(), offset: 0 }
    }
}

impl ByteSource for ChannelSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset >= self.pending.len() {
            match self.receiver.try_recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Err(TryRecvError::Empty) => return Ok(0),
                Err(TryRecvError::Disconnected) => {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "byte stream disconnected"));
                }
            }
        }

        let rest = &self.pending[self.offset..];
        let count = buf.len().min(rest.len());
        buf[..count].copy_from_slice(&rest[..count]);
        self.offset += count;
        Ok(count)
    }
}

/// Copies an async reader into a channel until the reader ends or the
/// receiving side is dropped. Returns the number of bytes forwarded.
pub async fn pump<R: AsyncRead + Unpin>(mut reader: R, sender: Sender<Vec<u8>>) -> io::Result<u64> {
    let mut total = 0u64;
    let mut buf = [0u8; PUMP_CHUNK];
    loop {
        let count = reader.read(&mut buf).await?;
        if count == 0 {
            info!("Byte stream ended after {total} bytes");
            return Ok(total);
        }
        total += count as u64;
        if sender.send(buf[..count].to_vec()).await.is_err() {
            debug!("Receiver dropped, stopping pump");
            return Ok(total);
        }
    }
}
