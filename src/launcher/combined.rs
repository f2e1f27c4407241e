// src/launcher/combined.rs

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::mpsc;
use tracing::trace;

/// Bytes forwarded per read from an individual pipe.
const FORWARD_BUFFER: usize = 4096;

/// Chunks queued between the pipe forwarders and the reader.
const QUEUE_DEPTH: usize = 32;

/// Sending half feeding a [`CombinedOutput`].
///
/// An `Err` item is surfaced to the reader as a read error; dropping every
/// sender ends the stream.
pub type ChunkSender = mpsc::Sender<io::Result<Vec<u8>>>;

/// A single readable stream multiplexing several sources.
///
/// Chunks appear in the order the forwarders queued them. Within one source
/// order is preserved; across stdout and stderr it is only as precise as the
/// scheduling of the forwarding tasks.
#[derive(Debug)]
pub struct CombinedOutput {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    offset: usize,
}

impl CombinedOutput {
    /// Create an empty stream plus the sender used to feed it.
    pub fn channel(capacity: usize) -> (ChunkSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let output = Self {
            rx,
            pending: Vec::new(),
            offset: 0,
        };
        (tx, output)
    }

    /// Merge two readers (typically a child's stdout and stderr).
    ///
    /// Spawns one forwarding task per reader, so this must be called from
    /// within a Tokio runtime. The stream ends once both readers hit EOF.
    pub fn merge<A, B>(stdout: A, stderr: B) -> Self
    where
        A: AsyncRead + Send + Unpin + 'static,
        B: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, output) = Self::channel(QUEUE_DEPTH);
        spawn_forwarder("stdout", stdout, tx.clone());
        spawn_forwarder("stderr", stderr, tx);
        output
    }
}

impl AsyncRead for CombinedOutput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        if this.offset >= this.pending.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(bytes)) => {
                    this.pending = bytes;
                    this.offset = 0;
                }
                Some(Err(err)) => return Poll::Ready(Err(err)),
                // Every sender is gone: end of stream.
                None => return Poll::Ready(Ok(())),
            }
        }

        let remaining = &this.pending[this.offset..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.offset += n;
        Poll::Ready(Ok(()))
    }
}

fn spawn_forwarder<R>(source: &'static str, mut reader: R, tx: ChunkSender)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; FORWARD_BUFFER];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
                        // Reader dropped; nobody is listening anymore.
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
        trace!(source, "pipe forwarder finished");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_queued_chunks_then_eof() {
        let (tx, mut output) = CombinedOutput::channel(4);
        tx.send(Ok(b"hello ".to_vec())).await.unwrap();
        tx.send(Ok(b"world".to_vec())).await.unwrap();
        drop(tx);

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn splits_large_chunks_across_small_reads() {
        let (tx, mut output) = CombinedOutput::channel(1);
        tx.send(Ok(b"abcdef".to_vec())).await.unwrap();
        drop(tx);

        let mut buf = [0u8; 4];
        assert_eq!(output.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(output.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(output.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn surfaces_source_errors() {
        let (tx, mut output) = CombinedOutput::channel(1);
        tx.send(Err(io::Error::other("pipe broke"))).await.unwrap();

        let mut buf = [0u8; 8];
        let err = output.read(&mut buf).await.unwrap_err();
        assert_eq!(err.to_string(), "pipe broke");
    }

    #[tokio::test]
    async fn merge_ends_after_both_sources_close() {
        let stdout: &'static [u8] = b"out\n";
        let stderr: &'static [u8] = b"err\n";
        let mut output = CombinedOutput::merge(stdout, stderr);

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        assert_eq!(text.len(), 8);
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }
}
