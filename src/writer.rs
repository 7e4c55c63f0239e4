//! Outbound response writing seam.
//!
//! Pure I/O: the dispatcher hands a successful payload to a
//! [`ResponseWriter`] and propagates any write failure to the connection's
//! own error path without retrying. [`SinkWriter`] adapts any `AsyncWrite`.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

/// Write one response payload to the connection.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Write `payload` and flush.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if writing or flushing fails.
    async fn write(&mut self, payload: Bytes) -> io::Result<()>;
}

/// Response writer over any asynchronous byte sink.
#[derive(Debug)]
pub struct SinkWriter<W> {
    sink: W,
}

impl<W> SinkWriter<W> {
    /// Wrap `sink` in a response writer.
    #[must_use]
    pub fn new(sink: W) -> Self { Self { sink } }

    /// Consume the writer, returning the underlying sink.
    pub fn into_inner(self) -> W { self.sink }
}

#[async_trait]
impl<W> ResponseWriter for SinkWriter<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn write(&mut self, payload: Bytes) -> io::Result<()> {
        self.sink.write_all(&payload).await?;
        self.sink.flush().await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{ResponseWriter, SinkWriter};

    #[tokio::test]
    async fn sink_writer_appends_payload_bytes() {
        let mut writer = SinkWriter::new(Vec::new());
        writer.write(Bytes::from_static(b"one")).await.unwrap();
        writer.write(Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(writer.into_inner(), b"onetwo");
    }
}
