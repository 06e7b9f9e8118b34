use std::future::Future;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tracing::info;

use crate::http::parser::{read_request, DEFAULT_MAX_HEADER_BYTES};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// One accepted connection serving a single request/response exchange.
///
/// The connection parses the request, binds a [`ResponseWriter`] to the same
/// stream and hands both to the handler. If the request cannot be parsed the
/// handler is not called and nothing is written back.
pub struct Connection<S> {
    stream: S,
    max_header_bytes: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }

    pub fn with_max_header_bytes(mut self, limit: usize) -> Self {
        self.max_header_bytes = limit;
        self
    }

    pub async fn run<H, F>(self, handler: H) -> anyhow::Result<()>
    where
        H: FnOnce(Request<ReadHalf<S>>, ResponseWriter<WriteHalf<S>>) -> F,
        F: Future<Output = anyhow::Result<()>>,
    {
        let (reader, writer) = tokio::io::split(self.stream);

        let request = read_request(reader, self.max_header_bytes)
            .await
            .context("HTTP parse error")?;
        info!(method = request.method(), target = request.target(), "request");

        handler(request, ResponseWriter::new(writer)).await
    }
}
