use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, ReadBuf};

use crate::http::headers::Headers;

/// Start line and header block of a parsed request.
///
/// Only the method and target are taken from the start line; any further
/// fields (such as the protocol version) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: Headers,
}

/// Read side of a connection after the header block has been consumed.
///
/// Bytes that arrived together with the header block are handed out first,
/// then reads go straight to the connection.
#[derive(Debug)]
pub struct Body<R> {
    buffered: BytesMut,
    inner: R,
}

impl<R> Body<R> {
    pub fn new(buffered: BytesMut, inner: R) -> Self {
        Self { buffered, inner }
    }

    /// Bytes already received but not yet read.
    pub fn buffered(&self) -> &[u8] {
        &self.buffered
    }

    /// Returns the connection read half, dropping any unread buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Body<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.buffered.has_remaining() {
            let n = this.buffered.len().min(buf.remaining());
            buf.put_slice(&this.buffered[..n]);
            this.buffered.advance(n);
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

/// A parsed HTTP request bound to the connection it arrived on.
#[derive(Debug)]
pub struct Request<R> {
    head: RequestHead,
    body: Body<R>,
}

impl<R> Request<R> {
    pub fn new(head: RequestHead, body: Body<R>) -> Self {
        Self { head, body }
    }

    pub fn method(&self) -> &str {
        &self.head.method
    }

    /// The request target (path plus optional query).
    pub fn target(&self) -> &str {
        &self.head.target
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    /// Retrieves a header value by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    /// Parses the Content-Length header, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.head
            .headers
            .get_ignore_case("Content-Length")
            .and_then(|v| v.parse().ok())
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    /// Reader for the remainder of the inbound stream.
    pub fn body(&mut self) -> &mut Body<R> {
        &mut self.body
    }

    pub fn into_body(self) -> Body<R> {
        self.body
    }

    pub fn into_parts(self) -> (RequestHead, Body<R>) {
        (self.head, self.body)
    }
}
