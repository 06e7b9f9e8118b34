use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::http::date;
use crate::http::headers::Headers;
use crate::http::status::{StatusCode, UnknownStatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";
const CHUNKED_TERMINATOR: &[u8] = b"0\r\n\r\n";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    UnknownStatusCode(#[from] UnknownStatusCode),

    #[error("protocol misuse: {0}")]
    ProtocolMisuse(&'static str),

    #[error("I/O error while writing response: {0}")]
    Io(#[from] std::io::Error),
}

/// How body bytes are framed once the header block has gone out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// `Content-Length` was declared; `remaining` is `None` when its value
    /// is not a number this writer can track.
    Fixed { remaining: Option<u64> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Unsent,
    HeadersSent(Framing),
    Closed,
}

/// Streams one HTTP response onto a connection's write half.
///
/// Status and headers can be changed until the header block is sent, which
/// happens on the first of `send_headers`, `write` or `end`. At that point the
/// framing is fixed: `Content-Length` if the caller set one, chunked
/// otherwise. `end` finishes the body and shuts the write side down.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    stream: W,
    status: u16,
    headers: Headers,
    state: WriterState,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream,
            status: StatusCode::OK.as_u16(),
            headers: Headers::new(),
            state: WriterState::Unsent,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Records the status code used when headers are sent.
    ///
    /// The code is checked against the reason-phrase table at send time.
    pub fn set_status(&mut self, code: u16) -> Result<(), WriteError> {
        self.ensure_unsent("status changed after headers were sent")?;
        self.status = code;
        Ok(())
    }

    /// Records or overwrites a response header.
    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), WriteError> {
        self.ensure_unsent("header set after headers were sent")?;
        self.headers.set(name, value);
        Ok(())
    }

    /// Sends the header block with the current status and headers.
    pub async fn send_headers(&mut self) -> Result<(), WriteError> {
        self.send_headers_with(None, Headers::new()).await
    }

    /// Sends the header block, optionally overriding the status and merging
    /// `extra` into the recorded headers first.
    ///
    /// Once headers are out, further calls do nothing.
    pub async fn send_headers_with(
        &mut self,
        status: Option<u16>,
        extra: Headers,
    ) -> Result<(), WriteError> {
        match self.state {
            WriterState::HeadersSent(_) => Ok(()),
            WriterState::Closed => Err(WriteError::ProtocolMisuse("headers sent after response ended")),
            WriterState::Unsent => self.write_head(status, extra).await.map(|_| ()),
        }
    }

    /// Writes part of the body, sending headers first if needed.
    ///
    /// In chunked mode an empty chunk is skipped, since a zero-size frame
    /// would terminate the body.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        match self.framing().await? {
            Framing::Chunked => {
                if chunk.is_empty() {
                    return Ok(());
                }
                self.stream.write_all(&encode_chunk(chunk)).await?;
            }
            Framing::Fixed { remaining } => {
                let remaining = match remaining {
                    Some(left) => Some(
                        left.checked_sub(chunk.len() as u64)
                            .ok_or(WriteError::ProtocolMisuse("body exceeds Content-Length"))?,
                    ),
                    None => None,
                };
                self.stream.write_all(chunk).await?;
                self.state = WriterState::HeadersSent(Framing::Fixed { remaining });
            }
        }

        Ok(())
    }

    /// Finishes the response and shuts down the write side.
    ///
    /// If headers have not been sent and no `Content-Length` was set, the
    /// length of `chunk` is declared so the body goes out unframed.
    pub async fn end(&mut self, chunk: Option<&[u8]>) -> Result<(), WriteError> {
        match self.state {
            WriterState::Closed => {
                return Err(WriteError::ProtocolMisuse("response already ended"));
            }
            WriterState::Unsent => {
                // Reject an unknown status before touching the headers.
                StatusCode::try_from(self.status)?;
                if self.headers.get_ignore_case("Content-Length").is_none() {
                    let length = chunk.map_or(0, |c| c.len());
                    self.headers.set("Content-Length", length.to_string());
                }
                self.send_headers().await?;
            }
            WriterState::HeadersSent(_) => {}
        }

        if let Some(chunk) = chunk {
            self.write(chunk).await?;
        }

        match self.state {
            WriterState::HeadersSent(Framing::Chunked) => {
                self.stream.write_all(CHUNKED_TERMINATOR).await?;
            }
            WriterState::HeadersSent(Framing::Fixed { remaining: Some(left) }) if left > 0 => {
                warn!(missing = left, "response ended short of its Content-Length");
            }
            _ => {}
        }

        self.state = WriterState::Closed;
        self.stream.shutdown().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    /// Current framing, sending the header block first if it is still unsent.
    async fn framing(&mut self) -> Result<Framing, WriteError> {
        match self.state {
            WriterState::HeadersSent(framing) => Ok(framing),
            WriterState::Closed => Err(WriteError::ProtocolMisuse("write after response ended")),
            WriterState::Unsent => self.write_head(None, Headers::new()).await,
        }
    }

    async fn write_head(&mut self, status: Option<u16>, extra: Headers) -> Result<Framing, WriteError> {
        let code = status.unwrap_or(self.status);
        let status = StatusCode::try_from(code)?;
        self.status = code;

        for (name, value) in extra.iter() {
            self.headers.set(name, value);
        }
        self.headers.remove_ignore_case("Date");
        self.headers.set("Date", date::now());

        let framing = match self.headers.get_ignore_case("Content-Length") {
            Some(length) => {
                let remaining = length.parse().ok();
                self.headers.remove_ignore_case("Transfer-Encoding");
                Framing::Fixed { remaining }
            }
            None => {
                self.headers.remove_ignore_case("Transfer-Encoding");
                self.headers.set("Transfer-Encoding", "chunked");
                Framing::Chunked
            }
        };

        let block = serialize_head(status, &self.headers);
        self.stream.write_all(&block).await?;
        self.state = WriterState::HeadersSent(framing);

        debug!(status = code, ?framing, "response headers sent");
        Ok(framing)
    }

    fn ensure_unsent(&self, what: &'static str) -> Result<(), WriteError> {
        match self.state {
            WriterState::Unsent => Ok(()),
            _ => Err(WriteError::ProtocolMisuse(what)),
        }
    }
}

impl<W> Drop for ResponseWriter<W> {
    fn drop(&mut self) {
        if self.state != WriterState::Closed {
            warn!(state = ?self.state, "response writer dropped before end()");
        }
    }
}

fn serialize_head(status: StatusCode, headers: &Headers) -> Vec<u8> {
    let mut buf = Vec::new();

    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

fn encode_chunk(chunk: &[u8]) -> Vec<u8> {
    let size_line = format!("{:x}\r\n", chunk.len());
    let mut frame = Vec::with_capacity(size_line.len() + chunk.len() + 2);
    frame.extend_from_slice(size_line.as_bytes());
    frame.extend_from_slice(chunk);
    frame.extend_from_slice(b"\r\n");
    frame
}
