use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::http::headers::Headers;
use crate::http::request::{Body, Request, RequestHead};

/// Blank line ending the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Default cap on buffered header bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("connection closed before the header block was complete")]
    IncompleteRequest,

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("header block exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads from `reader` until the header block is complete and parses it.
///
/// Bytes received after the terminator are kept in the returned request's
/// [`Body`], ahead of anything still unread on the connection.
pub async fn read_request<R>(mut reader: R, max_header_bytes: usize) -> Result<Request<R>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    let mut scanned = 0;

    loop {
        if let Some(headers_end) = find_headers_end(&buffer, scanned) {
            if headers_end > max_header_bytes {
                return Err(ParseError::HeadersTooLarge { limit: max_header_bytes });
            }

            let block = buffer.split_to(headers_end);
            buffer.advance(HEADER_TERMINATOR.len());

            let head = parse_head(&block)?;
            debug!(
                method = %head.method,
                target = %head.target,
                headers = head.headers.len(),
                leftover = buffer.len(),
                "parsed request head"
            );
            return Ok(Request::new(head, Body::new(buffer, reader)));
        }

        if buffer.len() > max_header_bytes {
            return Err(ParseError::HeadersTooLarge { limit: max_header_bytes });
        }

        // A terminator may straddle the previous read boundary.
        scanned = buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);

        buffer.reserve(READ_CHUNK);
        let n = reader.read_buf(&mut buffer).await?;

        if n == 0 {
            return Err(ParseError::IncompleteRequest);
        }
    }
}

/// Parses a header block (everything before the terminator).
///
/// The start line is split on single spaces: the first field is the method,
/// the second the target, the rest is ignored. A missing target is left
/// empty. Header names are kept as written, values are trimmed and a repeated
/// name overwrites the earlier value.
pub fn parse_head(block: &[u8]) -> Result<RequestHead, ParseError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");

    let start_line = lines.next().unwrap_or_default();
    let mut parts = start_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Headers::new();

    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;

        headers.set(name, value.trim());
    }

    Ok(RequestHead { method, target, headers })
}

fn find_headers_end(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| from + pos)
}
