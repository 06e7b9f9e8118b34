//! HTTP/1.1 protocol layer.
//!
//! Serves exactly one request/response exchange per connection.
//!
//! # Architecture
//!
//! - **`parser`**: reads bytes until the header terminator and parses the request head
//! - **`request`**: the parsed request and the buffered body reader left behind
//! - **`writer`**: response framing (fixed-length or chunked) over the write half
//! - **`connection`**: glue that runs parser, writer and the caller's handler
//! - **`headers`**: ordered header map used on both sides
//! - **`status`**: status code and reason-phrase table
//! - **`date`**: HTTP date formatting
//!
//! # Response Writer States
//!
//! ```text
//!        ┌─────────────┐
//!        │   Unsent    │ ← set_status / set_header allowed
//!        └──────┬──────┘
//!               │ send_headers, write or end
//!               ▼
//!        ┌────────────────────────────┐
//!        │ HeadersSent(Chunked|Fixed) │ ← write body bytes
//!        └──────┬─────────────────────┘
//!               │ end
//!               ▼
//!        ┌─────────────┐
//!        │   Closed    │ ← everything else is ProtocolMisuse
//!        └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use wirehttp::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         tokio::spawn(async move {
//!             let result = Connection::new(socket)
//!                 .run(|_req, mut res| async move {
//!                     res.end(Some(b"hello\n")).await?;
//!                     Ok(())
//!                 })
//!                 .await;
//!             if let Err(e) = result {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod date;
pub mod headers;
pub mod parser;
pub mod request;
pub mod status;
pub mod writer;
