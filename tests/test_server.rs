//! End-to-end tests over loopback TCP.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wirehttp::server::listener::{self, ServerRequest, ServerResponse};

async fn handle(mut req: ServerRequest, mut res: ServerResponse) -> anyhow::Result<()> {
    let method = req.method().to_owned();
    let target = req.target().to_owned();

    match (method.as_str(), target.as_str()) {
        ("GET", "/hello") => {
            let host = req.header("Host").unwrap_or("unknown").to_string();
            res.set_header("Content-Type", "text/plain")?;
            res.end(Some(format!("hello {host}").as_bytes())).await?;
        }
        ("GET", "/stream") => {
            res.write(b"ab").await?;
            res.write(b"cde").await?;
            res.end(None).await?;
        }
        ("POST", "/echo") => {
            let mut body = vec![0u8; req.content_length().unwrap_or(0)];
            req.body().read_exact(&mut body).await?;
            res.end(Some(&body)).await?;
        }
        _ => {
            res.set_status(404)?;
            res.end(None).await?;
        }
    }

    Ok(())
}

async fn start_server(max_header_bytes: usize) -> SocketAddr {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(listener::serve(tcp, max_header_bytes, handle, std::future::pending()));
    addr
}

async fn exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

// The server may reset instead of closing cleanly when it drops a connection
// without answering, so a read error counts as an empty response.
async fn exchange_unanswered(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response).await;
    response
}

#[tokio::test]
async fn test_fixed_length_response() {
    let addr = start_server(1024).await;

    let response = exchange(addr, b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("\r\nContent-Type: text/plain\r\n"));
    assert!(response.contains("\r\nContent-Length: 7\r\n"));
    assert!(response.contains("\r\nDate: "));
    assert!(response.ends_with("\r\n\r\nhello x"));
}

#[tokio::test]
async fn test_chunked_response() {
    let addr = start_server(1024).await;

    let response = exchange(addr, b"GET /stream HTTP/1.1\r\n\r\n").await;

    assert!(response.contains("\r\nTransfer-Encoding: chunked\r\n"));
    assert!(!response.contains("Content-Length"));
    assert!(response.ends_with("\r\n\r\n2\r\nab\r\n3\r\ncde\r\n0\r\n\r\n"));
}

#[tokio::test]
async fn test_request_body_read_through_request() {
    let addr = start_server(1024).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello")
        .await
        .unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    stream.write_all(b" world").await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8(response).unwrap();

    assert!(response.contains("\r\nContent-Length: 11\r\n"));
    assert!(response.ends_with("\r\n\r\nhello world"));
}

#[tokio::test]
async fn test_not_found_response() {
    let addr = start_server(1024).await;

    let response = exchange(addr, b"GET /missing HTTP/1.1\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("\r\nContent-Length: 0\r\n"));
    assert!(response.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_malformed_request_gets_no_response() {
    let addr = start_server(1024).await;

    let response = exchange_unanswered(addr, b"GET /hello HTTP/1.1\r\nno colon here\r\n\r\n").await;

    assert!(response.is_empty());
}

#[tokio::test]
async fn test_oversized_headers_get_no_response() {
    let addr = start_server(64).await;

    let mut request = b"GET /hello HTTP/1.1\r\nX-Big: ".to_vec();
    request.extend(std::iter::repeat_n(b'a', 256));
    request.extend_from_slice(b"\r\n\r\n");

    let response = exchange_unanswered(addr, &request).await;

    assert!(response.is_empty());
}

#[tokio::test]
async fn test_connections_are_independent() {
    let addr = start_server(1024).await;

    let (a, b) = tokio::join!(
        exchange(addr, b"GET /hello HTTP/1.1\r\nHost: a\r\n\r\n"),
        exchange(addr, b"GET /hello HTTP/1.1\r\nHost: b\r\n\r\n"),
    );

    assert!(a.ends_with("hello a"));
    assert!(b.ends_with("hello b"));
}

#[tokio::test]
async fn test_shutdown_signal_stops_listener() {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(listener::serve(tcp, 1024, handle, async {
        let _ = stopped.await;
    }));

    let response = exchange(addr, b"GET /hello HTTP/1.1\r\nHost: up\r\n\r\n").await;
    assert!(response.ends_with("hello up"));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
