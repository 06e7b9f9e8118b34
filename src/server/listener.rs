use std::future::Future;
use std::sync::Arc;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

pub type ServerRequest = Request<ReadHalf<TcpStream>>;
pub type ServerResponse = ResponseWriter<WriteHalf<TcpStream>>;

pub async fn run<H, F, S>(cfg: &Config, handler: H, shutdown: S) -> anyhow::Result<()>
where
    H: Fn(ServerRequest, ServerResponse) -> F + Send + Sync + 'static,
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
    S: Future<Output = ()>,
{
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", cfg.listen_addr);

    serve(listener, cfg.max_header_bytes, handler, shutdown).await
}

/// Accepts connections until `shutdown` resolves, serving each one on its own
/// task.
///
/// The listening socket is closed on return. Connections already accepted
/// keep running on their tasks.
pub async fn serve<H, F, S>(
    listener: TcpListener,
    max_header_bytes: usize,
    handler: H,
    shutdown: S,
) -> anyhow::Result<()>
where
    H: Fn(ServerRequest, ServerResponse) -> F + Send + Sync + 'static,
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
    S: Future<Output = ()>,
{
    let handler = Arc::new(handler);
    tokio::pin!(shutdown);

    loop {
        let (socket, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = &mut shutdown => {
                info!("Listener shutting down");
                return Ok(());
            }
        };
        info!("Accepted connection from {}", peer);

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let conn = Connection::new(socket).with_max_header_bytes(max_header_bytes);
            if let Err(e) = conn.run(|req, res| handler(req, res)).await {
                error!("Connection error from {}: {:#}", peer, e);
            }
        });
    }
}
