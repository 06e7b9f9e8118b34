use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use wirehttp::config::Config;
use wirehttp::server::listener::{self, ServerRequest, ServerResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    };

    listener::run(&cfg, handle, shutdown).await?;

    Ok(())
}

// Demo routes: a fixed body, a streamed body and an echo of the request body.
async fn handle(mut req: ServerRequest, mut res: ServerResponse) -> anyhow::Result<()> {
    let method = req.method().to_owned();
    let target = req.target().to_owned();

    match (method.as_str(), target.as_str()) {
        ("GET", "/") => {
            res.set_header("Content-Type", "text/plain")?;
            res.end(Some(b"Hello from wirehttp\n")).await?;
        }
        ("GET", "/stream") => {
            res.set_header("Content-Type", "text/plain")?;
            for i in 1..=3 {
                res.write(format!("part {i}\n").as_bytes()).await?;
            }
            res.end(None).await?;
        }
        ("POST", "/echo") => {
            let length = req.content_length().unwrap_or(0);
            let mut body = vec![0u8; length];
            req.body().read_exact(&mut body).await?;
            res.end(Some(&body)).await?;
        }
        _ => {
            res.set_status(404)?;
            res.end(Some(b"404 Not Found")).await?;
        }
    }

    Ok(())
}
