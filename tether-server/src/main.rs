use std::env;
use std::net::{SocketAddr, TcpListener};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tether_server::{serve, ServerConfig, State};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut port = 8000;
    if let Some(p) = env::args().nth(1) {
        port = p.parse().with_context(|| format!("invalid port {p}"))?;
    }
    let state = State::open(format!("sled{port}"), ServerConfig::default())?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).with_context(|| format!("binding {addr}"))?;
    serve(listener, state).await
}
