//! HTTP request adapter.
//!
//! Serves the reviewer UI's JSON API over a plain TCP listener: one
//! request per connection, hand-parsed request head, `Connection: close`.
//! The adapter validates input, calls the shared store, and maps results
//! onto status codes; it holds no state of its own. Every response
//! carries permissive CORS headers so the browser-hosted UI can call in
//! from a different origin.

mod request;
mod response;
mod routes;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use pagemark_store::Store;

use crate::response::Response;

pub struct HttpServer {
    listener: TcpListener,
    store: Store,
}

impl HttpServer {
    /// Bind the adapter to `127.0.0.1:port`. Port 0 asks the OS for a
    /// free port (used by tests); `local_addr` reports the result.
    pub async fn bind(port: u16, store: Store) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind 127.0.0.1:{}", port))?;
        Ok(Self { listener, store })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (socket, _) = self.listener.accept().await?;
            let store = self.store.clone();
            tokio::spawn(async move {
                handle_connection(socket, store).await;
            });
        }
    }
}

async fn handle_connection(mut socket: TcpStream, store: Store) {
    let response = match request::read_request(&mut socket).await {
        Ok(req) => routes::route(&store, &req),
        Err(_) => Response::error(400, "Invalid payload"),
    };

    let _ = socket.write_all(response.to_http().as_bytes()).await;
    let _ = socket.flush().await;
}
