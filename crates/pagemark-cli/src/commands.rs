use anyhow::Result;
use owo_colors::OwoColorize;

use pagemark_http::HttpServer;
use pagemark_store::Store;

use crate::args::Cli;

pub async fn run(cli: Cli) -> Result<()> {
    let store = Store::new();

    if cli.mcp_only {
        eprintln!("{} MCP only, HTTP API disabled", "pagemark".bold());
    } else {
        let server = HttpServer::bind(cli.port, store.clone()).await?;
        let addr = server.local_addr()?;
        eprintln!(
            "{} reviewer API listening on {}",
            "pagemark".bold(),
            format!("http://{}", addr).green()
        );
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                eprintln!("{} HTTP adapter failed: {}", "pagemark".bold(), e.red());
            }
        });
    }

    // Foreground job: serve tools on stdio until the agent runtime
    // closes the channel.
    pagemark_mcp::run_server(store).await
}
