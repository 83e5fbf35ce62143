use clap::Parser;

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(about = "Review annotations for coding agents: HTTP API for the browser, MCP tools for the agent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Port for the browser-facing HTTP API
    #[arg(long, default_value_t = 4747, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Run only the MCP tool server, without the HTTP API
    #[arg(long)]
    pub mcp_only: bool,
}
