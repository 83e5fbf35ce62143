// NOTE: Process layout
//
// One Store, two adapters, one process. stdout belongs to the MCP
// channel (the agent runtime launches this binary and speaks JSON-RPC
// over stdio), so everything human-facing goes to stderr. The HTTP
// adapter runs as a background task; the MCP loop is the foreground job
// and the process ends when stdin closes.

mod args;
mod commands;

pub use args::Cli;
pub use commands::run;
