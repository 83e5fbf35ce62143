//! MCP tool adapter.
//!
//! Exposes the annotation store to an agent runtime as a fixed catalogue
//! of `pagemark_*` tools over JSON-RPC on stdio. Every tool maps to one
//! store operation; store failures come back as `isError` tool results,
//! never as a dropped connection.

mod args;
mod server;
mod tools;

pub use args::{
    AcknowledgeArgs, DismissArgs, GetPendingArgs, GetSessionArgs, ReplyArgs, ResolveArgs,
};
pub use server::{run_server, PagemarkServer};
