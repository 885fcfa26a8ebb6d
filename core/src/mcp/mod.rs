pub mod client;
pub mod pool;
pub mod serve;
pub mod server;
pub mod servers;
pub mod tool;

pub use client::{McpSession, call_remote_tool};
pub use pool::McpConnections;
pub use serve::{
    DEFAULT_HTTP_PORT, DEFAULT_SSE_PORT, serve_sse, serve_stdio, serve_streamable_http,
    shutdown_signal,
};
pub use server::{FailureMode, WeatherServer};
pub use servers::{ResolvedServer, ServerSpec, ServersFile, TransportKind};
pub use tool::McpTool;
