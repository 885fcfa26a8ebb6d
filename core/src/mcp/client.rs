use crate::error::{LoopError, Result};
use crate::mcp::servers::{ResolvedServer, ServerSpec};
use crate::mcp::tool::McpTool;
use crate::traits::{ContentBlock, ToolOutput};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::{
    ConfigureCommandExt, IntoTransport, SseClientTransport, StreamableHttpClientTransport,
    TokioChildProcess,
};
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

pub type ClientService = RunningService<RoleClient, ClientInfo>;

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolloop".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

/// Calls one tool through an MCP peer and flattens the reply into a `ToolOutput`.
pub async fn call_remote_tool(
    peer: &Peer<RoleClient>,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput> {
    let arguments = match arguments {
        Value::Null => None,
        Value::Object(map) => Some(map),
        other => {
            return Err(LoopError::validation(
                name,
                format!("arguments must be a JSON object, got {other}"),
            ));
        }
    };
    let response = peer
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments,
        })
        .await
        .map_err(|e| LoopError::UpstreamRequest(anyhow::anyhow!("tool call '{name}' failed: {e}")))?;

    Ok(into_output(response))
}

/// Text blocks are kept in order. Other content kinds have no place in a chat message.
pub(crate) fn into_output(result: CallToolResult) -> ToolOutput {
    let blocks = result
        .content
        .unwrap_or_default()
        .into_iter()
        .filter_map(|content| match content.as_text() {
            Some(text) => Some(ContentBlock::text(text.text.clone())),
            None => {
                debug!("dropping non-text tool content");
                None
            }
        })
        .collect();
    ToolOutput::from_blocks(blocks, result.is_error.unwrap_or(false))
}

/// A live connection to one named tool server.
pub struct McpSession {
    name: String,
    service: ClientService,
}

impl McpSession {
    pub async fn connect(name: impl Into<String>, spec: &ServerSpec) -> Result<Self> {
        let name = name.into();
        let resolved = spec.resolve(&name)?;
        info!(server = %name, "connecting to tool server");

        match resolved {
            ResolvedServer::Stdio { command, args, env } => {
                let transport = TokioChildProcess::new(Command::new(&command).configure(|cmd| {
                    cmd.args(&args).envs(&env);
                }))
                .map_err(|e| LoopError::connection(&name, format!("failed to spawn '{command}': {e}")))?;
                Self::connect_transport(name, transport).await
            }
            ResolvedServer::Sse { url } => {
                let transport = SseClientTransport::start(url.clone())
                    .await
                    .map_err(|e| LoopError::connection(&name, format!("{url}: {e}")))?;
                Self::connect_transport(name, transport).await
            }
            ResolvedServer::StreamableHttp { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url);
                Self::connect_transport(name, transport).await
            }
        }
    }

    /// Runs the MCP handshake over any transport rmcp understands.
    pub async fn connect_transport<T, E, A>(name: impl Into<String>, transport: T) -> Result<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let name = name.into();
        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| LoopError::connection(&name, e))?;

        if let Some(server) = service.peer_info() {
            info!(server = %name, remote = %server.server_info.name, "tool server connected");
        }
        Ok(Self { name, service })
    }

    pub fn peer(&self) -> Peer<RoleClient> {
        self.service.peer().clone()
    }

    pub async fn list_tools(&self) -> Result<Vec<rmcp::model::Tool>> {
        self.service
            .list_all_tools()
            .await
            .map_err(|e| LoopError::connection(&self.name, format!("failed to list tools: {e}")))
    }

    /// Every remote tool wrapped so a `ToolRegistry` can hold it.
    pub async fn tools(&self) -> Result<Vec<McpTool>> {
        let tools = self.list_tools().await?;
        info!(server = %self.name, count = tools.len(), "tools listed");
        Ok(tools
            .into_iter()
            .map(|tool| McpTool::new(tool, self.peer(), self.name.clone()))
            .collect())
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        call_remote_tool(self.service.peer(), name, arguments).await
    }

    /// Ends the session. Dropping it has the same effect without waiting.
    pub async fn close(self) {
        let name = self.name;
        match self.service.cancel().await {
            Ok(reason) => debug!(server = %name, ?reason, "tool server disconnected"),
            Err(e) => debug!(server = %name, "tool server task ended abnormally: {e}"),
        }
    }
}
