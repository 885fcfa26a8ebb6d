use crate::mcp::client::call_remote_tool;
use crate::traits::{Tool, ToolOutput, ToolSpec};
use async_trait::async_trait;
use rmcp::RoleClient;
use rmcp::service::Peer;
use serde_json::Value;
use tracing::debug;

/// A tool that lives on an MCP server, callable like any local one.
pub struct McpTool {
    spec: ToolSpec,
    peer: Peer<RoleClient>,
    server: String,
}

impl McpTool {
    pub fn new(tool: rmcp::model::Tool, peer: Peer<RoleClient>, server: impl Into<String>) -> Self {
        Self {
            spec: spec_from_mcp(&tool),
            peer,
            server: server.into(),
        }
    }
}

pub fn spec_from_mcp(tool: &rmcp::model::Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name.to_string(),
        description: tool
            .description
            .as_deref()
            .unwrap_or_default()
            .to_string(),
        input_schema: tool.schema_as_json_value(),
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn input_schema(&self) -> Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolOutput> {
        debug!(server = %self.server, tool = %self.spec.name, "calling remote tool");
        Ok(call_remote_tool(&self.peer, &self.spec.name, args).await?)
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }
}
