use crate::agent::ToolRegistry;
use crate::error::Result;
use crate::mcp::client::McpSession;
use crate::mcp::servers::ServersFile;
use std::sync::Arc;
use tracing::{error, info};

/// Every tool server the process talks to, opened together and closed together.
#[derive(Default)]
pub struct McpConnections {
    sessions: Vec<McpSession>,
}

impl McpConnections {
    /// Connects to each configured server in name order. The first failure closes
    /// whatever was already open and is returned.
    pub async fn connect_all(file: &ServersFile) -> Result<Self> {
        let mut connections = Self::default();
        for (name, spec) in &file.servers {
            match McpSession::connect(name, spec).await {
                Ok(session) => connections.sessions.push(session),
                Err(e) => {
                    error!(server = %name, "{e}");
                    connections.close().await;
                    return Err(e);
                }
            }
        }
        Ok(connections)
    }

    pub fn push(&mut self, session: McpSession) {
        self.sessions.push(session);
    }

    /// Registers the tools of every session. Names must be unique across servers.
    pub async fn register_tools(&self, registry: &mut ToolRegistry) -> Result<usize> {
        let mut count = 0;
        for session in &self.sessions {
            for tool in session.tools().await? {
                registry.register(Arc::new(tool))?;
                count += 1;
            }
        }
        info!(count, servers = self.sessions.len(), "remote tools registered");
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub async fn close(self) {
        for session in self.sessions {
            session.close().await;
        }
    }
}
