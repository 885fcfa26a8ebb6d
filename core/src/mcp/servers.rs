use crate::error::{LoopError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Stdio,
    Sse,
    #[serde(alias = "streamable-http", alias = "http")]
    StreamableHttp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable_http",
        })
    }
}

/// One entry of the servers file: either a command to spawn or a URL to reach.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
}

/// A server entry with its transport settled.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedServer {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Sse {
        url: String,
    },
    StreamableHttp {
        url: String,
    },
}

impl ServerSpec {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args,
            ..Self::default()
        }
    }

    pub fn remote(url: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            url: Some(url.into()),
            transport: Some(transport),
            ..Self::default()
        }
    }

    /// An explicit `transport` wins. Otherwise a command means stdio, a URL ending in
    /// `/sse` means SSE and any other URL means streamable HTTP.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport.or_else(|| {
            if self.command.is_some() {
                Some(TransportKind::Stdio)
            } else {
                self.url.as_deref().map(|url| {
                    if url.trim_end_matches('/').ends_with("/sse") {
                        TransportKind::Sse
                    } else {
                        TransportKind::StreamableHttp
                    }
                })
            }
        })
    }

    pub fn resolve(&self, name: &str) -> Result<ResolvedServer> {
        let kind = self.transport_kind().ok_or_else(|| {
            LoopError::Config(format!("server '{name}' needs either a command or a url"))
        })?;

        match kind {
            TransportKind::Stdio => {
                let command = self.command.clone().ok_or_else(|| {
                    LoopError::Config(format!("server '{name}' uses stdio but has no command"))
                })?;
                Ok(ResolvedServer::Stdio {
                    command,
                    args: self.args.clone(),
                    env: self.env.clone(),
                })
            }
            TransportKind::Sse | TransportKind::StreamableHttp => {
                let url = self.url.clone().ok_or_else(|| {
                    LoopError::Config(format!("server '{name}' uses {kind} but has no url"))
                })?;
                Ok(if kind == TransportKind::Sse {
                    ResolvedServer::Sse { url }
                } else {
                    ResolvedServer::StreamableHttp { url }
                })
            }
        }
    }
}

/// `{"mcpServers": {name: spec}}`, the layout desktop MCP hosts use.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServersFile {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerSpec>,
}

impl ServersFile {
    /// A missing file means no servers. A present but malformed one is a config error.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::parse(&content).map_err(|e| match e {
                LoopError::Config(reason) => {
                    LoopError::Config(format!("{}: {reason}", path.display()))
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LoopError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(content)
            .map_err(|e| LoopError::Config(format!("invalid servers file: {e}")))?;
        for (name, spec) in &file.servers {
            spec.resolve(name)?;
        }
        Ok(file)
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }
}
