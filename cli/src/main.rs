use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use toolloop_core::agent::{self, AgentLoop, ContextBuilder, ToolCallPolicy, ToolRegistry};
use toolloop_core::config::{self, Config};
use toolloop_core::mcp::{self, McpConnections, ServersFile, WeatherServer};
use toolloop_core::tools::{WeatherClient, WeatherTool};
use toolloop_core::{memory, providers};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod onboard;
mod prompt;

#[derive(Parser)]
#[command(name = "toolloop")]
#[command(about = "toolloop - let a chat model call tools through MCP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ServeTransport {
    Stdio,
    Sse,
    StreamableHttp,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive setup of ~/.toolloop/config.toml
    Onboard,
    /// Ask one question, or start an interactive session
    Chat {
        #[arg(short, long)]
        message: Option<String>,
        /// MCP servers file (defaults to mcp.json)
        #[arg(long)]
        servers: Option<PathBuf>,
        /// Keep history across turns under this thread id
        #[arg(long)]
        thread: Option<String>,
        /// Execute every tool call the model requests, not just the first
        #[arg(long)]
        all_calls: bool,
    },
    /// Run the weather MCP server
    Serve {
        #[arg(long, value_enum, default_value_t = ServeTransport::Stdio)]
        transport: ServeTransport,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        host: IpAddr,
    },
    /// List the tools the configured servers expose
    Tools {
        #[arg(long)]
        servers: Option<PathBuf>,
    },
}

fn init_tracing() {
    // stdout belongs to the chat transcript and to the stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    config::load_dotenv();

    let command = match cli.command {
        Some(command) => command,
        None => default_command(&Config::load_or_init()?),
    };

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat {
            message,
            servers,
            thread,
            all_calls,
        } => {
            let mut config = Config::load_or_init()?;
            if all_calls {
                config.call_policy = ToolCallPolicy::All;
            }
            let servers = servers.unwrap_or_else(|| config.servers_file.clone());
            run_chat(&config, &servers, message, thread).await?;
        }
        Commands::Serve {
            transport,
            port,
            host,
        } => {
            let config = Config::load_or_init()?;
            if config.weather.api_key.is_none() {
                warn!("OPENWEATHER_API_KEY is not set; lookups will be rejected upstream");
            }
            let server = WeatherServer::new(WeatherClient::new(config.weather.clone()));
            match transport {
                ServeTransport::Stdio => mcp::serve_stdio(server).await?,
                ServeTransport::Sse => {
                    let addr = SocketAddr::new(host, port.unwrap_or(mcp::DEFAULT_SSE_PORT));
                    mcp::serve_sse(server, addr).await?
                }
                ServeTransport::StreamableHttp => {
                    let addr = SocketAddr::new(host, port.unwrap_or(mcp::DEFAULT_HTTP_PORT));
                    mcp::serve_streamable_http(server, addr).await?
                }
            }
        }
        Commands::Tools { servers } => {
            let config = Config::load_or_init()?;
            let servers = servers.unwrap_or_else(|| config.servers_file.clone());
            let connections = connect_servers(&servers).await?;
            let registry = build_registry(&config, &connections).await;
            connections.close().await;

            let registry = registry?;
            if registry.is_empty() {
                println!("No tools available.");
            }
            for spec in registry.describe_all() {
                println!("{}: {}", spec.name, spec.description);
                println!("  {}", spec.input_schema);
            }
        }
    }

    Ok(())
}

/// Chat when a backend is already reachable from the file or the environment.
fn default_command(config: &Config) -> Commands {
    if config.is_usable() {
        Commands::Chat {
            message: None,
            servers: None,
            thread: None,
            all_calls: false,
        }
    } else {
        Commands::Onboard
    }
}

async fn connect_servers(path: &std::path::Path) -> Result<McpConnections> {
    let file = ServersFile::load(path).await?;
    if !file.is_empty() {
        info!(path = %path.display(), servers = file.len(), "connecting to tool servers");
    }
    Ok(McpConnections::connect_all(&file).await?)
}

/// Remote tools when servers are configured. Otherwise the in-process weather tool,
/// if an OpenWeather key is available.
async fn build_registry(config: &Config, connections: &McpConnections) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    if !connections.is_empty() {
        connections.register_tools(&mut registry).await?;
    } else if config.weather.api_key.is_some() {
        info!("no tool servers configured; using the built-in weather tool");
        registry.register(Arc::new(WeatherTool::new(WeatherClient::new(
            config.weather.clone(),
        ))))?;
    } else {
        warn!("no tools available; the model will answer directly");
    }
    Ok(registry)
}

async fn run_chat(
    config: &Config,
    servers: &std::path::Path,
    message: Option<String>,
    thread: Option<String>,
) -> Result<()> {
    let provider = providers::create_provider(config)?;
    let connections = connect_servers(servers).await?;

    // Sessions are closed on every path out of the chat.
    let result = chat_with(config, provider, &connections, message, thread).await;
    connections.close().await;
    result
}

async fn chat_with(
    config: &Config,
    provider: Arc<dyn toolloop_core::Provider>,
    connections: &McpConnections,
    message: Option<String>,
    thread: Option<String>,
) -> Result<()> {
    let registry = Arc::new(build_registry(config, connections).await?);

    let mut context_builder = ContextBuilder::new().with_time(config.include_time);
    if let Some(prompt) = &config.system_prompt {
        context_builder = context_builder.with_system_prompt(prompt.clone());
    }

    let mut agent_loop = AgentLoop::new(provider, context_builder, registry)
        .with_call_policy(config.call_policy)
        .with_memory_window(config.memory_window);
    if thread.is_some() {
        agent_loop = agent_loop.with_checkpointer(memory::create_checkpointer());
    }

    if let Some(msg) = message {
        println!("\n🤔 Processing...\n");
        let result = match &thread {
            Some(thread) => agent_loop.process_in_thread(&msg, thread).await,
            None => agent_loop.process(&msg).await,
        };
        match result {
            Ok(completion) => println!("{}", completion.answer),
            Err(e) => {
                eprintln!("❌ Error: {}", e);
                anyhow::bail!("Agent processing failed: {}", e);
            }
        }
        return Ok(());
    }

    let tools = agent_loop.registry().names();
    if tools.is_empty() {
        println!("🔧 toolloop (no tools)");
    } else {
        println!("🔧 toolloop (tools: {})", tools.join(", "));
    }
    let history = config::ensure_toolloop_dir()
        .ok()
        .map(|dir| dir.join("history.txt"));
    let mut source = prompt::ReadlineSource::new(history)?;
    let mut stdout = std::io::stdout();
    agent::run_chat_loop(&agent_loop, &mut source, &mut stdout, thread.as_deref()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_only_without_a_usable_backend() {
        assert!(matches!(default_command(&Config::default()), Commands::Onboard));

        let mut keyed = Config::default();
        keyed.apply_env_with(|k| (k == "OPENAI_API_KEY").then(|| "sk-test".to_string()));
        assert!(matches!(default_command(&keyed), Commands::Chat { .. }));

        let local = Config {
            provider: Some("ollama".into()),
            ..Config::default()
        };
        assert!(matches!(default_command(&local), Commands::Chat { .. }));
    }
}
