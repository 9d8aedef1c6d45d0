//! graph-tool-server entry point.
//!
//! Subcommands:
//! - `serve`: TCP+msgpack protocol server
//! - `stdio`: MCP adapter on stdin/stdout
//! - `list-tools`: print discovery metadata without touching the backend
//! - `config-schema`: print the JSON Schema of the configuration file

use clap::{Parser, Subcommand};
use graph_tool_server::ipc::ProtocolServer;
use graph_tool_server::mcp::McpServer;
use graph_tool_server::tools::{register_builtin_tools, ToolRegistry};
use graph_tool_server::{Config, ServerContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "graph-tool-server",
    version,
    about = "Graph analysis tools for LLM agents over a request/response protocol"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, env = "GRAPH_TOOLS_CONFIG", help = "Configuration file (JSON)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the TCP protocol server")]
    Serve {
        #[arg(long, help = "Override the listen address")]
        listen: Option<SocketAddr>,
    },

    #[command(about = "Run the MCP adapter on stdin/stdout")]
    Stdio,

    #[command(about = "Print tool discovery metadata")]
    ListTools {
        #[arg(long, help = "Print the LLM prompt section instead of JSON")]
        prompt: bool,
    },

    #[command(about = "Print the configuration JSON Schema")]
    ConfigSchema,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
            return Ok(());
        }
        Commands::ListTools { prompt } => {
            let mut registry = ToolRegistry::new();
            register_builtin_tools(&mut registry)?;
            if prompt {
                println!("{}", registry.generate_prompt(None));
            } else {
                println!("{}", serde_json::to_string_pretty(&registry.metadata())?);
            }
            return Ok(());
        }
        Commands::Serve { .. } | Commands::Stdio => {}
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Commands::Serve { listen: Some(addr) } = &cli.command {
        config.server.listen_addr = addr.to_string();
    }
    graph_tool_server::observability::init_tracing(&config.observability);

    let context = ServerContext::start(config).await?;
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    match cli.command {
        Commands::Serve { .. } => {
            let addr: SocketAddr = context.config().server.listen_addr.parse()?;
            let server = ProtocolServer::new(context.dispatcher(), addr, context.config().ipc.clone());
            let server_cancel = server.cancellation_token();
            tokio::spawn(async move {
                cancel.cancelled().await;
                server_cancel.cancel();
            });
            server.serve().await?;
        }
        Commands::Stdio => {
            McpServer::new(context.dispatcher()).run_stdio(cancel).await?;
        }
        Commands::ListTools { .. } | Commands::ConfigSchema => {}
    }

    context.shutdown();
    Ok(())
}
