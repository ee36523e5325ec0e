// mcp-bridge CLI
//
//   mcp-bridge ask "<question>" [--mode dynamic] [--server wiki-mcp] ...
//   mcp-bridge tools [--mode code]
//
// Configuration comes from the usual layers (defaults, config file,
// environment); the flags here override them for one invocation.

use clap::{Parser, Subcommand};
use log::info;
use mcp_bridge::engine::tools::project_tools;
use mcp_bridge::{
    run_conversation, AnyProvider, BridgeConfig, EngineResult, McpClient, OperatingMode,
    RunOutcome, RunRequest,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcp-bridge")]
#[command(version, about = "Ask an LLM questions it answers with tools from an MCP gateway")]
struct Cli {
    /// Config file (default: <config dir>/mcp-bridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway endpoint
    #[arg(long, global = true, env = "MCP_GATEWAY_URL")]
    gateway: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one conversation and print the answer
    Ask {
        /// The user's message
        message: String,

        /// Operating mode: default, dynamic or code
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<OperatingMode>,

        /// Model turn budget
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Server to activate before the first turn (repeatable)
        #[arg(long = "server")]
        servers: Vec<String>,

        /// Chat model
        #[arg(long, env = "MCP_BRIDGE_MODEL")]
        model: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the gateway catalog and what the model would see
    Tools {
        /// Operating mode used for projection
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<OperatingMode>,
    },
}

fn parse_mode(s: &str) -> Result<OperatingMode, String> {
    s.parse::<OperatingMode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("mcp-bridge error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut c = BridgeConfig::from_file(path)?;
            c.apply_overrides(|key| std::env::var(key).ok());
            c
        }
        None => BridgeConfig::load()?,
    };
    if let Some(url) = cli.gateway {
        config.gateway.url = url;
    }
    config.validate()?;

    match cli.command {
        Commands::Ask {
            message,
            mode,
            max_iterations,
            servers,
            model,
            json,
        } => {
            let request = RunRequest {
                user_message: message,
                max_iterations: max_iterations.unwrap_or(config.engine.max_iterations),
                mode: mode.unwrap_or(config.engine.default_mode),
                initial_servers: servers,
                model: model.unwrap_or_else(|| config.model()),
            };
            ask(&config, request, json).await
        }
        Commands::Tools { mode } => tools(&config, mode.unwrap_or(config.engine.default_mode)).await,
    }
}

async fn ask(config: &BridgeConfig, request: RunRequest, as_json: bool) -> EngineResult<()> {
    let provider = AnyProvider::from_config(&config.provider);
    info!("[cli] Using provider '{}' model={}", provider.name(), request.model);
    let outcome = run_conversation(&provider, config, request).await?;
    let summary = outcome.summary();

    if as_json {
        let content = match &outcome {
            RunOutcome::Completed { content, .. } => Some(content.as_str()),
            RunOutcome::MaxIterationsReached { .. } => None,
        };
        let out = json!({
            "completed": outcome.is_completed(),
            "content": content,
            "active_servers": summary.active_servers,
            "tool_names": summary.tool_names,
            "iterations": summary.iterations,
            "messages": summary.messages,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match &outcome {
        RunOutcome::Completed { content, .. } => println!("{}", content),
        RunOutcome::MaxIterationsReached { .. } => println!(
            "(no final answer after {} model turns)",
            summary.iterations
        ),
    }
    println!();
    println!("iterations:     {}", summary.iterations);
    println!("active servers: {}", summary.active_servers.join(", "));
    println!("tools:          {}", summary.tool_names.len());
    Ok(())
}

async fn tools(config: &BridgeConfig, mode: OperatingMode) -> EngineResult<()> {
    let client = McpClient::new(config.gateway.clone())?;
    let result = print_catalog(&client, mode).await;
    client.close().await;
    result
}

async fn print_catalog(client: &McpClient, mode: OperatingMode) -> EngineResult<()> {
    client.handshake().await?;
    let registry = client.list_tools().await?;
    let projected = project_tools(registry.tools(), mode);
    let out = json!({
        "gateway": client.endpoint(),
        "dynamic_discovery": registry.supports_dynamic_discovery(),
        "custom_tools": registry.supports_custom_tools(),
        "catalog": registry.tools(),
        "mode": mode.as_str(),
        "projected": projected,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
