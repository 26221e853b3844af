mod repl;

use agent_core::agent_loop::{AgentLoop, AgentSettings};
use agent_core::config::{AppConfig, HistoryPolicy};
use agent_core::provider::OpenAiChatModel;
use agent_core::tool_registry::ToolRegistry;
use agent_db::MovieCatalog;
use agent_tools::mcp::RemoteToolClient;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "movie-agent",
    about = "Ask questions about a movie catalog through a tool-calling LLM",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/movie-agent/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Override the catalog database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat about the local movie catalog (default)
    Chat,

    /// Chat with web search tools from a remote MCP server
    Search,

    /// Seed the catalog from a JSON array of movie objects
    Import {
        /// JSON file to load
        file: PathBuf,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "movie_agent=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config. `config init|path` may name a file that does not exist yet.
    let targets_config_file = matches!(
        cli.command,
        Some(Commands::Config {
            action: Some(ConfigAction::Init | ConfigAction::Path)
        })
    );
    let mut config = match &cli.config {
        Some(path) if targets_config_file && !path.exists() => AppConfig::default(),
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(model) = &cli.model {
        config.provider.model = model.clone();
    }
    if let Some(api_base) = &cli.api_base {
        config.provider.api_base = api_base.clone();
    }
    if let Some(db) = &cli.db {
        config.catalog.db_path = db.clone();
    }

    match cli.command {
        Some(Commands::Search) => run_search(config).await?,
        Some(Commands::Import { file }) => {
            let catalog = MovieCatalog::open(&config.catalog.db_path);
            let count = catalog.import_json_file(&file).await?;
            println!(
                "Imported {} movies into {}",
                count,
                config.catalog.db_path.display()
            );
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config, cli.config.as_deref())?
        }
        Some(Commands::Chat) | None => run_catalog(config).await?,
    }

    Ok(())
}

/// Movie-catalog agent over the local SQLite store.
async fn run_catalog(config: AppConfig) -> Result<()> {
    let model = OpenAiChatModel::from_config(&config.provider)?;

    let catalog = MovieCatalog::open(&config.catalog.db_path);
    if !catalog.path().exists() {
        tracing::warn!(
            "Catalog {} does not exist yet; lookups will report it as unavailable",
            catalog.path().display()
        );
    }
    let mut registry = ToolRegistry::new();
    agent_tools::register_catalog_tools(&mut registry, &catalog);

    tracing::info!(
        "Loaded {} tools, model: {}, catalog: {}",
        registry.len(),
        model.model(),
        catalog.path().display(),
    );

    let policy = config.agent.history.unwrap_or(HistoryPolicy::PerTurn);
    let model_name = model.model().to_string();
    let agent = AgentLoop::new(
        Arc::new(model),
        Arc::new(registry),
        AgentSettings::from_config(&config),
    );
    repl::run(
        agent,
        policy,
        &model_name,
        "movie-agent: movie catalog assistant",
        "Hope you enjoy a nice flick tonight :-) Goodbye!",
    )
    .await
}

/// Web-search agent over tools discovered from the remote MCP server.
async fn run_search(config: AppConfig) -> Result<()> {
    let model = OpenAiChatModel::from_config(&config.provider)?;
    let endpoint = config.search.endpoint()?;

    println!("Initializing MCP connection to {}...", config.search.mcp_url);
    let client = Arc::new(RemoteToolClient::connect(&endpoint).await?);
    let mut registry = ToolRegistry::new();
    let remote = agent_tools::register_search_tools(&mut registry, client.clone()).await?;
    println!("Loaded {} tools from MCP", remote);

    let settings = AgentSettings {
        system_prompt: config.search.system_prompt.clone(),
        ..AgentSettings::from_config(&config)
    };
    let policy = config.agent.history.unwrap_or(HistoryPolicy::Accumulate);
    let model_name = model.model().to_string();
    let agent = AgentLoop::new(Arc::new(model), Arc::new(registry), settings);
    let result = repl::run(agent, policy, &model_name, "movie-agent: web search", "Goodbye!").await;

    // The agent (and its registry) is gone, so this is the last handle.
    if let Ok(client) = Arc::try_unwrap(client) {
        client.shutdown().await;
    }
    result
}

fn handle_config_command(
    action: Option<ConfigAction>,
    config: &AppConfig,
    config_path: Option<&Path>,
) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save_to(&path)?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_init_honors_path_override() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("custom").join("config.toml");

        handle_config_command(Some(ConfigAction::Init), &AppConfig::default(), Some(&path)).unwrap();
        assert!(path.exists());
        assert!(AppConfig::load_from(&path).is_ok());

        // A second init leaves the existing file alone.
        std::fs::write(&path, "[provider]\nmodel = \"llama3\"\n").unwrap();
        handle_config_command(Some(ConfigAction::Init), &AppConfig::default(), Some(&path)).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().provider.model, "llama3");
    }

    #[test]
    fn test_cli_parses_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["movie-agent", "config", "init", "--config", "/tmp/m.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: Some(ConfigAction::Init)
            })
        ));
    }
}
