use aerorag_core::config::{Config, Environment, StorageMode};
use aerorag_core::{Document, Metadata, MetadataValue, RagEngine};
use aerorag_tools::ToolExecutionResult;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aerorag")]
#[command(about = "Search the aerodynamic reference base and run estimator tools", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show current configuration")]
    Config,

    #[command(about = "Find reference documents similar to a description")]
    Search {
        #[arg(help = "Description of the desired configuration")]
        query: String,

        #[arg(short, long, help = "Maximum number of results (defaults to rag.top_k)")]
        limit: Option<usize>,

        #[arg(long, help = "Print results as JSON")]
        json: bool,
    },

    #[command(about = "Embed and store a reference document")]
    Add {
        #[arg(long, help = "Reference name, e.g. 'NACA 23012'; used to derive the id")]
        name: Option<String>,

        #[arg(long, help = "Explicit document id (overrides the derived one)")]
        id: Option<String>,

        #[arg(long, help = "Text to embed")]
        text: String,

        #[arg(long = "meta", value_name = "KEY=VALUE", help = "Metadata entry, repeatable")]
        meta: Vec<String>,
    },

    #[command(about = "Show how many documents the collection holds")]
    Count,

    #[command(about = "Remove every document from the collection")]
    Clear {
        #[arg(long, help = "Confirm the destructive operation")]
        yes: bool,
    },

    #[command(about = "Estimator tool commands")]
    Tools {
        #[command(subcommand)]
        command: ToolCommands,
    },
}

#[derive(Subcommand)]
enum ToolCommands {
    #[command(about = "List registered tools")]
    List,

    #[command(about = "Execute a tool")]
    Run {
        #[arg(help = "Tool name, e.g. 'estimate_downforce'")]
        name: String,

        #[arg(short, long, default_value = "{}", help = "Tool input as a JSON object")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Config => show_config(&config),
        Commands::Search { query, limit, json } => search(&config, &query, limit, json).await,
        Commands::Add { name, id, text, meta } => add(&config, name, id, &text, &meta).await,
        Commands::Count => count(&config).await,
        Commands::Clear { yes } => clear(&config, yes).await,
        Commands::Tools { command } => match command {
            ToolCommands::List => list_tools(),
            ToolCommands::Run { name, input } => run_tool(&name, &input).await,
        },
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

async fn engine(config: &Config) -> Result<RagEngine> {
    RagEngine::new(config)
        .await
        .context("Failed to initialize retrieval engine")
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "Embedding:".bold());
    println!("  Provider:    {:?}", config.embedding.provider);
    println!("  Model:       {}", config.embedding.model.cyan());
    println!("  Dimension:   {}", config.embedding.dimension);
    println!(
        "  API Key:     {}",
        if config.embedding.api_key.is_empty() { "unset" } else { "set" }
    );
    println!();
    println!("{}", "Storage:".bold());
    match &config.storage.storage_mode {
        StorageMode::Embedded { path } => println!("  Mode:        embedded ({})", path),
        StorageMode::Memory => println!("  Mode:        memory"),
    }
    println!("  Collection:  {}", config.storage.collection_name.cyan());
    println!();
    println!("{}", "Retrieval:".bold());
    println!("  Threshold:   {}", config.rag.similarity_threshold);
    println!("  Top K:       {}", config.rag.top_k);
    println!("  Metric:      {:?}", config.rag.metric);
    println!();
    println!("Environment: {}", config.environment);

    Ok(())
}

async fn search(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let engine = engine(config).await?;
    let results = engine.search_similar(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!(
            "{}",
            format!(
                "No matches at or above similarity {}",
                engine.similarity_threshold()
            )
            .yellow()
        );
        return Ok(());
    }

    for result in results {
        println!(
            "{} {} {}",
            format!("[{}]", result.rank).bold(),
            result.document.id.cyan(),
            format!("(score {:.3})", result.score).dimmed()
        );
        println!("    {}", result.document.text);
        for (key, value) in &result.document.metadata {
            println!("    {}: {}", key.dimmed(), value);
        }
    }

    Ok(())
}

fn parse_meta(entries: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("Metadata '{}' is not KEY=VALUE", entry))?;
        let value = if let Ok(b) = raw.parse::<bool>() {
            MetadataValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            MetadataValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            MetadataValue::Float(f)
        } else {
            MetadataValue::String(raw.to_string())
        };
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}

async fn add(
    config: &Config,
    name: Option<String>,
    id: Option<String>,
    text: &str,
    meta: &[String],
) -> Result<()> {
    let mut metadata = parse_meta(meta)?;
    let id = match (id, &name) {
        (Some(id), _) => id,
        (None, Some(name)) => Document::slug_id("airfoil", name),
        (None, None) => Document::content_id(text),
    };
    if let Some(name) = name {
        metadata.insert("airfoil_name".to_string(), MetadataValue::String(name));
    }

    let engine = engine(config).await?;
    match engine.add_reference(&id, text, metadata).await {
        Ok(()) => {
            println!("{} Added: {}", "✓".green().bold(), id.cyan());
            Ok(())
        }
        Err(e) if e.is_duplicate() => {
            println!("{} Already present: {}", "•".yellow(), id.cyan());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn count(config: &Config) -> Result<()> {
    let engine = engine(config).await?;
    println!(
        "{}: {}",
        config.storage.collection_name.bold(),
        engine.count().await?
    );
    Ok(())
}

async fn clear(config: &Config, yes: bool) -> Result<()> {
    if config.environment == Environment::Production {
        anyhow::bail!("Clearing the collection is not allowed in production");
    }
    if !yes {
        anyhow::bail!("Refusing to clear without --yes");
    }

    let engine = engine(config).await?;
    engine.clear_collection().await?;
    println!(
        "{} Cleared collection {}",
        "✓".green().bold(),
        config.storage.collection_name.cyan()
    );
    Ok(())
}

fn list_tools() -> Result<()> {
    let registry = aerorag_std::default_registry()?;

    println!("{}", "Available tools:".bold().green());
    println!();
    for spec in registry.list_tools() {
        println!("  {} {}", "•".cyan(), spec.name.bold());
        println!("    {}", spec.description);
        println!("    schema: {}", serde_json::to_string(&spec.input_schema)?.dimmed());
    }

    Ok(())
}

async fn run_tool(name: &str, input: &str) -> Result<()> {
    let input: serde_json::Value =
        serde_json::from_str(input).context("Tool input must be valid JSON")?;

    let registry = aerorag_std::default_registry()?;
    let result = registry.execute_tool(name, input).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    ensure_succeeded(&result)
}

/// Turns a failed tool run into a non-zero exit through the normal error path.
fn ensure_succeeded(result: &ToolExecutionResult) -> Result<()> {
    if !result.success {
        anyhow::bail!(
            "Tool '{}' failed: {}",
            result.tool_name,
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_failed_tool_run_is_an_error() {
        let failed = ToolExecutionResult::failed("estimate_downforce", "Invalid input: speed", 0.4);
        let err = ensure_succeeded(&failed).unwrap_err();
        assert!(err.to_string().contains("estimate_downforce"));
        assert!(err.to_string().contains("Invalid input: speed"));

        let ok = ToolExecutionResult::succeeded("estimate_downforce", Map::new(), 0.4);
        assert!(ensure_succeeded(&ok).is_ok());
    }

    #[test]
    fn test_parse_meta_types_values() {
        let meta = parse_meta(&[
            "verified=true".to_string(),
            "year=1935".to_string(),
            "max_cl=1.6".to_string(),
            "family=NACA".to_string(),
        ])
        .unwrap();
        assert_eq!(meta["verified"], MetadataValue::Bool(true));
        assert_eq!(meta["year"], MetadataValue::Int(1935));
        assert_eq!(meta["max_cl"], MetadataValue::Float(1.6));
        assert_eq!(meta["family"], MetadataValue::String("NACA".to_string()));
        assert!(parse_meta(&["no_equals".to_string()]).is_err());
    }
}
