use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use token_icon_resolver::{
    config::Config,
    models::ResolvedIcon,
    presentation::{self, RenderedIcon},
    services::{IconResolver, InMemoryResolutionCache, ResolutionCache},
};

#[derive(Parser)]
#[command(name = "token-icon-resolver")]
#[command(version)]
#[command(about = "Resolve token symbols to icon references")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (default: $CONFIG_FILE, then config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Icon repository base URL (overrides config file)
    #[arg(short = 'b', long, value_name = "URL")]
    base_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Token symbols to resolve
    #[arg(required = true)]
    symbols: Vec<String>,
}

#[derive(Serialize)]
struct SymbolOutput<'a> {
    symbol: &'a str,
    icon: &'a ResolvedIcon,
    rendered: RenderedIcon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("token_icon_resolver={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting token icon resolver v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = cli.base_url {
        config.source.base_url = base_url;
        config = config.normalized();
        config.validate()?;
    }
    info!("Resolving icons from {}", config.source.base_url);

    let cache = InMemoryResolutionCache::new();
    let resolver = IconResolver::from_config_with_cache(&config, Arc::new(cache.clone()))?;
    let icons = resolver.resolve_many(&cli.symbols).await;

    let stats = cache.stats();
    debug!(
        "Resolution cache: {} entries, {} hits, {} misses, {} writes",
        cache.len().await,
        stats.hits,
        stats.misses,
        stats.writes
    );

    if cli.json {
        let output: Vec<SymbolOutput> = cli
            .symbols
            .iter()
            .zip(icons.iter())
            .map(|(symbol, icon)| SymbolOutput {
                symbol,
                icon,
                rendered: presentation::render(symbol, icon),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (symbol, icon) in cli.symbols.iter().zip(icons.iter()) {
            let reference = match presentation::render(symbol, icon) {
                RenderedIcon::Url(url) => url,
                RenderedIcon::Inline(svg) => svg,
            };
            println!("{}\t{}\t{}", symbol.trim().to_uppercase(), icon.kind(), reference);
        }
    }

    Ok(())
}
