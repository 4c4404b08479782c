use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use sift::cache::FeedCache;
use sift::config::Config;
use sift::feed::Rfc2822DateExtractor;
use sift::report::LogReporter;
use sift::service::{FeedService, ItemRequest};

#[derive(Parser, Debug)]
#[command(name = "sift", about = "Fetch a syndication feed and print its items")]
struct Args {
    /// Feed URL (overrides the config file)
    url: Option<String>,

    /// Maximum number of items to print (0 = unlimited)
    #[arg(long)]
    max_items: Option<u64>,

    /// Cache TTL in minutes (0 = refetch every run)
    #[arg(long, value_name = "MINUTES")]
    refresh: Option<u64>,

    /// Re-render RFC 2822 publish dates as RFC 3339
    #[arg(long)]
    iso_dates: bool,

    /// Path to a TOML config file (default: ~/.config/sift/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Get the default config file path (~/.config/sift/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config").join("sift").join("config.toml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path).context("Failed to load configuration")?,
        None => Config::default(),
    };

    let url = match args.url.clone().or_else(|| config.feed_url.clone()) {
        Some(url) => url,
        None => {
            eprintln!("Error: no feed URL given.");
            eprintln!();
            eprintln!("Pass one on the command line:");
            eprintln!("  sift http://example.test/feed.xml");
            eprintln!();
            eprintln!("Or set feed_url in ~/.config/sift/config.toml");
            std::process::exit(1);
        }
    };

    let max_items = args.max_items.unwrap_or(config.max_items);
    let refresh = args.refresh.unwrap_or(config.refresh_interval_minutes);
    let iso_dates = args.iso_dates || config.iso_dates;

    let service = FeedService::new(Arc::new(FeedCache::new()), Arc::new(LogReporter));

    let mut request = ItemRequest::new(url.clone())
        .max_items(max_items)
        .refresh_minutes(refresh);
    if iso_dates {
        request = request.extractor(Arc::new(Rfc2822DateExtractor));
    }

    let projection = service
        .request_items(request)
        .await
        .with_context(|| format!("Bad feed request for '{url}'"))?;

    if !projection.has_data() {
        println!("(no items)");
        return Ok(());
    }

    for item in projection {
        let title = item.title.unwrap_or_else(|| "(untitled)".to_string());
        match item.published {
            Some(date) => println!("{date}  {title}"),
            None => println!("{title}"),
        }
        if let Some(link) = item.link {
            println!("    {link}");
        }
    }

    Ok(())
}
