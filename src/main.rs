use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use newswire::catalog::FeedCatalog;
use newswire::config::Config;
use newswire::feed::FeedClient;
use newswire::session::NewsSession;
use newswire::storage::Database;

/// Get the config directory path (~/.config/newswire/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newswire"))
}

#[derive(Parser, Debug)]
#[command(
    name = "newswire",
    about = "Aggregate categorized RSS feeds into one searchable stream"
)]
struct Args {
    /// Config file path (default: ~/.config/newswire/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file path (overrides the config file)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Category to load ("all", or a specific one such as Technology)
    #[arg(long, default_value = "all")]
    category: String,

    /// Search text applied over titles and descriptions
    #[arg(long, default_value = "")]
    search: String,

    /// Page to display (1-based)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Emit the page as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Toggle an article id in the bookmark list, then exit
    #[arg(long, value_name = "ID")]
    toggle_bookmark: Option<String>,

    /// Toggle an article id in the read-later list, then exit
    #[arg(long, value_name = "ID")]
    toggle_read_later: Option<String>,

    /// Keep running, re-aggregating on the configured refresh interval
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("newswire=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)?;

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config_dir.join("news.db"));
    let db_path = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?
        .to_string();
    let db = Database::open(&db_path).await?;

    let convert_endpoint = Url::parse(&config.convert_endpoint)
        .context("Invalid convert_endpoint in config file")?;
    let client = FeedClient::new(convert_endpoint, config.api_key());

    let mut catalog = FeedCatalog::builtin();
    catalog.apply_overrides(&config.sources);

    let session = NewsSession::open(db, client, catalog).await?;

    // One-shot user-state toggles exit without aggregating.
    if let Some(id) = &args.toggle_bookmark {
        session.toggle_bookmark(id).await?;
        println!("Toggled bookmark: {id}");
        return Ok(());
    }
    if let Some(id) = &args.toggle_read_later {
        session.toggle_read_later(id).await?;
        println!("Toggled read-later: {id}");
        return Ok(());
    }

    session.set_category(&args.category).await?;
    if !args.search.is_empty() {
        session.set_search_query(&args.search).await?;
    }
    if args.page > 1 {
        session.set_page(args.page).await?;
    }
    print_page(&session, args.json)?;

    if args.watch {
        let interval = session.settings().refresh_interval();
        let interval = if interval.is_zero() {
            Duration::from_secs(300)
        } else {
            interval
        };
        tracing::info!(seconds = interval.as_secs(), "Watching; Ctrl-C to exit");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(interval) => {
                    session.refresh().await?;
                    print_page(&session, args.json)?;
                }
            }
        }
    }

    Ok(())
}

fn print_page(session: &NewsSession, json: bool) -> Result<()> {
    let articles = session.articles();
    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
    } else if articles.is_empty() {
        println!("No articles.");
    } else {
        for article in &articles {
            let date = article
                .published
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "????-??-?? --:--".to_string());
            let mut marks = String::new();
            if article.is_bookmarked {
                marks.push('*');
            }
            if article.is_read_later {
                marks.push('>');
            }
            println!("{date}  [{}] {}{}", article.source, article.title, marks);
            println!("    {}", article.link);
        }
    }
    if let Some(notice) = session.error() {
        eprintln!("{notice}");
    }
    Ok(())
}
