use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use shortlinks::models::{ClickEvent, LinkEntryRequest, ValidityInput};

#[derive(Parser)]
#[command(name = "shortlinks-cli")]
#[command(about = "Command line client for the shortlinks API", long_about = None)]
struct Cli {
    /// Base URL of the API server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a single URL
    Shorten {
        url: String,
        /// Custom shortcode (3-10 alphanumeric characters)
        #[arg(long)]
        code: Option<String>,
        /// Validity in minutes
        #[arg(long)]
        validity: Option<i64>,
    },
    /// Shorten every entry of a JSON array file in one batch
    Batch {
        /// File holding `[{"originalUrl": .., "customShortcode": .., "validityMinutes": ..}]`
        file: std::path::PathBuf,
    },
    /// List links
    List {
        /// active or expired
        #[arg(long)]
        state: Option<String>,
    },
    /// Show one link with its click history
    Show { id: u64 },
    /// Delete a link
    Delete { id: u64 },
    /// Record a click and print the destination
    Visit {
        shortcode: String,
        #[arg(long)]
        source: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRow {
    id: u64,
    original_url: String,
    shortcode: String,
    short_url: String,
    expires_at: DateTime<Utc>,
    click_count: u64,
    #[serde(default)]
    clicks: Vec<ClickEvent>,
    expired: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.api_url.trim_end_matches('/');

    match cli.command {
        Commands::Shorten {
            url,
            code,
            validity,
        } => {
            let entry = LinkEntryRequest {
                original_url: Some(url),
                custom_shortcode: code,
                validity_minutes: validity.map(ValidityInput::Minutes),
            };
            submit(&client, base, vec![entry]).await?;
        }
        Commands::Batch { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let entries: Vec<LinkEntryRequest> =
                serde_json::from_str(&raw).context("batch file must be a JSON array of entries")?;
            submit(&client, base, entries).await?;
        }
        Commands::List { state } => {
            let url = match state {
                Some(state) => format!("{base}/links?state={state}"),
                None => format!("{base}/links"),
            };
            let links: Vec<LinkRow> = expect_ok(client.get(url).send().await?).await?.json().await?;
            print_table(&links);
        }
        Commands::Show { id } => {
            let response = client.get(format!("{base}/links/{id}")).send().await?;
            let link: LinkRow = expect_ok(response).await?.json().await?;
            print_table(std::slice::from_ref(&link));
            println!();
            if link.clicks.is_empty() {
                println!("No clicks yet.");
            } else {
                println!("{:<25} {:<15} {:<35} {}", "Timestamp", "Source", "Location", "Client");
                println!("{}", "-".repeat(100));
                for click in &link.clicks {
                    println!(
                        "{:<25} {:<15} {:<35} {}",
                        local_time(click.timestamp),
                        click.source_label,
                        click.location_label,
                        click.client_signature
                    );
                }
            }
        }
        Commands::Delete { id } => {
            let response = client.delete(format!("{base}/links/{id}")).send().await?;
            match response.status() {
                StatusCode::NO_CONTENT => println!("✓ Deleted link {id}"),
                StatusCode::NOT_FOUND => println!("⚠ Link {id} does not exist"),
                other => bail!("unexpected status {other}: {}", response.text().await?),
            }
        }
        Commands::Visit { shortcode, source } => {
            let mut body = serde_json::Map::new();
            if let Some(source) = source {
                body.insert("sourceLabel".to_string(), Value::String(source));
            }
            let response = client
                .post(format!("{base}/links/{shortcode}/visit"))
                .header(reqwest::header::USER_AGENT, "shortlinks-cli")
                .json(&Value::Object(body))
                .send()
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let visit: Value = response.json().await?;
                    println!("→ {}", visit["originalUrl"].as_str().unwrap_or_default());
                }
                StatusCode::GONE => println!("⚠ Shortcode '{shortcode}' has expired"),
                StatusCode::NOT_FOUND => println!("⚠ Shortcode '{shortcode}' does not exist"),
                other => bail!("unexpected status {other}: {}", response.text().await?),
            }
        }
    }

    Ok(())
}

async fn submit(client: &Client, base: &str, entries: Vec<LinkEntryRequest>) -> Result<()> {
    let response = client
        .post(format!("{base}/links"))
        .json(&entries)
        .send()
        .await?;

    if response.status() == StatusCode::BAD_REQUEST {
        let body: Value = response.json().await?;
        println!("✗ Batch rejected, nothing was created");
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            println!("  {error}");
        }
        if let Some(entries) = body.get("errors").and_then(Value::as_object) {
            for (index, fields) in entries {
                if let Some(fields) = fields.as_object() {
                    for (field, kind) in fields {
                        println!("  entry {index}: {field} -> {}", kind.as_str().unwrap_or("?"));
                    }
                }
            }
        }
        return Ok(());
    }

    let links: Vec<LinkRow> = expect_ok(response).await?.json().await?;
    println!("✓ Shortened {} URL(s)", links.len());
    print_table(&links);
    Ok(())
}

async fn expect_ok(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    bail!("request failed with {status}: {}", response.text().await?)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn print_table(links: &[LinkRow]) {
    if links.is_empty() {
        println!("No links found.");
        return;
    }

    println!(
        "{:<6} {:<12} {:<8} {:<20} {:<9} {:<35} {}",
        "ID", "Shortcode", "Clicks", "Expires", "State", "Short URL", "Original URL"
    );
    println!("{}", "-".repeat(120));
    for link in links {
        println!(
            "{:<6} {:<12} {:<8} {:<20} {:<9} {:<35} {}",
            link.id,
            link.shortcode,
            link.click_count,
            local_time(link.expires_at),
            if link.expired { "expired" } else { "active" },
            link.short_url,
            link.original_url
        );
    }
}
