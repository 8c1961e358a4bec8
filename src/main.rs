//! Bloodhound-RS demo
//!
//! Builds an engine over JSON records from the configured sources and
//! prints the suggestions for each query given on the command line.

use anyhow::Result;
use bloodhound_rs::{config, tokenizers, Bloodhound};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    info!("Starting Bloodhound-RS v{}", bloodhound_rs::VERSION);

    let mut args = std::env::args().skip(1).peekable();
    let mut local_file: Option<PathBuf> = None;
    let mut fields: Vec<String> = Vec::new();
    let mut queries: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("bloodhound-rs {}", bloodhound_rs::VERSION);
                return Ok(());
            }
            "-l" | "--local" => local_file = args.next().map(PathBuf::from),
            "-f" | "--field" => fields.extend(args.next()),
            _ => queries.push(arg),
        }
    }

    let settings = config::load()?;

    let mut builder = Bloodhound::<Value>::builder().settings(&settings);
    if let Some(path) = local_file {
        let data: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        info!("Loaded {} local records from {}", data.len(), path.display());
        builder = builder.local(data);
    }
    if !fields.is_empty() {
        builder = builder.datum_tokenizer(tokenizers::obj::whitespace(fields));
    }

    let engine = builder.build()?;

    if let Err(e) = engine.initialize(false).await {
        warn!("{}", e);
    }

    for query in &queries {
        let suggestions = engine.get(query).await;
        println!("{}", query);
        for suggestion in suggestions {
            println!("  {}", suggestion);
        }
    }

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
Bloodhound-RS v{}
Suggestions from local, prefetched and remote JSON records

USAGE:
    bloodhound-rs [OPTIONS] <QUERY>...

OPTIONS:
    -l, --local <FILE>     JSON array of local records
    -f, --field <NAME>     Record field to tokenize (repeatable)
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    BLOODHOUND_SETTINGS_PATH        Path to bloodhound.yml
    BLOODHOUND_LIMIT                Suggestions per query
    BLOODHOUND_PREFETCH_URL         Prefetch URL
    BLOODHOUND_PREFETCH_THUMBPRINT  Prefetch dataset identifier
    BLOODHOUND_REMOTE_URL           Remote URL template (%QUERY wildcard)
    BLOODHOUND_STORAGE_DIR          Persist the prefetch cache in this directory
    BLOODHOUND_REQUEST_TIMEOUT      Request timeout in seconds
    RUST_LOG                        Log filter
"#,
        bloodhound_rs::VERSION
    );
}
