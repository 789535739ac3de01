//! Trellis schema previewer
//!
//! Renders a schema document at a breakpoint and prints the element tree.
//!
//! Usage:
//!   trellis-preview --schema page.json --fixtures data.json --breakpoint lg

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use trellis_preview::{preview, PreviewOptions};
use trellis_render::DEFAULT_CONFIG_FILE;
use trellis_schema::Breakpoint;

#[derive(Parser, Debug)]
#[command(name = "trellis-preview")]
#[command(about = "Render a Trellis schema document against fixture data")]
struct Args {
    /// Schema document to render
    #[arg(short, long)]
    schema: PathBuf,

    /// Fixture file seeding the in-memory data source
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Active breakpoint (xs, sm, md, lg, xl, 2xl)
    #[arg(short, long)]
    breakpoint: Option<Breakpoint>,

    /// JSON file used as the `user` scope of expressions
    #[arg(short, long)]
    user: Option<PathBuf>,

    /// Render configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print the root's resolved props instead of rendering
    #[arg(long)]
    props_only: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let options = PreviewOptions {
        schema: args.schema,
        fixtures: args.fixtures,
        breakpoint: args.breakpoint,
        user: args.user,
        config: args.config,
        props_only: args.props_only,
    };
    let output = preview(&options).await?;
    let pretty = serde_json::to_string_pretty(&output).context("Failed to format output")?;
    println!("{pretty}");
    Ok(())
}
