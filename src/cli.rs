use clap::{Parser, Subcommand};
use intentbox::ResultType;
use intentbox::intent::ContentType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "intentbox")]
#[command(about = "Open resource references as typed results", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $INTENTBOX_CONFIG, then config/intentbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a URI or path and print the result
    Open(OpenArgs),
    /// Print the routing table in evaluation order
    Routes,
}

#[derive(clap::Args, Debug)]
pub struct OpenArgs {
    /// URI, path or application-specific reference
    pub uri: String,

    /// Skip content type resolution and use this type
    #[arg(long)]
    pub content_type: Option<ContentType>,

    /// Fail unless the result is of this type (e.g. layer, document, text)
    #[arg(long)]
    pub require: Option<ResultType>,

    /// Prefer handlers producing this type when several match
    #[arg(long)]
    pub expect: Option<ResultType>,

    /// Bypass the routing table and run this handler
    #[arg(long)]
    pub handler: Option<String>,

    /// Metadata passed to the handler, as key=value
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub meta: Vec<(String, String)>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
