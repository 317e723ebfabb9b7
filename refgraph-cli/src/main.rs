/*!
Refgraph CLI - Command-line inspector for refgraph bean documents.

Documents are read as they were written: plain JSON or a gzip envelope around
it. Nothing here needs the bean registrations of the application that wrote a
document; every command works on the raw header and body.
*/

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use refgraph_core::format::json::CLASS_KEY;
use refgraph_core::{compression, DocumentHeader, JsonDocument, PersistError, RefId};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "refgraph")]
#[command(about = "Inspect refgraph bean documents")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Require a gzip-compressed document
    #[arg(short, long, global = true)]
    gzip: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the document header
    Header {
        /// Path of the document
        file: PathBuf,
    },
    /// List the items of the document body
    Items {
        /// Path of the document
        file: PathBuf,
    },
    /// Show the frames recorded in the header
    Frames {
        /// Path of the document
        file: PathBuf,
    },
    /// Recompute the body hash and compare it with the header
    Verify {
        /// Path of the document
        file: PathBuf,
    },
}

#[derive(Tabled)]
struct ItemInfo {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Ref ID")]
    ref_id: String,
    #[tabled(rename = "Anti-bean")]
    anti: String,
    #[tabled(rename = "Class")]
    class_name: String,
    #[tabled(rename = "Size")]
    size: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match &cli.command {
        Commands::Header { file } => show_header(&load_document(file, cli.gzip)?),
        Commands::Items { file } => list_items(&load_document(file, cli.gzip)?)?,
        Commands::Frames { file } => show_frames(&load_document(file, cli.gzip)?),
        Commands::Verify { file } => verify_document(&load_document(file, cli.gzip)?)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_document(path: &Path, require_gzip: bool) -> Result<JsonDocument, anyhow::Error> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!(path = %path.display(), bytes = data.len(), "document loaded");

    if require_gzip && !compression::is_gzip(&data) {
        bail!("{} is not a gzip-compressed document", path.display());
    }

    let document = JsonDocument::from_slice(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(document)
}

fn show_header(document: &JsonDocument) {
    let header: &DocumentHeader = &document.header;
    println!("Document Header:");
    println!("  Version: {}", header.version);
    println!("  Document ID: {}", header.document_id);
    println!("  Created: {}", header.created.format("%Y-%m-%d %H:%M:%S"));
    println!("  MIME Type: {}", header.mime_type);
    println!("  Items: {}", document.body.len());
    println!("  Frames: {}", header.frames.len());
    println!("  Body Hash: {}", header.body_hash);

    if !header.item_class.is_empty() {
        println!("  Item Class: {}", header.item_class);
    }
    if !header.description.is_empty() {
        println!("  Description: {}", header.description);
    }
    if let Some(annotations) = &header.annotations {
        let count = annotations
            .get("items")
            .and_then(|items| items.as_array())
            .map_or(0, Vec::len);
        println!("  Annotations: {count}");
    }
}

fn list_items(document: &JsonDocument) -> Result<(), anyhow::Error> {
    let mut items = Vec::with_capacity(document.body.len());
    for (label, bean) in &document.body {
        let ref_id = bean
            .get("refId")
            .and_then(serde_json::Value::as_i64)
            .map(RefId::new)
            .unwrap_or(RefId::NONE);
        let class_name = bean
            .get(CLASS_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");
        let size = serde_json::to_vec(bean)?.len();

        items.push(ItemInfo {
            label: label.clone(),
            ref_id: ref_id.to_string(),
            anti: if ref_id.is_anti() { "yes" } else { "no" }.to_string(),
            class_name: class_name.to_string(),
            size: format_size(size as u64),
        });
    }

    if items.is_empty() {
        println!("No items found");
    } else {
        println!("{}", Table::new(items));
    }
    Ok(())
}

fn show_frames(document: &JsonDocument) {
    if document.header.frames.is_empty() {
        println!("No frames: every item resolves on its own");
        return;
    }

    for (index, frame) in document.header.frames.iter().enumerate() {
        let members: Vec<String> = frame.iter().map(RefId::to_string).collect();
        println!("Frame {}: [{}]", index + 1, members.join(", "));
    }
    info!(
        frames = document.header.frames.len(),
        roots = document.header.framed_roots(),
        "frames listed"
    );
}

fn verify_document(document: &JsonDocument) -> Result<(), anyhow::Error> {
    match document.verify() {
        Ok(()) if document.header.body_hash.is_empty() => {
            println!("✓ Document has no body hash, nothing to verify");
        }
        Ok(()) => {
            println!("✓ Document is valid and integrity check passed");
        }
        Err(PersistError::IntegrityCheckFailed { expected, actual }) => {
            error!("✗ Integrity check failed:");
            error!("  Expected hash: {}", expected);
            error!("  Actual hash: {}", actual);
            return Err(anyhow::anyhow!("Integrity check failed"));
        }
        Err(e) => {
            error!("✗ Failed to verify document: {}", e);
            return Err(e.into());
        }
    }

    document
        .header
        .validate()
        .context("Header is inconsistent")?;
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
