//! docpick: browse, filter and select documents from the command line.
//!
//! Runs one picker session against the document service: loads the
//! filtered catalog from both sources, optionally previews a document,
//! toggles the requested picks and prints the confirmed selection.

use clap::{Parser, ValueEnum};
use docpick_catalog::{
    ConfirmedSelection, PickerSession, SelectionMode, SelectionSink, SessionConfig, ToggleOutcome,
};
use docpick_client::{ClientConfig, HttpDocumentBackend};
use docpick_core::{Document, ReferenceData};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docpick")]
#[command(author, version, about = "Browse, filter and select documents")]
struct Cli {
    /// Document service base URL (overrides DOCPICK_API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Search text matched against document names
    #[arg(short, long)]
    query: Option<String>,

    /// Restrict to one dataset
    #[arg(short, long)]
    dataset: Option<String>,

    /// Require a tag (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Selection mode: single or multiple
    #[arg(short, long)]
    mode: Option<SelectionMode>,

    /// Maximum selections in multiple mode
    #[arg(long)]
    max: Option<usize>,

    /// Ids already selected by the caller (repeatable)
    #[arg(long = "selected")]
    selected: Vec<String>,

    /// Ids to toggle after the catalog loads (repeatable)
    #[arg(short, long = "pick")]
    picks: Vec<String>,

    /// Show a content preview for this document id
    #[arg(long)]
    preview: Option<String>,

    /// Confirm as soon as a document is picked (single mode)
    #[arg(long)]
    confirm_on_select: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Prints the confirmed selection to stdout.
struct StdoutSink {
    format: OutputFormat,
}

impl SelectionSink for StdoutSink {
    fn on_confirm(&mut self, selection: ConfirmedSelection) {
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(&selection) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error: failed to encode selection: {}", e),
            },
            OutputFormat::Text => {
                println!("Selected:");
                for doc in selection.documents() {
                    println!("  {}  {}", doc.id, doc.name);
                }
            }
        }
    }

    fn on_upload_error(&mut self, message: &str) {
        eprintln!("Upload failed: {}", message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = Cli::parse();

    let mut client_config = ClientConfig::from_env();
    if let Some(base) = cli.api_base.clone() {
        client_config.base_url = base;
    }

    let mut config = SessionConfig::from_env()?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(max) = cli.max {
        config.max_selections = max;
    }
    config = config
        .with_external_ids(cli.selected.iter().cloned())
        .with_confirm_on_select(cli.confirm_on_select);

    let backend = Arc::new(HttpDocumentBackend::new(client_config)?);
    let mut session = PickerSession::open(backend, config)?.with_sink(Box::new(StdoutSink {
        format: cli.format,
    }));

    session.load_reference_data().await?;

    if let Some(query) = cli.query.as_deref() {
        session.set_query(query)?;
    }
    if let Some(dataset) = cli.dataset.clone() {
        session.set_dataset(Some(dataset))?;
    }
    if !cli.tags.is_empty() {
        session.set_tags(cli.tags.iter().cloned())?;
    }

    session.refresh().await?;
    print_catalog(&session, cli.format)?;

    if let Some(id) = cli.preview.as_deref() {
        match session.preview(id).await {
            Ok(Some(preview)) => println!("\nPreview of {}:\n{}\n", preview.document_id, preview.text),
            Ok(None) => println!("\nNo content to preview for {}\n", id),
            Err(e) => eprintln!("Warning: preview of {} failed: {}", id, e),
        }
    }

    for id in &cli.picks {
        if session.is_closed() {
            break;
        }
        match session.toggle(id) {
            Ok(ToggleOutcome::Rejected(violation)) => eprintln!("Warning: {}", violation),
            Ok(_) => {}
            Err(e) => eprintln!("Warning: cannot toggle {}: {}", id, e),
        }
    }

    if session.is_closed() {
        return Ok(());
    }
    if session.can_confirm() {
        session.confirm()?;
    } else {
        info!(session_id = %session.id(), "Nothing selected");
        session.cancel();
    }

    Ok(())
}

fn print_catalog(session: &PickerSession, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let view = serde_json::json!({
                "status": session.status(),
                "banner": session.banner(),
                "documents": session.catalog(),
                "selected": session.selected().iter().map(|d| &d.id).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Text => {
            if let Some(banner) = session.banner() {
                println!("! {}", banner);
            }
            if session.catalog().is_empty() {
                println!("No documents found.");
            }
            for doc in session.catalog() {
                let marker = if session.selected().iter().any(|d| d.id == doc.id) {
                    "[x]"
                } else {
                    "[ ]"
                };
                println!("{} {}", marker, describe(doc, session.reference()));
            }
        }
    }
    Ok(())
}

fn describe(doc: &Document, reference: &ReferenceData) -> String {
    let mut line = format!(
        "{}  {}  ({}, {}, {} bytes, {})",
        doc.id,
        doc.name,
        doc.metadata.doc_type,
        doc.metadata.source,
        doc.metadata.size,
        doc.metadata.created_at.format("%Y-%m-%d"),
    );
    if let Some(name) = doc
        .metadata
        .dataset_id
        .as_deref()
        .and_then(|id| reference.dataset_name(id))
    {
        line.push_str(&format!("  dataset: {}", name));
    }
    let tags: Vec<&str> = doc
        .metadata
        .tag_ids
        .iter()
        .flatten()
        .filter_map(|id| reference.tag(id).map(|t| t.name.as_str()))
        .collect();
    if !tags.is_empty() {
        line.push_str(&format!("  tags: {}", tags.join(", ")));
    }
    line
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "docpick=info")
///
/// Console output goes to stderr so stdout stays machine-readable.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "docpick=info,docpick_catalog=info,docpick_client=warn".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docpick.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}
