//! CLI binary for card-reader.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServiceConfig`, then either runs the HTTP service or makes a
//! single extraction/transcription call for a local image.

use anyhow::{Context, Result};
use card_reader::{
    normalize_from_bytes, serve, CardExtraction, ImageLabel, ModelGateway, ServiceConfig,
};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  card-reader serve --bind 0.0.0.0:8000

  # Read one business card and print the fields
  card-reader extract card.jpg

  # Same, raw JSON as returned by POST /extract
  card-reader extract --json card.jpg

  # Transcribe an image to Markdown
  card-reader markdown receipt.png

HTTP ROUTES (serve):
  GET  /                  service metadata
  GET  /status            liveness
  POST /extract           {"image_base64": "data:image/png;base64,..."}
  POST /direct-markdown   multipart upload, field "file"

ENVIRONMENT VARIABLES:
  CARD_READER_ENDPOINT    Chat-completions URL of the vision model
  CARD_READER_API_KEY     Bearer token for the model endpoint
  CARD_READER_MODEL       Model identifier
  CARD_READER_BIND        Listen address for `serve`
  RUST_LOG                Override log filter (e.g. card_reader=debug)
"#;

/// Read business cards and transcribe images with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "card-reader",
    version,
    about = "Read business cards and transcribe images with a vision LLM",
    long_about = "HTTP service (and one-shot CLI) that forwards images to an OpenAI-compatible \
chat-completions endpoint and returns structured business-card JSON or Markdown text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "CARD_READER_ENDPOINT")]
    endpoint: String,

    /// Bearer token for the endpoint.
    #[arg(long, env = "CARD_READER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Vision model identifier.
    #[arg(long, env = "CARD_READER_MODEL")]
    model: String,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "CARD_READER_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Max output tokens for structured extraction.
    #[arg(long, env = "CARD_READER_EXTRACT_MAX_TOKENS", default_value_t = 1024)]
    extract_max_tokens: u32,

    /// Max output tokens for Markdown transcription.
    #[arg(long, env = "CARD_READER_MARKDOWN_MAX_TOKENS", default_value_t = 600)]
    markdown_max_tokens: u32,

    /// Media type label for outgoing images: jpeg (always image/jpeg) or preserve.
    #[arg(long, env = "CARD_READER_IMAGE_LABEL", default_value = "jpeg")]
    image_label: String,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, env = "CARD_READER_EXTRACT_PROMPT")]
    extract_prompt: Option<PathBuf>,

    /// Path to a text file replacing the built-in transcription prompt.
    #[arg(long, env = "CARD_READER_MARKDOWN_PROMPT")]
    markdown_prompt: Option<PathBuf>,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "CARD_READER_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Service name reported by GET /.
    #[arg(long, env = "CARD_READER_SERVICE_NAME", default_value = "Card Reader Service")]
    service_name: String,

    /// Deployment environment reported by GET /.
    #[arg(long, env = "CARD_READER_ENVIRONMENT", default_value = "production")]
    environment: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARD_READER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CARD_READER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Listen address.
        #[arg(long, env = "CARD_READER_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Extract business-card fields from a local image.
    Extract {
        /// Image file to read.
        image: PathBuf,

        /// Print the model's JSON instead of a field summary.
        #[arg(long)]
        json: bool,
    },

    /// Transcribe a local image to Markdown.
    Markdown {
        /// Image file to read.
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    match &cli.command {
        Command::Serve { bind } => {
            serve(bind, config).await.context("Server failed")?;
        }
        Command::Extract { image, json } => {
            let gateway = ModelGateway::new(Arc::new(config)).context("Invalid configuration")?;
            let payload = read_image(image).await?;
            let value = gateway
                .extract(&payload)
                .await
                .context("Extraction failed")?;
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&value).context("Failed to serialise output")?
                );
            } else {
                let card = CardExtraction::from_value(&value)
                    .context("Model output does not match the card schema; rerun with --json")?;
                print_card(&card);
            }
        }
        Command::Markdown { image } => {
            let gateway = ModelGateway::new(Arc::new(config)).context("Invalid configuration")?;
            let payload = read_image(image).await?;
            let markdown = gateway
                .transcribe_markdown(&payload)
                .await
                .context("Transcription failed")?;
            println!("{markdown}");
        }
    }

    Ok(())
}

/// Map CLI args to `ServiceConfig`.
async fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let image_label: ImageLabel = cli
        .image_label
        .parse()
        .context("Invalid --image-label")?;

    let mut builder = ServiceConfig::builder()
        .endpoint(&cli.endpoint)
        .api_key(&cli.api_key)
        .model(&cli.model)
        .request_timeout_secs(cli.timeout)
        .extract_max_tokens(cli.extract_max_tokens)
        .markdown_max_tokens(cli.markdown_max_tokens)
        .image_label(image_label)
        .max_upload_bytes(cli.max_upload_bytes)
        .service_name(&cli.service_name)
        .environment(&cli.environment);

    if let Some(ref path) = cli.extract_prompt {
        builder = builder.extract_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.markdown_prompt {
        builder = builder.markdown_prompt(read_prompt(path).await?);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

/// Load a local image the same way an upload is handled.
async fn read_image(path: &Path) -> Result<card_reader::ImagePayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {:?}", path))?;
    let content_type = content_type_for(path);
    Ok(normalize_from_bytes(&bytes, content_type.as_deref()))
}

fn content_type_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let subtype = match ext.as_str() {
        "jpg" | "jpeg" => "jpeg",
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        "bmp" => "bmp",
        "tif" | "tiff" => "tiff",
        _ => return None,
    };
    Some(format!("image/{subtype}"))
}

fn print_card(card: &CardExtraction) {
    let info = &card.extracted_info;
    if info.is_empty() {
        eprintln!("No card details found.");
        return;
    }
    fn list(v: &[String]) -> String {
        v.join(", ")
    }
    for (label, value) in [
        ("Name", list(&info.name)),
        ("Designation", info.designation.clone()),
        ("Company", info.company_name.clone()),
        ("Email", list(&info.email)),
        ("Phone", list(&info.phone)),
        ("Website", info.website.clone()),
        ("Address", info.address.clone()),
        ("Category", list(&info.additional_info.category)),
        ("Other", list(&info.additional_info.other)),
    ] {
        if !value.is_empty() {
            println!("{:<13}{}", format!("{label}:"), value);
        }
    }
}
