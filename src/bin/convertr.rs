//! CLI binary for convertr-client.
//!
//! A thin shim over the library crate: maps CLI flags to `ClientConfig`,
//! drives one workflow session through `WorkflowHandle`, and renders the
//! display hooks on the terminal.

use anyhow::{bail, Context, Result};
use clap::Parser;
use convertr_client::{
    ApiClient, ClientConfig, ConversionService, DisplayHandle, LocalFile, NoopDisplay,
    WorkflowDisplay, WorkflowDriver, WorkflowError, WorkflowSnapshot, WorkflowState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal display using indicatif ─────────────────────────────────────────

/// Terminal rendering of the workflow display hooks: a spinner for the
/// loading indicator and one coloured line per visible change.
struct TerminalDisplay {
    /// Spinner for the in-flight request; replaced on every `show_loading`.
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalDisplay {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
        })
    }

    /// Print above the spinner when one is active so lines don't interleave.
    fn line(&self, msg: String) {
        match self.spinner.lock().unwrap().as_ref() {
            Some(bar) => bar.println(msg),
            None => eprintln!("{msg}"),
        }
    }
}

impl WorkflowDisplay for TerminalDisplay {
    fn show_file_info(&self, name: &str, size_bytes: u64) {
        self.line(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(name),
            dim(&format!("({})", convertr_client::model::format_size(size_bytes)))
        ));
    }

    fn render_format_options(&self, options: &[String]) {
        self.line(format!("  Available formats: {}", options.join(", ")));
    }

    fn set_active_format(&self, format: &str) {
        self.line(format!("  {} target: {}", cyan("→"), bold(format)));
    }

    fn show_loading(&self, label: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Some(old) = self.spinner.lock().unwrap().replace(bar) {
            old.finish_and_clear();
        }
    }

    fn hide_loading(&self) {
        if let Some(bar) = self.spinner.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    fn show_error(&self, message: &str) {
        self.line(format!("{} {}", red("✗"), red(message)));
    }

    fn show_success(&self, download_url: &str, text: &str) {
        self.line(format!("{} {}  {}", green("✔"), bold(text), dim(download_url)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a document; the single eligible target is picked automatically
  convertr photo.png

  # Pick the target format explicitly and save the result
  convertr report.docx --to pdf -o report.pdf

  # Save into a directory using the server's filename
  convertr slides.pptx --to pdf -o ./converted/

  # Show which conversions the server supports
  convertr --list-formats

  # Talk to a remote server with a token
  convertr --server https://convert.example.com --token $TOKEN report.docx --to txt

  # Machine-readable final state
  convertr --json report.docx --to pdf

ENVIRONMENT VARIABLES:
  CONVERTR_SERVER    Server base URL (default http://localhost:3001)
  CONVERTR_TOKEN     Bearer token sent with conversion requests
  CONVERTR_TIMEOUT   Per-request timeout in seconds
  CONVERTR_TO        Default target format
  RUST_LOG           Override log filtering (e.g. convertr_client=debug)
"#;

/// Convert files through a Convertr server.
#[derive(Parser, Debug)]
#[command(
    name = "convertr",
    version,
    about = "Convert files through a Convertr server",
    long_about = "Upload a local file to a Convertr server, choose a target format, \
request the conversion and fetch the converted artifact.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file to convert.
    #[arg(required_unless_present = "list_formats")]
    input: Option<PathBuf>,

    /// Target format (e.g. pdf, txt). Required when several are eligible.
    #[arg(short, long, env = "CONVERTR_TO")]
    to: Option<String>,

    /// Save the converted file here (a directory keeps the server's filename).
    #[arg(short, long, env = "CONVERTR_OUTPUT")]
    output: Option<PathBuf>,

    /// Server base URL.
    #[arg(long, env = "CONVERTR_SERVER", default_value = convertr_client::config::DEFAULT_BASE_URL)]
    server: String,

    /// API path prefix on the server.
    #[arg(long, env = "CONVERTR_API_PREFIX", default_value = convertr_client::config::DEFAULT_API_PREFIX)]
    api_prefix: String,

    /// Bearer token for conversion requests.
    #[arg(long, env = "CONVERTR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Per-request timeout in seconds (default: transport default).
    #[arg(long, env = "CONVERTR_TIMEOUT")]
    timeout: Option<u64>,

    /// Print the server's format catalog and exit.
    #[arg(long)]
    list_formats: bool,

    /// Print the final workflow snapshot as JSON.
    #[arg(long, env = "CONVERTR_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CONVERTR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CONVERTR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The terminal display already narrates each stage, so library INFO
    // logs are suppressed unless explicitly requested.
    let show_display = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_display {
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

    // ── Build client ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let api = Arc::new(ApiClient::new(config).context("Failed to create API client")?);

    // ── Catalog-only mode ────────────────────────────────────────────────
    if cli.list_formats {
        let catalog = api
            .fetch_catalog()
            .await
            .map_err(|e| match e {
                WorkflowError::CatalogUnavailable(reason) => {
                    anyhow::anyhow!("Failed to load formats: {reason}")
                }
                other => anyhow::Error::new(other),
            })?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&catalog).context("Failed to serialise catalog")?
            );
        } else {
            for (source, targets) in catalog.iter() {
                println!("{:<8} → {}", source, targets.join(", "));
            }
        }
        return Ok(());
    }

    let input = cli
        .input
        .as_ref()
        .context("An input file is required")?;
    let file = LocalFile::from_path(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    // ── Run the workflow ─────────────────────────────────────────────────
    let display: DisplayHandle = if show_display {
        TerminalDisplay::new()
    } else {
        Arc::new(NoopDisplay)
    };
    let (handle, driver) = WorkflowDriver::spawn(api.clone(), display);

    handle.wait_for(|s| s.catalog_loaded).await?;

    handle.select_file(file)?;
    let snap = handle
        .wait_for(|s| {
            s.state == WorkflowState::Uploaded
                || (s.state == WorkflowState::FileSelected && s.last_error.is_some())
        })
        .await?;
    if snap.state == WorkflowState::FileSelected {
        bail!("Upload failed: {}", describe_error(&snap));
    }
    if snap.options.is_empty() {
        bail!("{}", describe_error(&snap));
    }

    match cli.to.as_deref() {
        Some(target) => {
            let target = target.trim().to_lowercase();
            if !snap.options.iter().any(|o| *o == target) {
                bail!(
                    "'{}' is not available for this file. Choose one of: {}",
                    target,
                    snap.options.join(", ")
                );
            }
            handle.choose_format(target)?;
        }
        None if !snap.ready_to_convert => {
            bail!(
                "Several target formats are available: {}. Pick one with --to.",
                snap.options.join(", ")
            );
        }
        None => {}
    }
    handle.wait_for(|s| s.ready_to_convert).await?;

    handle.convert()?;
    let snap = handle
        .wait_for(|s| {
            s.state == WorkflowState::Complete
                || (s.state == WorkflowState::Uploaded && s.last_error.is_some())
        })
        .await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snap).context("Failed to serialise snapshot")?
        );
    }

    let Some(result) = snap.result.as_ref() else {
        bail!("Conversion failed: {}", describe_error(&snap));
    };

    // ── Fetch the artifact ───────────────────────────────────────────────
    if let Some(ref output) = cli.output {
        let path = if output.is_dir() {
            api.download_to(result, output)
                .await
                .context("Download failed")?
        } else {
            api.download_as(result, output)
                .await
                .context("Download failed")?;
            output.clone()
        };
        if !cli.quiet && !cli.json {
            eprintln!("{}  saved to {}", green("✔"), bold(&path.display().to_string()));
        }
    } else if !cli.json {
        println!("{}", snap.download_url.as_deref().unwrap_or_default());
    }

    drop(handle);
    driver.await.context("Workflow driver panicked")?;
    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.clone())
        .api_prefix(cli.api_prefix.clone());

    if let Some(ref token) = cli.token {
        builder = builder.auth_token(token.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

/// The snapshot's error text, or a generic fallback.
fn describe_error(snap: &WorkflowSnapshot) -> String {
    snap.last_error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| format!("workflow stopped in state '{}'", snap.state))
}
