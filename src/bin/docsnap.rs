//! CLI binary for docsnap.
//!
//! A thin shim over the library crate: `serve` hosts the two backend
//! operations and the signed store; `scan` drives one capture → upload →
//! extract → review attempt against a local image file.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use docsnap::{
    AppState, CommitSink, FileFrameSource, HttpAnalyzer, Orchestrator, Phase, PipelineConfig,
    PipelineObserver, ReviewRow, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
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

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Keeps a terminal spinner in sync with the attempt's phase.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_phase_change(&self, phase: &Phase) {
        let msg = match phase {
            Phase::Captured => "Frame captured",
            Phase::Uploading => "Uploading…",
            Phase::Analyzing => "Analyzing…",
            Phase::Reviewing => "Results ready",
            _ => return,
        };
        self.bar.set_message(msg);
    }
}

/// Commit sink that prints the finalized rows as JSON on stdout.
struct StdoutSink;

impl CommitSink for StdoutSink {
    fn commit(&self, rows: &[ReviewRow]) {
        if let Ok(json) = serde_json::to_string_pretty(rows) {
            println!("{json}");
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Host the backend operations with a remote analysis engine
  docsnap serve --bucket paystub-images \
      --base-url http://127.0.0.1:8787 \
      --engine-url http://analysis.internal/analyze

  # Scan a document photo against a running backend
  docsnap scan paystub.jpg \
      --authorize-url http://127.0.0.1:8787/authorize \
      --extract-url http://127.0.0.1:8787/extract \
      --bucket paystub-images

  # Correct the net-pay row before committing
  docsnap scan paystub.jpg ... --edit 1=987,000

ENVIRONMENT VARIABLES:
  DOCSNAP_SIGNING_SECRET  Secret the store signs upload URLs with (serve)
  RUST_LOG                Tracing filter, e.g. docsnap=debug
"#;

/// Capture, upload, and field-extract paper documents.
#[derive(Parser, Debug)]
#[command(
    name = "docsnap",
    version,
    about = "Capture a paper document, extract fields with analysis queries, review and commit",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCSNAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "DOCSNAP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host the authorize/extract operations and the signed object store.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOCSNAP_BIND", default_value = "127.0.0.1:8787")]
        bind: SocketAddr,

        /// Storage container name.
        #[arg(long, env = "DOCSNAP_BUCKET")]
        bucket: String,

        /// Public base URL clients reach this service under.
        #[arg(long, env = "DOCSNAP_BASE_URL")]
        base_url: String,

        /// Secret for signing upload URLs.
        #[arg(long, env = "DOCSNAP_SIGNING_SECRET", hide_env_values = true)]
        secret: String,

        /// Upload authorization validity window in seconds.
        #[arg(long, env = "DOCSNAP_UPLOAD_TTL", default_value_t = 180)]
        ttl: i64,

        /// Endpoint of the document-analysis engine.
        #[arg(long, env = "DOCSNAP_ENGINE_URL")]
        engine_url: String,
    },

    /// Run one capture → upload → extract → review attempt on an image.
    Scan {
        /// Image file standing in for the camera frame.
        input: PathBuf,

        /// Endpoint of the authorize operation.
        #[arg(long, env = "DOCSNAP_AUTHORIZE_URL")]
        authorize_url: String,

        /// Endpoint of the extract operation.
        #[arg(long, env = "DOCSNAP_EXTRACT_URL")]
        extract_url: String,

        /// Storage container the extract operation reads from.
        #[arg(long, env = "DOCSNAP_BUCKET")]
        bucket: String,

        /// Edit a row before committing, as INDEX=VALUE. Repeatable.
        #[arg(long = "edit", value_name = "INDEX=VALUE")]
        edits: Vec<String>,

        /// Review without committing (rows are printed, the sink is
        /// never invoked).
        #[arg(long)]
        no_commit: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "docsnap=debug"
    } else if cli.quiet {
        "error"
    } else {
        "docsnap=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            bucket,
            base_url,
            secret,
            ttl,
            engine_url,
        } => serve(bind, bucket, base_url, secret, ttl, engine_url).await,
        Command::Scan {
            input,
            authorize_url,
            extract_url,
            bucket,
            edits,
            no_commit,
        } => {
            scan(
                input,
                authorize_url,
                extract_url,
                bucket,
                edits,
                no_commit,
                cli.quiet,
            )
            .await
        }
    }
}

async fn serve(
    bind: SocketAddr,
    bucket: String,
    base_url: String,
    secret: String,
    ttl: i64,
    engine_url: String,
) -> Result<()> {
    let config = ServerConfig::builder()
        .bucket(bucket)
        .public_base_url(base_url)
        .signing_secret(secret)
        .upload_ttl_secs(ttl)
        .build()
        .map_err(|e| anyhow!(e))?;

    let state = AppState::new(config, Arc::new(HttpAnalyzer::new(engine_url)));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;

    eprintln!("{} listening on {}", bold("docsnap"), bind);
    docsnap::server::serve(listener, state)
        .await
        .context("server failed")
}

async fn scan(
    input: PathBuf,
    authorize_url: String,
    extract_url: String,
    bucket: String,
    edits: Vec<String>,
    no_commit: bool,
    quiet: bool,
) -> Result<()> {
    let edits = parse_edits(&edits)?;

    let spinner = (!quiet).then(SpinnerObserver::new);
    let mut builder = PipelineConfig::builder()
        .authorize_url(authorize_url)
        .extract_url(extract_url)
        .bucket(bucket);
    if let Some(ref obs) = spinner {
        builder = builder.observer(Arc::clone(obs) as Arc<dyn PipelineObserver>);
    }
    let config = builder.build().map_err(|e| anyhow!(e))?;

    let orchestrator = Orchestrator::new(config).map_err(|e| anyhow!(e))?;
    let camera = FileFrameSource::open(&input)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("cannot capture from '{}'", input.display()))?;

    if !orchestrator.capture_from(&camera) {
        bail!("capture failed: no frame available");
    }

    let outcome = orchestrator.upload_and_analyze().await;
    if let Some(ref s) = spinner {
        s.finish();
    }

    let mut sheet = match outcome {
        Ok(Some(sheet)) => sheet,
        Ok(None) => bail!("attempt was superseded before it finished"),
        Err(e) => {
            eprintln!("{} {}", red("✗"), e);
            bail!("scan failed");
        }
    };

    if !edits.is_empty() {
        sheet.begin_edit();
        for (index, value) in edits {
            if !sheet.set_value(index, value) {
                bail!("no review row at index {index}");
            }
        }
    }

    if !quiet {
        eprintln!("{}", bold("Extracted fields:"));
        for (i, row) in sheet.rows().iter().enumerate() {
            let marker = if row.value.is_empty() {
                red("∅")
            } else {
                green("✓")
            };
            eprintln!(
                "  {marker} row {i}: {}  {}",
                bold(&row.value),
                dim(&row.confidence)
            );
        }
    }

    if no_commit {
        sheet.discard();
    } else {
        sheet.commit(&StdoutSink);
    }
    orchestrator.close_review();
    Ok(())
}

fn parse_edits(edits: &[String]) -> Result<Vec<(usize, String)>> {
    edits
        .iter()
        .map(|raw| {
            let (index, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("--edit expects INDEX=VALUE, got '{raw}'"))?;
            let index: usize = index
                .parse()
                .with_context(|| format!("invalid row index in '{raw}'"))?;
            Ok((index, value.to_string()))
        })
        .collect()
}
