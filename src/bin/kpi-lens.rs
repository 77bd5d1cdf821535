//! CLI binary for kpi-lens.
//!
//! A thin shim over the library crate: maps flags to `AnalysisConfig`, then
//! either serves the web UI, analyses one image from the terminal, or checks
//! that the model is pulled.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use kpi_lens::server::{self, AppState};
use kpi_lens::{
    analyze_to_report_file, AnalysisConfig, Analyzer, ModelStatus, ReportConfig,
};
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the web UI on http://127.0.0.1:8501
  kpi-lens serve

  # Analyse a screenshot from the terminal
  kpi-lens analyze hr_dashboard.png --objective "Monitor headcount by department"

  # Analyse and write the branded PDF report
  kpi-lens analyze sales.jpg --objective "Track revenue growth" -o report.pdf

  # Use another vision model on a remote daemon
  kpi-lens --ollama-host gpu-box:11434 --model llava:13b serve

  # Is the model pulled?
  kpi-lens check

ENVIRONMENT VARIABLES:
  OLLAMA_HOST       Ollama base URL (default http://localhost:11434)
  KPI_LENS_MODEL    Vision model tag (default qwen2.5vl:7b)
  KPI_LENS_DOWNLOAD_TIMEOUT  Seconds allowed for URL downloads (default 60)
  RUST_LOG          Log filter, overrides -v / -q

SETUP:
  1. Install Ollama:  https://ollama.com
  2. Pull the model:  ollama pull qwen2.5vl:7b
  3. Start:           kpi-lens serve
"#;

/// Analyse KPI dashboard images with a local vision model.
#[derive(Parser, Debug)]
#[command(
    name = "kpi-lens",
    version,
    about = "Analyse KPI dashboard images with a local vision model",
    long_about = "Upload a KPI dashboard screenshot, state its business objective, and get a \
structured analysis from a vision model served by Ollama. Results can be exported as a \
branded PDF report.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Ollama base URL; a bare host:port is accepted.
    #[arg(long, global = true, env = "OLLAMA_HOST", default_value = kpi_lens::config::DEFAULT_OLLAMA_HOST)]
    ollama_host: String,

    /// Vision model tag.
    #[arg(long, global = true, env = "KPI_LENS_MODEL", default_value = kpi_lens::config::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "KPI_LENS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max tokens the model may generate.
    #[arg(long, global = true, env = "KPI_LENS_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Retries on a transient inference failure.
    #[arg(long, global = true, env = "KPI_LENS_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Inference timeout in seconds.
    #[arg(long, global = true, env = "KPI_LENS_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Timeout in seconds for downloading an image given as a URL.
    #[arg(long, global = true, env = "KPI_LENS_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Text file with a custom prompt template (must contain {objective}).
    #[arg(long, global = true, env = "KPI_LENS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "KPI_LENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "KPI_LENS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web UI.
    Serve {
        /// Address to bind.
        #[arg(long, env = "KPI_LENS_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        /// Port to listen on.
        #[arg(long, env = "KPI_LENS_PORT", default_value_t = 8501)]
        port: u16,

        /// Simultaneous analyses.
        #[arg(long, env = "KPI_LENS_CONCURRENCY", default_value_t = 1)]
        concurrency: usize,
    },

    /// Analyse one dashboard image (path or URL).
    Analyze {
        /// Local PNG/JPEG path or HTTP/HTTPS URL.
        input: String,

        /// Business objective of the dashboard.
        #[arg(long)]
        objective: String,

        /// Also write the PDF report to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full result as JSON instead of the analysis text.
        #[arg(long)]
        json: bool,
    },

    /// Check that Ollama is reachable and the model is pulled.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress for `analyze`; the server logs at info.
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || matches!(cli.command, Command::Analyze { .. }) {
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

    let concurrency = match cli.command {
        Command::Serve { concurrency, .. } => concurrency,
        _ => 1,
    };
    let config = build_config(g, concurrency).await?;

    match cli.command {
        Command::Serve { host, port, .. } => run_serve(config, SocketAddr::new(host, port)).await,
        Command::Analyze {
            ref input,
            ref objective,
            ref output,
            json,
        } => run_analyze(g, config, input, objective, output.as_ref(), json).await,
        Command::Check => run_check(g, config).await,
    }
}

async fn run_serve(config: AnalysisConfig, addr: SocketAddr) -> Result<()> {
    let analyzer = Analyzer::new(config).context("Failed to create analyzer")?;

    match analyzer.check_model().await {
        ModelStatus::Available => {}
        ModelStatus::Missing => warn!(
            "Model '{}' is not pulled; run: ollama pull {}",
            analyzer.config().model,
            analyzer.config().model
        ),
        ModelStatus::Unreachable(reason) => warn!("Ollama is not reachable: {}", reason),
    }

    let state = AppState::new(analyzer, ReportConfig::default());
    server::serve(addr, state)
        .await
        .with_context(|| format!("Server on {} failed", addr))
}

async fn run_analyze(
    g: &GlobalArgs,
    config: AnalysisConfig,
    input: &str,
    objective: &str,
    output: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let spinner = (!g.quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Analyzing");
        bar.set_message(format!("{} with {}", input, config.model));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = match output {
        Some(path) => {
            analyze_to_report_file(input, objective, path, &config, &ReportConfig::default()).await
        }
        None => {
            let analyzer = Analyzer::new(config.clone()).context("Failed to create analyzer")?;
            analyzer.analyze_input(input, objective).await
        }
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let out = result.context("Analysis failed")?;

    if json {
        let text = serde_json::to_string_pretty(&out).context("Failed to serialise output")?;
        println!("{text}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(out.analysis.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !g.quiet {
        eprintln!(
            "{}  {}  {}x{}  {}ms",
            green("✔"),
            bold(&out.image.filename),
            out.image.width,
            out.image.height,
            out.stats.total_duration_ms,
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&out.stats.input_tokens.to_string()),
            dim(&out.stats.output_tokens.to_string()),
        );
        if let Some(path) = output {
            eprintln!("   report  →  {}", bold(&path.display().to_string()));
        }
    }
    Ok(())
}

async fn run_check(g: &GlobalArgs, config: AnalysisConfig) -> Result<()> {
    let analyzer = Analyzer::new(config).context("Failed to create analyzer")?;
    let model = analyzer.config().model.clone();
    let host = analyzer.client().host().to_string();

    match analyzer.check_model().await {
        ModelStatus::Available => {
            if !g.quiet {
                println!("{} {} is available on {}", green("✔"), bold(&model), host);
            }
            Ok(())
        }
        ModelStatus::Missing => {
            eprintln!("{} {} is not pulled on {}", red("✘"), bold(&model), host);
            eprintln!("   run: ollama pull {}", model);
            if let Ok(models) = analyzer.client().list_models().await {
                if !models.is_empty() {
                    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                    eprintln!("   pulled: {}", dim(&names.join(", ")));
                }
            }
            std::process::exit(1);
        }
        ModelStatus::Unreachable(reason) => {
            eprintln!("{} Ollama at {} is not reachable", red("✘"), host);
            eprintln!("   {}", dim(&reason));
            std::process::exit(2);
        }
    }
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(g: &GlobalArgs, concurrency: usize) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .ollama_host(&g.ollama_host)
        .model(&g.model)
        .temperature(g.temperature)
        .max_tokens(g.max_tokens)
        .max_retries(g.max_retries)
        .api_timeout_secs(g.api_timeout)
        .download_timeout_secs(g.download_timeout)
        .concurrency(concurrency);

    if let Some(ref path) = g.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn download_timeout_reaches_config() {
        let cli = Cli::try_parse_from(["kpi-lens", "--download-timeout", "5", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check));
        let config = build_config(&cli.global, 1).await.unwrap();
        assert_eq!(config.download_timeout_secs, 5);
    }
}
