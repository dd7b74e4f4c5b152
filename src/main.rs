//! httpeek command-line entry point.
//!
//! Traces each URL given on the command line, or serves the JSON API with
//! `--api`.

use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use httpeek::config::validation::validate_config;
use httpeek::config::{load_config, ConfigError, HttpeekConfig};
use httpeek::lifecycle::{signals, Shutdown};
use httpeek::net::tls::load_tls_config;
use httpeek::observability::{logging, metrics};
use httpeek::{report, ApiServer, TraceConfig, Tracer};

#[derive(Debug, Parser)]
#[command(name = "httpeek", version, about = "Trace the lifecycle of HTTP requests")]
struct Cli {
    /// URLs to trace, one after another.
    urls: Vec<String>,

    /// HTTP method.
    #[arg(short = 'X', long = "method", default_value = "GET")]
    method: String,

    /// Request header as "Key: Value". Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body.
    #[arg(long, default_value = "")]
    body: String,

    /// Print response headers.
    #[arg(long)]
    show_headers: bool,

    /// Capture and print the response body.
    #[arg(long)]
    show_body: bool,

    /// Print the trace tree as JSON.
    #[arg(long)]
    json: bool,

    /// Serve the HTTP API instead of tracing.
    #[arg(long)]
    api: bool,

    /// API port, overriding the configured bind address port.
    #[arg(long)]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra CA bundle (PEM) to trust.
    #[arg(long)]
    cacert: Option<String>,
}

impl Cli {
    fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            show_headers: self.show_headers,
            show_body: self.show_body,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HttpeekConfig::default(),
    };
    apply_overrides(&mut config, &cli)?;

    logging::init(&config.observability.log_level);
    tracing::debug!(?config, "Configuration loaded");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tracer = Arc::new(Tracer::new(config.transport.clone())?);
    tracing::debug!(settings = ?tracer.settings(), "Tracer ready");

    if cli.api {
        serve_api(config, tracer).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.urls.is_empty() {
        eprintln!("error: no URL given (use --api to serve the API)");
        return Ok(ExitCode::from(2));
    }

    let trace_config = cli.trace_config();
    let mut failed = 0usize;
    for url in &cli.urls {
        if !cli.json {
            println!("==================================================");
            println!("Target: {url}");
            println!("==================================================");
        }

        match tracer.trace(url, &trace_config).await {
            Ok(trace) if cli.json => println!("{}", serde_json::to_string_pretty(&trace)?),
            Ok(trace) => print!("{}", report::render(&trace, &trace_config)),
            Err(err) => {
                failed += 1;
                tracing::debug!(url = %url, kind = err.kind(), "Trace failed");
                eprintln!("error: {url}: {err}");
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Apply `--port` and `--cacert`, then re-check the result.
fn apply_overrides(config: &mut HttpeekConfig, cli: &Cli) -> Result<(), Box<dyn Error>> {
    if let Some(port) = cli.port {
        let mut addr: SocketAddr = config.api.bind_address.parse()?;
        addr.set_port(port);
        config.api.bind_address = addr.to_string();
    }
    if let Some(ca) = &cli.cacert {
        config.transport.ca_file = Some(ca.clone());
    }
    validate_config(config).map_err(ConfigError::Validation)?;
    Ok(())
}

async fn serve_api(config: HttpeekConfig, tracer: Arc<Tracer>) -> Result<(), Box<dyn Error>> {
    let shutdown = Shutdown::new();
    let signal_task = signals::spawn_signal_handler(shutdown.clone());
    let server = ApiServer::new(config.api.clone(), tracer);

    let bind_address = server.config().bind_address.clone();

    match server.config().tls.clone() {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    signal_task.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}
