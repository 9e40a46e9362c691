//! ReactMiner: chemical reaction extraction from literature text.

use std::path::PathBuf;
use std::sync::Arc;

use reactminer_core::ExtractorConfig;
use reactminer_infer::ModelContext;
use reactminer_runtime::ReactionExtractor;
use reactminer_server::{build_router, cli, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("ReactMiner: extract chemical reactions from text segments");
    println!();
    println!("Usage: reactminer [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve             Start the HTTP server");
    println!("  extract <input> [output]   Extract reactions from a .json or text file");
    println!("  status                     Show device and generator status");
    println!("  help                       Show this help message");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    match command {
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "extract" => {
            let Some(input) = args.get(2) else {
                eprintln!("Usage: reactminer extract <input> [output]");
                std::process::exit(1);
            };
            run_extract(PathBuf::from(input), args.get(3).map(PathBuf::from))
        }
        "status" => run_status(),
        "serve" => run_server(),
        other => {
            eprintln!("Unknown command: {}. Use 'reactminer help' for usage.", other);
            std::process::exit(1);
        }
    }
}

fn run_extract(input: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = ExtractorConfig::from_env()?;
    let context = ModelContext::initialize(&config)?;

    let batch = cli::read_input(&input)?;
    info!("Loaded {} segments from {}", batch.len(), input.display());

    let extractor = ReactionExtractor::from_config(&context, &config);
    let outcome = extractor.extract_detailed(batch, &config.sampling)?;

    for failure in &outcome.failures {
        warn!("Segment {} skipped: {}", failure.index, failure.error);
    }
    info!(
        "Found reactions in {} of {} segments",
        outcome.results.len(),
        outcome.processed
    );

    match output {
        Some(path) => {
            cli::write_results_to_path(&path, &outcome.results)?;
            info!("Results written to {}", path.display());
        }
        None => cli::write_results(std::io::stdout().lock(), &outcome.results)?,
    }
    Ok(())
}

fn run_status() -> anyhow::Result<()> {
    let config = ExtractorConfig::from_env()?;
    let context = ModelContext::initialize(&config)?;
    let status = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "context": context.summary(),
        "backend": config.backend,
        "failurePolicy": config.failure_policy,
        "sampling": config.sampling,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn run_server() -> anyhow::Result<()> {
    let config = ExtractorConfig::from_env()?;
    let port = config.port;

    // The blocking HTTP client must be created outside the async runtime.
    let context = Arc::new(ModelContext::initialize(&config)?);
    let state = Arc::new(AppState::new(config, context));
    let app = build_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("ReactMiner server listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok::<_, anyhow::Error>(())
    })
}
