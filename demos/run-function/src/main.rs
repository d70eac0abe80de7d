//! Runs the policy function once against a request read from a file or stdin.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use function_rego::config::{FunctionConfig, load_dotenv};
use function_rego::{EvalContext, FunctionRequest, PolicyFunction};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "run-function", about = "Evaluate Rego policies against a function request")]
struct Args {
    /// Request JSON file, or `-` for stdin.
    #[arg(long, short, default_value = "-")]
    request: PathBuf,
    /// Overrides the configured evaluation timeout (`0` disables it).
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Pretty-print the response.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    load_dotenv();
    let config = FunctionConfig::from_env()?;
    function_rego::telemetry::init(&config.log_filter)?;

    let request = read_request(&args.request)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start tokio runtime")?;
    let outcome = runtime.block_on(run(&args, &config, &request));
    // A timed-out evaluation may still occupy a blocking thread; do not wait for it.
    runtime.shutdown_background();
    outcome
}

async fn run(args: &Args, config: &FunctionConfig, request: &FunctionRequest) -> Result<()> {
    let mut settings = config.settings();
    if let Some(secs) = args.timeout_secs {
        settings = settings.with_eval_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    let function = PolicyFunction::rego().with_settings(settings);

    // Ctrl-C aborts a long evaluation with a fatal result instead of killing the process.
    let ctx = EvalContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let response = function.run_function(request, &ctx).await;
    info!(
        results = response.results().len(),
        fatal = response.has_fatal(),
        "response ready"
    );

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{rendered}");

    Ok(())
}

fn read_request(path: &Path) -> Result<FunctionRequest> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read request from {}", path.display()))?
    };

    serde_json::from_str(&raw).context("cannot decode function request")
}
