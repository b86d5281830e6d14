//! HybridCast CLI: forecast and configuration commands.
//!
//! Commands:
//! - `forecast`: fetch a ticker's history, fit both models, print the 30-day hybrid forecast
//! - `config`: print the default configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hybridcast_core::data::{
    CircuitBreaker, CsvProvider, Period, SeriesProvider, SyntheticProvider, SyntheticShape,
    YahooProvider,
};
use hybridcast_core::CancelToken;
use hybridcast_runner::{export_json, run_forecast, save_artifacts, ForecastConfig, ForecastResult};

#[derive(Parser)]
#[command(
    name = "hybridcast",
    about = "HybridCast CLI, 30-day SARIMA + LSTM hybrid price forecasts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next 30 days for a ticker.
    Forecast {
        /// Ticker symbol (e.g., AAPL).
        ticker: String,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// History period such as 5y, 6mo or 30d (overrides the config).
        #[arg(long)]
        period: Option<String>,

        /// Read `<TICKER>.csv` from this directory instead of Yahoo Finance.
        #[arg(long, conflicts_with = "synthetic")]
        csv_dir: Option<PathBuf>,

        /// Generate an offline synthetic series instead of fetching.
        #[arg(long, value_enum)]
        synthetic: Option<SyntheticKind>,

        /// Abort neural training after this many seconds (overrides the config).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Statistical weight in [0, 1]; the neural weight is its complement.
        #[arg(long)]
        weight_statistical: Option<f64>,

        /// Write result.json and forecast.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full result as JSON instead of the table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum SyntheticKind {
    Linear,
    Constant,
    Walk,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Forecast {
            ticker,
            config,
            period,
            csv_dir,
            synthetic,
            timeout_secs,
            weight_statistical,
            output_dir,
            json,
        } => run_forecast_cmd(ForecastArgs {
            ticker,
            config,
            period,
            csv_dir,
            synthetic,
            timeout_secs,
            weight_statistical,
            output_dir,
            json,
        }),
        Commands::Config => {
            print!("{}", ForecastConfig::default().to_toml()?);
            Ok(())
        }
    }
}

struct ForecastArgs {
    ticker: String,
    config: Option<PathBuf>,
    period: Option<String>,
    csv_dir: Option<PathBuf>,
    synthetic: Option<SyntheticKind>,
    timeout_secs: Option<u64>,
    weight_statistical: Option<f64>,
    output_dir: Option<PathBuf>,
    json: bool,
}

fn run_forecast_cmd(args: ForecastArgs) -> Result<()> {
    let ticker = args.ticker.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        bail!("ticker must not be empty");
    }

    let config = load_config(&args)?;
    let today = chrono::Local::now().date_naive();

    let provider: Box<dyn SeriesProvider> = match (&args.csv_dir, args.synthetic) {
        (Some(dir), _) => Box::new(CsvProvider::new(dir)),
        (None, Some(kind)) => {
            let shape = match kind {
                SyntheticKind::Linear => SyntheticShape::Linear {
                    start: 100.0,
                    step: 0.1,
                },
                SyntheticKind::Constant => SyntheticShape::Constant { value: 100.0 },
                SyntheticKind::Walk => SyntheticShape::RandomWalk {
                    start: 100.0,
                    volatility: 0.02,
                    seed: config.run.seed,
                },
            };
            Box::new(SyntheticProvider::new(shape, today))
        }
        (None, None) => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(circuit_breaker)?)
        }
    };
    if !provider.is_available() {
        bail!("provider '{}' is currently unavailable", provider.name());
    }

    let cancel = match config.timeout() {
        Some(timeout) => CancelToken::with_timeout(timeout),
        None => CancelToken::new(),
    };

    let result = run_forecast(&ticker, provider.as_ref(), &config, today, &cancel)?;

    if args.json {
        println!("{}", export_json(&result)?);
    } else {
        print_summary(&result);
        print_table(&result);
    }

    if let Some(output_dir) = &args.output_dir {
        let run_dir = save_artifacts(&result, output_dir)?;
        if args.json {
            info!(path = %run_dir.display(), "artifacts saved");
        } else {
            println!();
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied, validated.
fn load_config(args: &ForecastArgs) -> Result<ForecastConfig> {
    let mut config = match &args.config {
        Some(path) => ForecastConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForecastConfig::default(),
    };
    if let Some(period) = &args.period {
        config.run.period = period
            .parse::<Period>()
            .map_err(|e| anyhow::anyhow!("invalid --period: {e}"))?;
    }
    if let Some(secs) = args.timeout_secs {
        config.run.timeout_secs = secs;
    }
    if let Some(w) = args.weight_statistical {
        if !(0.0..=1.0).contains(&w) {
            bail!("--weight-statistical must be in [0, 1], got {w}");
        }
        config.combine.weight_statistical = w;
        config.combine.weight_neural = 1.0 - w;
    }
    config.validate()?;
    Ok(config)
}

fn print_summary(result: &ForecastResult) {
    let weights = result.weights();
    println!();
    println!("=== Forecast: {} ===", result.ticker);
    println!("Source:         {}", result.source);
    println!(
        "History:        {} to {} ({} closes)",
        result.first_date, result.last_date, result.observations
    );
    println!("Last Close:     {:.2}", result.last_close);
    println!(
        "Weights:        {:.2} statistical / {:.2} neural",
        weights.statistical, weights.neural
    );
    println!();
    println!("--- Models ---");
    println!(
        "SARIMA{:?}{:?}: sigma2 {:.6}, AIC {:.2}, {} iterations",
        result.sarima.order,
        result.sarima.seasonal_order,
        result.sarima.sigma2,
        result.sarima.aic,
        result.sarima.iterations
    );
    match result.training.final_train_loss() {
        Some(loss) => println!(
            "LSTM:           {} samples, {} epochs, final loss {:.6}",
            result.training.samples,
            result.training.epochs.len(),
            loss
        ),
        None => println!("LSTM:           {} samples", result.training.samples),
    }
    if let Some(val) = result.training.epochs.last().and_then(|e| e.validation_loss) {
        println!("Validation:     {val:.6}");
    }
    println!("Elapsed:        {:.2}s", result.elapsed_secs);
    if result.source == hybridcast_core::data::DataSource::Synthetic {
        println!();
        println!("WARNING: Forecast based on SYNTHETIC data");
    }
}

fn print_table(result: &ForecastResult) {
    println!();
    println!(
        "{:<12} {:>12} {:>12} {:>12}",
        "Date", "Statistical", "Neural", "Hybrid"
    );
    for row in result.rows() {
        println!(
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            row.date.to_string(),
            row.statistical,
            row.neural,
            row.hybrid
        );
    }
}
