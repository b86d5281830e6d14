//! Staged forecast pipeline.
//!
//! fetch → normalize → window → {statistical fit ∥ neural training} → combine.
//! Any failure aborts the run and is reported with the ticker and stage.

use std::time::Instant;

use chrono::NaiveDate;
use hybridcast_core::data::{DataError, DataSource, SeriesProvider};
use hybridcast_core::domain::{future_dates, Forecast, PriceSeries, HORIZON};
use hybridcast_core::neural::SequenceForecaster;
use hybridcast_core::rng::RngHierarchy;
use hybridcast_core::statistical::Sarima;
use hybridcast_core::window::last_window;
use hybridcast_core::{CancelToken, Combiner, ForecastError, MinMaxScaler, Stage, Windows};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, ForecastConfig};
use crate::result::{ForecastResult, SCHEMA_VERSION};

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("forecast for {ticker} failed during {stage}: {source}")]
    Stage {
        ticker: String,
        stage: Stage,
        source: StageFailure,
    },
}

impl RunError {
    fn at(ticker: &str, stage: Stage, cause: impl Into<StageFailure>) -> Self {
        RunError::Stage {
            ticker: ticker.to_string(),
            stage,
            source: cause.into(),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunError::Stage { stage, .. } => Some(*stage),
            RunError::Config(_) => None,
        }
    }

    pub fn forecast_error(&self) -> Option<&ForecastError> {
        match self {
            RunError::Stage {
                source: StageFailure::Forecast(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    pub fn data_error(&self) -> Option<&DataError> {
        match self {
            RunError::Stage {
                source: StageFailure::Data(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

/// Fetch `ticker` from `provider` and run the full pipeline.
pub fn run_forecast(
    ticker: &str,
    provider: &dyn SeriesProvider,
    config: &ForecastConfig,
    run_date: NaiveDate,
    cancel: &CancelToken,
) -> Result<ForecastResult, RunError> {
    config.validate()?;
    let started = Instant::now();

    info!(ticker, provider = provider.name(), period = %config.run.period, "fetching price history");
    let series = provider
        .fetch(ticker, config.run.period)
        .map_err(|e| RunError::at(ticker, Stage::Fetch, e))?;

    forecast_series(&series, provider.source(), config, run_date, cancel, started)
}

/// Run the pipeline on an already fetched series.
pub fn run_forecast_from_series(
    series: &PriceSeries,
    source: DataSource,
    config: &ForecastConfig,
    run_date: NaiveDate,
    cancel: &CancelToken,
) -> Result<ForecastResult, RunError> {
    config.validate()?;
    forecast_series(series, source, config, run_date, cancel, Instant::now())
}

fn forecast_series(
    series: &PriceSeries,
    source: DataSource,
    config: &ForecastConfig,
    run_date: NaiveDate,
    cancel: &CancelToken,
    started: Instant,
) -> Result<ForecastResult, RunError> {
    let ticker = series.ticker();
    let config_hash = config.config_hash()?;
    let fail = |stage: Stage| move |e: ForecastError| RunError::at(ticker, stage, e);

    let (first_date, last_date, last_close) =
        match (series.first_date(), series.last_date(), series.last_close()) {
            (Some(first), Some(last), Some(close)) => (first, last, close),
            _ => return Err(RunError::at(ticker, Stage::Fetch, ForecastError::EmptyData)),
        };
    let closes = series.closes();
    info!(
        ticker,
        observations = closes.len(),
        %first_date,
        %last_date,
        "price history loaded"
    );

    let (scaler, normalized) = MinMaxScaler::fit_transform(&closes).map_err(fail(Stage::Normalize))?;

    let look_back = config.neural.look_back;
    let windows = Windows::new(&normalized, look_back).map_err(fail(Stage::Window))?;
    let seed_window = last_window(&normalized, look_back).map_err(fail(Stage::Window))?;

    let sarima = Sarima::new(config.statistical.clone()).map_err(fail(Stage::StatisticalFit))?;
    let required = sarima.config().min_observations();
    if closes.len() < required {
        return Err(RunError::at(
            ticker,
            Stage::StatisticalFit,
            ForecastError::InsufficientData {
                what: "statistical fit",
                required,
                actual: closes.len(),
            },
        ));
    }

    let mut forecaster = SequenceForecaster::new(
        config.neural.clone(),
        RngHierarchy::new(config.run.seed, ticker),
    )
    .map_err(fail(Stage::NeuralTraining))?;

    info!(ticker, pairs = windows.len(), "fitting statistical and neural models");
    let (statistical, neural) = rayon::join(
        || {
            let fitted = sarima.fit(&closes).map_err(fail(Stage::StatisticalFit))?;
            let forecast = fitted.forecast(HORIZON).map_err(fail(Stage::StatisticalFit))?;
            Ok::<_, RunError>((Forecast::from(forecast), fitted.summary().clone()))
        },
        || {
            let report = forecaster
                .train(windows, cancel)
                .map_err(fail(Stage::NeuralTraining))?;
            let normalized_forecast = forecaster
                .forecast(seed_window, HORIZON)
                .map_err(fail(Stage::NeuralInference))?;
            let prices = scaler.inverse(&normalized_forecast);
            Ok::<_, RunError>((Forecast::from(prices), report))
        },
    );
    if let (Err(_), Err(e)) = (&statistical, &neural) {
        warn!(ticker, error = %e, "neural branch also failed");
    }
    let (statistical, sarima_summary) = statistical?;
    let (neural, training) = neural?;
    info!(
        ticker,
        sigma2 = sarima_summary.sigma2,
        final_loss = training.final_train_loss(),
        "models fitted"
    );

    let weights = config.weights().map_err(fail(Stage::Combine))?;
    let hybrid = Combiner::new(weights)
        .and_then(|c| c.combine(&statistical, &neural))
        .map_err(fail(Stage::Combine))?;

    let elapsed_secs = started.elapsed().as_secs_f64();
    info!(ticker, elapsed_secs, "forecast complete");

    Ok(ForecastResult {
        schema_version: SCHEMA_VERSION,
        ticker: ticker.to_string(),
        run_date,
        config_hash,
        source,
        observations: closes.len(),
        first_date,
        last_date,
        last_close,
        future_dates: future_dates(run_date, HORIZON),
        statistical,
        neural,
        hybrid,
        sarima: sarima_summary,
        training,
        elapsed_secs,
    })
}
