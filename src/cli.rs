//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::alpha_vantage_adapter::AlphaVantageAdapter;
use crate::adapters::csv_store_adapter::{CollectionSummary, CsvStoreAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_artifact_adapter::JsonArtifactAdapter;
use crate::domain::correlation::{best_lags, lag_correlations};
use crate::domain::dataset::Dataset;
use crate::domain::error::IndexcastError;
use crate::domain::features::{build_features, FeatureConfig, FeatureTable};
use crate::domain::predictor::{predict_latest, recent_performance};
use crate::domain::series::PriceTable;
use crate::domain::settings::{data_settings, feature_settings, train_settings, DataSettings};
use crate::domain::trainer::train;
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "indexcast", about = "Commodity-driven index direction forecaster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch price data and write the cached tables
    Collect {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Train the direction model and persist the artifact
    Train {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Score the latest cached row with the persisted model
    Predict {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Lagged-effect correlation analysis against the target
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 30)]
        max_lag: usize,
    },
    /// Show the cached data and model summary
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the dashboard server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    dotenv::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Collect { config } => run_collect(&config),
        Command::Train { config } => run_train(&config),
        Command::Predict { config } => run_predict(&config),
        Command::Analyze { config, max_lag } => run_analyze(&config, max_lag),
        Command::Info { config } => run_info(&config),
        Command::Serve { config } => run_serve(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = IndexcastError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &IndexcastError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Fetch every configured symbol, merge on date and fill gaps. A symbol that
/// fails is skipped with a warning; a missing target or an empty universe
/// ends the run.
pub fn collect_table(
    port: &dyn QuotePort,
    settings: &DataSettings,
) -> Result<PriceTable, IndexcastError> {
    let mut collected = Vec::new();
    for spec in &settings.symbols {
        match port.fetch_daily_closes(&spec.name, &spec.ticker, settings.start_date, settings.end_date)
        {
            Ok(series) => collected.push(series),
            Err(e) => warn!(symbol = %spec.ticker, "skipping symbol: {e}"),
        }
    }

    if collected.is_empty() {
        return Err(IndexcastError::EmptyResponse {
            symbol: "all configured symbols".into(),
        });
    }
    if !collected.iter().any(|s| s.name == settings.target) {
        return Err(IndexcastError::Fetch {
            symbol: settings.target.clone(),
            reason: "target series could not be fetched".into(),
        });
    }

    let mut table = PriceTable::merge(&collected);
    table.fill_gaps();
    Ok(table)
}

/// Summary row persisted next to the cache after a collection run.
pub fn build_summary(table: &PriceTable, features: &FeatureTable) -> CollectionSummary {
    let dataset = Dataset::from_feature_table(features);
    CollectionSummary {
        rows: table.len(),
        columns: table.columns.clone(),
        feature_count: features.names.len(),
        start_date: *table.dates.first().expect("collected table is not empty"),
        end_date: *table.dates.last().expect("collected table is not empty"),
        positive_ratio: dataset.positive_ratio(),
        collected_at: chrono::Utc::now(),
    }
}

fn resolve_api_key(config: &dyn ConfigPort) -> Result<String, IndexcastError> {
    config
        .get_string("data", "api_key")
        .or_else(|| std::env::var("ALPHAVANTAGE_API_KEY").ok())
        .ok_or_else(|| IndexcastError::ConfigMissing {
            section: "data".into(),
            key: "api_key".into(),
        })
}

/// Cached table if present, otherwise a fresh collection that also writes
/// the cache.
fn load_or_collect(
    config: &dyn ConfigPort,
    settings: &DataSettings,
    feature_config: &FeatureConfig,
) -> Result<PriceTable, IndexcastError> {
    let store = CsvStoreAdapter::new(&settings.cache_dir);
    if store.has_raw() {
        return store.load_raw(settings.start_date, settings.end_date);
    }

    eprintln!("No cached data found, fetching...");
    let api_key = resolve_api_key(config)?;
    let port = AlphaVantageAdapter::new(api_key);
    let table = collect_table(&port, settings)?;

    store.save_raw(&table)?;
    let features = build_features(&table, feature_config)?;
    store.save_prepared(&features)?;
    store.save_summary(&build_summary(&table, &features))?;

    Ok(table)
}

fn run_collect(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match data_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let feature_config = match feature_settings(&config, &settings.target) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    let api_key = match resolve_api_key(&config) {
        Ok(k) => k,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Fetching {} symbols, {} to {}",
        settings.symbols.len(),
        settings.start_date,
        settings.end_date
    );

    let port = AlphaVantageAdapter::new(api_key);
    let table = match collect_table(&port, &settings) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let features = match build_features(&table, &feature_config) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    let store = CsvStoreAdapter::new(&settings.cache_dir);
    let summary = build_summary(&table, &features);
    if let Err(e) = store
        .save_raw(&table)
        .and_then(|_| store.save_prepared(&features))
        .and_then(|_| store.save_summary(&summary))
    {
        return fail(&e);
    }

    eprintln!("\n=== Collection Summary ===");
    eprintln!("Rows:           {}", summary.rows);
    eprintln!("Columns:        {}", summary.columns.join(", "));
    eprintln!("Features:       {}", summary.feature_count);
    eprintln!("Date range:     {} to {}", summary.start_date, summary.end_date);
    eprintln!("Up-day ratio:   {:.1}%", summary.positive_ratio * 100.0);
    eprintln!("\nData written to {}", store.base_path().display());
    ExitCode::SUCCESS
}

fn run_train(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match data_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let feature_config = match feature_settings(&config, &settings.target) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };
    let train_cfg = match train_settings(&config, &settings.target) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let table = match load_or_collect(&config, &settings, &feature_config) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let features = match build_features(&table, &feature_config) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };
    let dataset = Dataset::from_feature_table(&features);

    eprintln!(
        "Training {} on {} rows ({} features)",
        train_cfg.config.kind,
        dataset.len(),
        dataset.n_features()
    );

    let outcome = match train(&dataset, &train_cfg.config) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    eprintln!("\n=== Grid Search ===");
    for (i, result) in outcome.grid_results.iter().enumerate() {
        let marker = if i == outcome.best_index { "*" } else { " " };
        eprintln!(
            "{} trees={:<4} lr={:<5} depth={}  cv {}: {:.4} (±{:.4})",
            marker,
            result.point.n_estimators,
            result.point.learning_rate,
            result.point.max_depth,
            train_cfg.config.metric,
            result.cv.mean,
            result.cv.std,
        );
    }

    let meta = &outcome.artifact.metadata;
    eprintln!("\n=== Held-out Evaluation ===");
    eprintln!("Accuracy:   {:.4}", meta.test.accuracy);
    eprintln!("Precision:  {:.4}", meta.test.precision);
    eprintln!("Recall:     {:.4}", meta.test.recall);
    eprintln!("F1:         {:.4}", meta.test.f1);

    eprintln!("\n=== Top Features ===");
    for (name, importance) in outcome.artifact.classifier.ranked_importance().iter().take(10) {
        eprintln!("  {:<28} {:.4}", name, importance);
    }

    let artifact_store = JsonArtifactAdapter::new(&train_cfg.model_dir, &train_cfg.model_name);
    if let Err(e) = artifact_store.save(&outcome.artifact) {
        return fail(&e);
    }
    eprintln!("\nModel written to {}", artifact_store.path().display());

    if outcome.success {
        eprintln!("Success criterion met (accuracy > {:.2})", train_cfg.config.success_threshold);
    } else {
        eprintln!(
            "Model saved, but the success criterion was not met (accuracy <= {:.2})",
            train_cfg.config.success_threshold
        );
    }
    ExitCode::SUCCESS
}

fn run_predict(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match data_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let feature_config = match feature_settings(&config, &settings.target) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };
    let train_cfg = match train_settings(&config, &settings.target) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let store = CsvStoreAdapter::new(&settings.cache_dir);
    let table = match store.load_raw(settings.start_date, settings.end_date) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    let features = match build_features(&table, &feature_config) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    let artifact_store = JsonArtifactAdapter::new(&train_cfg.model_dir, &train_cfg.model_name);
    let artifact = match artifact_store.load() {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let prediction = match predict_latest(&artifact, &features) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let performance = match recent_performance(&artifact, &features, train_cfg.accuracy_window) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    eprintln!("\n=== {} Direction Forecast ===", settings.target);
    eprintln!("As of:          {}", prediction.date);
    if prediction.direction == 1 {
        eprintln!("Forecast:       UP");
    } else {
        eprintln!("Forecast:       DOWN");
    }
    eprintln!("Up probability: {:.1}%", prediction.probability * 100.0);
    eprintln!(
        "Recent accuracy: {:.1}% over the last {} sessions",
        performance.accuracy * 100.0,
        performance.evaluated
    );
    eprintln!(
        "Last {} sessions: {} up, {} down",
        performance.evaluated, performance.up_days, performance.down_days
    );
    ExitCode::SUCCESS
}

fn run_analyze(config_path: &PathBuf, max_lag: usize) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match data_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let store = CsvStoreAdapter::new(&settings.cache_dir);
    let table = match store.load_raw(settings.start_date, settings.end_date) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let sweep = match lag_correlations(&table, &settings.target, max_lag) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "\n=== Lagged effects on {} (lags 1..={}) ===",
        settings.target, max_lag
    );
    for best in best_lags(&sweep) {
        eprintln!(
            "  {:<10} strongest at lag {:>2}: {:+.4}",
            best.variable, best.lag, best.correlation
        );
    }

    let mut strongest = sweep;
    strongest.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    eprintln!("\nTop correlations:");
    for c in strongest.iter().take(10) {
        eprintln!(
            "  {:<10} lag {:>2}  {:+.4}",
            c.variable, c.lag, c.correlation
        );
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match data_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let train_cfg = match train_settings(&config, &settings.target) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let store = CsvStoreAdapter::new(&settings.cache_dir);
    match store.load_summary() {
        Ok(summary) => {
            println!(
                "data: {} rows, {} to {}, columns: {}",
                summary.rows,
                summary.start_date,
                summary.end_date,
                summary.columns.join(", ")
            );
            println!(
                "features: {}, up-day ratio {:.1}%, collected {}",
                summary.feature_count,
                summary.positive_ratio * 100.0,
                summary.collected_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Err(_) => eprintln!("no cached data found (run collect first)"),
    }

    let artifact_store = JsonArtifactAdapter::new(&train_cfg.model_dir, &train_cfg.model_name);
    match artifact_store.load() {
        Ok(artifact) => {
            let meta = &artifact.metadata;
            println!(
                "model: {} trained {} on {} rows, cv {} {:.4}, test accuracy {:.4}",
                meta.model_kind,
                meta.trained_at.format("%Y-%m-%d %H:%M:%S"),
                meta.train_rows,
                meta.metric,
                meta.cv_score,
                meta.test.accuracy
            );
        }
        Err(_) => eprintln!("no trained model found (run train first)"),
    }
    ExitCode::SUCCESS
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use std::net::SocketAddr;
        use std::sync::Arc;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        if let Err(e) = data_settings(&config) {
            return fail(&e);
        }

        let addr: SocketAddr = config
            .get_string("web", "listen")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .unwrap_or_else(|_| "127.0.0.1:3000".parse().unwrap());

        eprintln!("Starting dashboard on http://{}", addr);

        let state = crate::adapters::web::AppState {
            config: Arc::new(config),
        };
        let router = crate::adapters::web::build_router(state);

        tokio::runtime::Runtime::new()
            .expect("failed to start runtime")
            .block_on(async {
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .expect("failed to bind listen address");
                axum::serve(listener, router)
                    .await
                    .expect("server error");
            });

        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
