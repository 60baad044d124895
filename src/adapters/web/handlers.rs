//! HTTP request handlers for the dashboard.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::adapters::csv_store_adapter::{CollectionSummary, CsvStoreAdapter};
use crate::adapters::json_artifact_adapter::JsonArtifactAdapter;
use crate::domain::artifact::ModelArtifact;
use crate::domain::correlation::{best_lags, lag_correlations, rolling_correlation};
use crate::domain::features::build_features;
use crate::domain::predictor::{predict_latest, recent_performance};
use crate::domain::series::PriceTable;
use crate::domain::settings::{data_settings, feature_settings, train_settings, DataSettings};
use crate::ports::artifact_port::ArtifactPort;

use super::chart_svg::ChartSeries;
use super::{is_htmx_request, templates, AppState, WebError};

const MAX_LAG: usize = 30;

fn load_table(state: &AppState) -> Result<(DataSettings, CsvStoreAdapter, PriceTable), WebError> {
    let settings = data_settings(state.config.as_ref())?;
    let store = CsvStoreAdapter::new(&settings.cache_dir);
    if !store.has_raw() {
        return Err(WebError::not_found(
            "no cached price data — run `indexcast collect` first",
        ));
    }
    let table = store.load_raw(settings.start_date, settings.end_date)?;
    if table.is_empty() {
        return Err(WebError::not_found(
            "the cached price table is empty for the configured date range",
        ));
    }
    Ok((settings, store, table))
}

fn summary_of(store: &CsvStoreAdapter) -> Option<CollectionSummary> {
    store.load_summary().ok()
}

/// Trading-row window for a display period.
fn period_rows(period: &str) -> Option<usize> {
    match period {
        "1m" => Some(21),
        "3m" => Some(63),
        "6m" => Some(126),
        "1y" => Some(252),
        _ => None,
    }
}

fn respond(
    headers: &HeaderMap,
    target: &str,
    fragment: String,
) -> Result<Response, WebError> {
    if is_htmx_request(headers) {
        Ok(Html(fragment).into_response())
    } else {
        let shell = templates::dashboard_shell(target, &fragment);
        Ok(Html(templates::page("indexcast", &shell)?).into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketParams {
    period: Option<String>,
    normalize: Option<String>,
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let (settings, store, table) = load_table(&state)?;
    let view = table.tail(period_rows("3m").unwrap_or(table.len()));
    let fragment = templates::market_fragment(&view, summary_of(&store).as_ref(), "3m", false);
    let shell = templates::dashboard_shell(&settings.target, &fragment);
    Ok(Html(templates::page("indexcast", &shell)?).into_response())
}

pub async fn market_tab(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MarketParams>,
) -> Result<Response, WebError> {
    let (settings, store, table) = load_table(&state)?;

    let period = params.period.as_deref().unwrap_or("3m").to_string();
    let normalize = params
        .normalize
        .as_deref()
        .map(|v| v != "0" && v != "false")
        .unwrap_or(false);

    let view = match period_rows(&period) {
        Some(rows) => table.tail(rows),
        None => table,
    };

    let fragment =
        templates::market_fragment(&view, summary_of(&store).as_ref(), &period, normalize);
    respond(&headers, &settings.target, fragment)
}

pub async fn forecast_tab(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let (settings, _store, table) = load_table(&state)?;
    let feature_config = feature_settings(state.config.as_ref(), &settings.target)?;
    let train_cfg = train_settings(state.config.as_ref(), &settings.target)?;

    let features = build_features(&table, &feature_config)?;

    let artifact_store = JsonArtifactAdapter::new(&train_cfg.model_dir, &train_cfg.model_name);
    let artifact: Option<ModelArtifact> = artifact_store.load().ok();

    let fragment = match &artifact {
        Some(artifact) => {
            let prediction = predict_latest(artifact, &features)?;
            let performance =
                recent_performance(artifact, &features, train_cfg.accuracy_window)?;
            templates::forecast_fragment(
                &settings.target,
                &table.tail(6),
                Some(&prediction),
                Some(&performance),
                Some(&artifact.metadata),
                &artifact.classifier.ranked_importance(),
            )
        }
        None => templates::forecast_fragment(&settings.target, &table.tail(6), None, None, None, &[]),
    };

    respond(&headers, &settings.target, fragment)
}

#[derive(Debug, Deserialize)]
pub struct AnalysisParams {
    window: Option<usize>,
}

pub async fn analysis_tab(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalysisParams>,
) -> Result<Response, WebError> {
    let (settings, _store, table) = load_table(&state)?;

    let window = params.window.unwrap_or(90).clamp(30, 180);
    // Never ask for more lags than the table can support.
    let max_lag = MAX_LAG.min(table.len().saturating_sub(3)).max(1);

    let sweep = lag_correlations(&table, &settings.target, max_lag)?;
    let best = best_lags(&sweep);

    let mut rolling = Vec::new();
    for column in &table.columns {
        if column == &settings.target {
            continue;
        }
        let points = rolling_correlation(&table, &settings.target, column, window)?;
        rolling.push(ChartSeries {
            name: column.clone(),
            values: points.into_iter().map(|(_, r)| r).collect(),
        });
    }

    let fragment = templates::analysis_fragment(
        &settings.target,
        &sweep,
        &best,
        max_lag,
        window,
        &rolling,
    );
    respond(&headers, &settings.target, fragment)
}

pub async fn not_found() -> Response {
    WebError::not_found("page not found").into_response()
}
