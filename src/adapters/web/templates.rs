//! HTML page shell and fragment builders for the dashboard tabs.

use askama::Template;

use super::chart_svg::{line_chart, ChartSeries};
use super::WebError;
use crate::adapters::csv_store_adapter::CollectionSummary;
use crate::domain::artifact::ArtifactMetadata;
use crate::domain::correlation::{CorrelationMatrix, LagCorrelation};
use crate::domain::predictor::{Prediction, RecentPerformance};
use crate::domain::series::PriceTable;

#[derive(Template)]
#[template(path = "base.html")]
struct BasePage<'a> {
    title: &'a str,
    content: &'a str,
}

/// Wrap a fragment in the full page shell.
pub fn page(title: &str, content: &str) -> Result<String, WebError> {
    BasePage { title, content }
        .render()
        .map_err(|e| WebError::internal(format!("template error: {e}")))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The three-tab shell. Tabs swap `#content` over HTMX; the initial tab is
/// rendered inline so the page works before the first swap.
pub fn dashboard_shell(target: &str, initial: &str) -> String {
    let mut html = String::new();
    html.push_str(&format!(
        "<h1>{} Direction Forecast</h1>",
        escape(target)
    ));
    html.push_str(
        r##"<nav class="tabs">
<button class="active" hx-get="/market" hx-target="#content" onclick="for (const b of this.parentNode.children) b.classList.remove('active'); this.classList.add('active');">Market Data</button>
<button hx-get="/forecast" hx-target="#content" onclick="for (const b of this.parentNode.children) b.classList.remove('active'); this.classList.add('active');">Forecast</button>
<button hx-get="/analysis" hx-target="#content" onclick="for (const b of this.parentNode.children) b.classList.remove('active'); this.classList.add('active');">Lag Analysis</button>
</nav>"##,
    );
    html.push_str(r#"<div id="content">"#);
    html.push_str(initial);
    html.push_str("</div>");
    html
}

fn correlation_cell(value: f64) -> String {
    // Blue for positive, red for negative, stronger color for stronger
    // correlation.
    let alpha = value.abs().min(1.0) * 0.75;
    let color = if value >= 0.0 {
        format!("rgba(31, 119, 180, {alpha:.2})")
    } else {
        format!("rgba(214, 39, 40, {alpha:.2})")
    };
    format!(r#"<td style="background: {color}">{value:.2}</td>"#)
}

pub fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let mut html = String::from(r#"<table class="data"><tr><th></th>"#);
    for col in &matrix.columns {
        html.push_str(&format!("<th>{}</th>", escape(col)));
    }
    html.push_str("</tr>");

    for (i, row_name) in matrix.columns.iter().enumerate() {
        html.push_str(&format!("<tr><th>{}</th>", escape(row_name)));
        for j in 0..matrix.columns.len() {
            html.push_str(&correlation_cell(matrix.values[i][j]));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Variables × lags heatmap of lagged correlations against the target.
pub fn lag_table(sweep: &[LagCorrelation], max_lag: usize) -> String {
    let mut variables: Vec<&str> = Vec::new();
    for c in sweep {
        if !variables.contains(&c.variable.as_str()) {
            variables.push(&c.variable);
        }
    }

    let mut html = String::from(r#"<table class="data"><tr><th>variable</th>"#);
    for lag in 1..=max_lag {
        html.push_str(&format!("<th>{lag}</th>"));
    }
    html.push_str("</tr>");

    for variable in variables {
        html.push_str(&format!("<tr><th>{}</th>", escape(variable)));
        for lag in 1..=max_lag {
            let value = sweep
                .iter()
                .find(|c| c.variable == variable && c.lag == lag)
                .map(|c| c.correlation)
                .unwrap_or(0.0);
            html.push_str(&correlation_cell(value));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn period_option(value: &str, label: &str, selected: &str) -> String {
    let marker = if value == selected { " selected" } else { "" };
    format!(r#"<option value="{value}"{marker}>{label}</option>"#)
}

/// Market data tab: price history, correlation matrix and daily changes.
pub fn market_fragment(
    view: &PriceTable,
    summary: Option<&CollectionSummary>,
    period: &str,
    normalize: bool,
) -> String {
    let mut html = String::from("<h2>Market Data</h2>");

    if let Some(s) = summary {
        html.push_str(&format!(
            r#"<p class="card">Cached range {} to {} ({} rows, collected {}).</p>"#,
            s.start_date,
            s.end_date,
            s.rows,
            s.collected_at.format("%Y-%m-%d %H:%M"),
        ));
    }

    html.push_str(&format!(
        r##"<form class="controls" hx-get="/market" hx-target="#content" hx-trigger="change">
<label>Period: <select name="period">{}{}{}{}{}</select></label>
<label><input type="checkbox" name="normalize" value="1"{}> Normalize</label>
</form>"##,
        period_option("1m", "Last month", period),
        period_option("3m", "Last 3 months", period),
        period_option("6m", "Last 6 months", period),
        period_option("1y", "Last year", period),
        period_option("all", "All", period),
        if normalize { " checked" } else { "" },
    ));

    let price_series: Vec<ChartSeries> = view
        .columns
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let mut values: Vec<f64> = view.values.iter().map(|row| row[col]).collect();
            if normalize {
                if let Some(&first) = values.iter().find(|v| v.is_finite()) {
                    if first != 0.0 {
                        for v in &mut values {
                            *v = *v / first * 100.0;
                        }
                    }
                }
            }
            ChartSeries {
                name: name.clone(),
                values,
            }
        })
        .collect();

    html.push_str(r#"<div class="card"><h2>Close Prices</h2>"#);
    html.push_str(&line_chart(&price_series, 1000.0, 300.0));
    html.push_str("</div>");

    html.push_str(r#"<div class="card"><h2>Correlation Matrix</h2>"#);
    html.push_str(&correlation_table(&crate::domain::correlation::correlation_matrix(view)));
    html.push_str("</div>");

    let change_series: Vec<ChartSeries> = {
        let pct = view.pct_change();
        pct.columns
            .iter()
            .enumerate()
            .map(|(col, name)| ChartSeries {
                name: name.clone(),
                values: pct.values.iter().map(|row| row[col] * 100.0).collect(),
            })
            .collect()
    };
    html.push_str(r#"<div class="card"><h2>Daily Changes (%)</h2>"#);
    html.push_str(&line_chart(&change_series, 1000.0, 300.0));
    html.push_str("</div>");

    html
}

fn metric_card(label: &str, value: &str, change: Option<f64>) -> String {
    let delta = match change {
        Some(c) => {
            let class = if c >= 0.0 { "up" } else { "down" };
            format!(r#"<div class="{class}">{c:+.2}%</div>"#)
        }
        None => String::new(),
    };
    format!(
        r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div>{}</div>"#,
        escape(label),
        value,
        delta
    )
}

/// Forecast tab: latest closes, the model's call and its recent accuracy.
#[allow(clippy::too_many_arguments)]
pub fn forecast_fragment(
    target: &str,
    recent: &PriceTable,
    prediction: Option<&Prediction>,
    performance: Option<&RecentPerformance>,
    metadata: Option<&ArtifactMetadata>,
    importance: &[(String, f64)],
) -> String {
    let mut html = String::from("<h2>Forecast</h2>");

    // Latest close and day-over-day change per column.
    if recent.len() >= 2 {
        let pct = recent.pct_change();
        let last = recent.len() - 1;
        html.push_str(r#"<div class="metric-row">"#);
        for (col, name) in recent.columns.iter().enumerate().take(4) {
            let change = pct.values.last().map(|row| row[col] * 100.0);
            html.push_str(&metric_card(
                name,
                &format!("{:.2}", recent.values[last][col]),
                change,
            ));
        }
        html.push_str("</div>");
    }

    // Last five sessions.
    html.push_str(r#"<div class="card"><h2>Last 5 Sessions</h2><table class="data"><tr><th>date</th>"#);
    for col in &recent.columns {
        html.push_str(&format!("<th>{}</th>", escape(col)));
    }
    html.push_str("</tr>");
    let start = recent.len().saturating_sub(5);
    for row in start..recent.len() {
        html.push_str(&format!("<tr><td>{}</td>", recent.dates[row]));
        for value in &recent.values[row] {
            html.push_str(&format!("<td>{value:.2}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></div>");

    match (prediction, performance) {
        (Some(p), Some(perf)) => {
            let (word, class) = if p.direction == 1 {
                ("RISE", "up")
            } else {
                ("FALL", "down")
            };
            html.push_str(&format!(
                r#"<div class="card"><h2>Tomorrow</h2>
<p>{} is expected to <strong class="{class}">{word}</strong> (features as of {}).</p>
<p>Up probability: <strong>{:.1}%</strong></p>
<div class="prob-track"><div class="prob-fill" style="width: {:.1}%"></div></div>
<p>Hit rate over the last {} sessions: <strong>{:.1}%</strong>
({} up days, {} down days).</p></div>"#,
                escape(target),
                p.date,
                p.probability * 100.0,
                p.probability * 100.0,
                perf.evaluated,
                perf.accuracy * 100.0,
                perf.up_days,
                perf.down_days,
            ));

            if !importance.is_empty() {
                html.push_str(r#"<div class="card"><h2>Most Influential Features</h2><table class="data"><tr><th>feature</th><th>importance</th></tr>"#);
                for (name, value) in importance.iter().take(10) {
                    html.push_str(&format!(
                        "<tr><td>{}</td><td>{:.4}</td></tr>",
                        escape(name),
                        value
                    ));
                }
                html.push_str("</table></div>");
            }

            if let Some(meta) = metadata {
                html.push_str(&format!(
                    r#"<p class="card">Model: {} trained {} on {} rows ({} to {}); cv {} {:.4}, held-out accuracy {:.4}.</p>"#,
                    meta.model_kind,
                    meta.trained_at.format("%Y-%m-%d %H:%M"),
                    meta.train_rows,
                    meta.train_start,
                    meta.train_end,
                    meta.metric,
                    meta.cv_score,
                    meta.test.accuracy,
                ));
            }
        }
        _ => {
            html.push_str(
                r#"<div class="notice">No trained model is available.
Run <code>indexcast train --config &lt;config&gt;</code> and reload.</div>"#,
            );
        }
    }

    html
}

/// Lag analysis tab: lagged-effect heatmap, strongest lags and rolling
/// correlations.
pub fn analysis_fragment(
    target: &str,
    sweep: &[LagCorrelation],
    best: &[LagCorrelation],
    max_lag: usize,
    window: usize,
    rolling: &[ChartSeries],
) -> String {
    let mut html = String::from("<h2>Lag Analysis</h2>");

    html.push_str(&format!(
        r#"<p class="card">How changes in each variable lead changes in {},
measured as the correlation between the variable shifted back by the lag and
the target's daily change.</p>"#,
        escape(target)
    ));

    html.push_str(r#"<div class="card"><h2>Lagged Correlation Heatmap</h2>"#);
    html.push_str(&lag_table(sweep, max_lag));
    html.push_str("</div>");

    html.push_str(r#"<div class="card"><h2>Strongest Lag per Variable</h2><table class="data"><tr><th>variable</th><th>lag</th><th>correlation</th></tr>"#);
    for b in best {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:+.4}</td></tr>",
            escape(&b.variable),
            b.lag,
            b.correlation
        ));
    }
    html.push_str("</table></div>");

    html.push_str(&format!(
        r##"<form class="controls" hx-get="/analysis" hx-target="#content" hx-trigger="change">
<label>Rolling window (days):
<input type="range" name="window" min="30" max="180" step="30" value="{window}"
 oninput="this.nextElementSibling.textContent = this.value"><output>{window}</output>
</label>
</form>"##
    ));

    html.push_str(&format!(
        r#"<div class="card"><h2>Rolling Correlation vs {} ({window}-day window)</h2>"#,
        escape(target)
    ));
    html.push_str(&line_chart(rolling, 1000.0, 300.0));
    html.push_str("</div>");

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::correlation::correlation_matrix;
    use crate::domain::series::{PricePoint, PriceSeries};
    use chrono::NaiveDate;

    fn sample_table() -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series: Vec<PriceSeries> = [("IDX", 100.0), ("Gold", 2000.0)]
            .into_iter()
            .map(|(name, base)| {
                PriceSeries::new(
                    name,
                    name,
                    (0..10)
                        .map(|i| PricePoint {
                            date: start + chrono::Days::new(i),
                            close: base + i as f64,
                        })
                        .collect(),
                )
            })
            .collect();
        PriceTable::merge(&series)
    }

    #[test]
    fn page_wraps_content_in_shell() {
        let html = page("indexcast", "<p>hello</p>").unwrap();
        assert!(html.contains("<title>indexcast</title>"));
        assert!(html.contains("<p>hello</p>"));
    }

    #[test]
    fn dashboard_shell_has_three_tabs() {
        let html = dashboard_shell("BIST100", "<p>market</p>");
        assert_eq!(html.matches("hx-get").count(), 3);
        assert!(html.contains("BIST100 Direction Forecast"));
        assert!(html.contains("<p>market</p>"));
    }

    #[test]
    fn correlation_table_renders_all_cells() {
        let matrix = correlation_matrix(&sample_table());
        let html = correlation_table(&matrix);
        assert_eq!(html.matches("<td").count(), 4);
        assert!(html.contains("IDX"));
    }

    #[test]
    fn market_fragment_has_charts_and_controls() {
        let html = market_fragment(&sample_table(), None, "3m", false);
        assert!(html.contains("Close Prices"));
        assert!(html.contains("Daily Changes"));
        assert!(html.contains("<svg"));
        assert!(html.contains(r#"<option value="3m" selected"#));
    }

    #[test]
    fn forecast_fragment_without_model_shows_notice() {
        let html = forecast_fragment("IDX", &sample_table(), None, None, None, &[]);
        assert!(html.contains("No trained model"));
        assert!(html.contains("Last 5 Sessions"));
    }

    #[test]
    fn forecast_fragment_with_prediction_shows_probability() {
        let prediction = Prediction {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            direction: 1,
            probability: 0.64,
        };
        let performance = RecentPerformance {
            window: 30,
            evaluated: 30,
            accuracy: 0.6,
            up_days: 18,
            down_days: 12,
        };
        let html = forecast_fragment(
            "IDX",
            &sample_table(),
            Some(&prediction),
            Some(&performance),
            None,
            &[("Gold_change_lag1".into(), 0.4)],
        );
        assert!(html.contains("RISE"));
        assert!(html.contains("64.0%"));
        assert!(html.contains("Gold_change_lag1"));
    }
}
