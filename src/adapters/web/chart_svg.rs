//! Server-rendered SVG line charts for the dashboard.

pub const PALETTE: [&str; 7] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
];

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Multi-series line chart. Series are drawn over a shared y-range with a
/// small legend; the x-axis is the sample index.
pub fn line_chart(series: &[ChartSeries], width: f64, height: f64) -> String {
    let finite: Vec<f64> = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite())
        .collect();
    if finite.is_empty() {
        return "<p>No data available.</p>".to_string();
    }

    let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        max - min
    };

    let padding = 42.0;
    let plot_width = width - 2.0 * padding;
    let plot_height = height - 2.0 * padding;

    let mut svg = format!(
        r#"<svg viewBox="0 0 {width:.0} {height:.0}" xmlns="http://www.w3.org/2000/svg" role="img">"#
    );
    svg.push_str(&format!(
        r#"<rect width="{width:.0}" height="{height:.0}" fill="white"/>"#
    ));

    // Axes.
    svg.push_str(&format!(
        r##"<line x1="{p:.1}" y1="{p:.1}" x2="{p:.1}" y2="{b:.1}" stroke="#8a97a5" stroke-width="1"/>"##,
        p = padding,
        b = height - padding
    ));
    svg.push_str(&format!(
        r##"<line x1="{p:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="#8a97a5" stroke-width="1"/>"##,
        p = padding,
        b = height - padding,
        r = width - padding
    ));

    // Y-range labels.
    svg.push_str(&format!(
        r##"<text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end" fill="#5c6b7a">{max:.2}</text>"##,
        x = padding - 4.0,
        y = padding + 4.0
    ));
    svg.push_str(&format!(
        r##"<text x="{x:.1}" y="{y:.1}" font-size="10" text-anchor="end" fill="#5c6b7a">{min:.2}</text>"##,
        x = padding - 4.0,
        y = height - padding + 4.0
    ));

    for (i, s) in series.iter().enumerate() {
        if s.values.len() < 2 {
            continue;
        }
        let color = PALETTE[i % PALETTE.len()];
        let step = plot_width / (s.values.len() - 1) as f64;

        let points: Vec<String> = s
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(j, v)| {
                let x = padding + j as f64 * step;
                let y = height - padding - (v - min) / range * plot_height;
                format!("{x:.1},{y:.1}")
            })
            .collect();

        svg.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
            points.join(" "),
            color
        ));

        // Legend entry.
        let lx = padding + 8.0 + i as f64 * 110.0;
        svg.push_str(&format!(
            r#"<rect x="{lx:.1}" y="{y:.1}" width="10" height="3" fill="{color}"/>"#,
            y = padding - 18.0
        ));
        svg.push_str(&format!(
            r##"<text x="{x:.1}" y="{y:.1}" font-size="10" fill="#1c2733">{name}</text>"##,
            x = lx + 14.0,
            y = padding - 12.0,
            name = s.name
        ));
    }

    svg.push_str("</svg>");
    svg
}
