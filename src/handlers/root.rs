//! Root endpoint handler for the dashboard page.
//!
//! This module provides the `/` endpoint handler. The page itself is static;
//! a small script fills the metric fields from `/api/all` once it loads.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Build timestamp emitted by build.rs.
const BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// Metric cells on the page: (element id, /api/all key, label).
pub const DASHBOARD_FIELDS: [(&str, &str, &str); 8] = [
    ("current-time", "Current Time", "Current Time"),
    ("ip-address", "IP Address", "IP Address"),
    ("cpu-usage", "CPU Usage", "CPU Usage"),
    ("soc-temp", "SoC Temperature", "SoC Temperature"),
    ("total-ram", "Total RAM", "Total RAM"),
    ("used-ram", "Used RAM", "Used RAM (MiB)"),
    ("total-swap", "Total Swap", "Total Swap"),
    ("used-swap", "Used Swap", "Used Swap (MiB)"),
];

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    Html(render_dashboard(env!("CARGO_PKG_VERSION"), &uptime_str))
}

/// Renders the dashboard HTML.
pub fn render_dashboard(version: &str, uptime: &str) -> String {
    let cells: String = DASHBOARD_FIELDS
        .iter()
        .map(|(id, _, label)| {
            format!(
                r#"        <div class="metric">
            <span class="metric-label">{label}</span>
            <span class="metric-value" id="{id}">-</span>
        </div>
"#
            )
        })
        .collect();

    let bindings: String = DASHBOARD_FIELDS
        .iter()
        .map(|(id, key, _)| {
            format!("            document.getElementById('{id}').textContent = data['{key}'];\n")
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>RPi Metrics</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 720px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #c51a4a;
            padding-bottom: 15px;
            margin-bottom: 10px;
        }}
        .grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(200px, 1fr));
            gap: 15px;
            margin: 30px 0;
        }}
        .metric {{
            padding: 15px;
            background: #f8f9fa;
            border-left: 4px solid #c51a4a;
            border-radius: 4px;
        }}
        .metric-label {{
            font-weight: 600;
            color: #555;
            display: block;
            font-size: 0.9em;
        }}
        .metric-value {{
            font-size: 1.3em;
            color: #c51a4a;
        }}
        .footer {{
            margin-top: 40px;
            padding-top: 20px;
            border-top: 1px solid #ddd;
            color: #666;
            font-size: 0.9em;
            text-align: center;
        }}
    </style>
</head>
<body>
<div class="container">
    <h1>RPi Metrics</h1>
    <div class="grid">
{cells}    </div>
    <div class="footer">
        <p>rpi-metrics {version} (built {built}) &middot; up {uptime} &middot; JSON at <a href="/api/all">/api/all</a></p>
    </div>
</div>
<script>
    window.onload = function() {{
        fetch('/api/all')
            .then(response => response.json())
            .then(data => {{
{bindings}            }})
            .catch(error => console.error('Error fetching API data:', error));
    }};
</script>
</body>
</html>"#,
        cells = cells,
        bindings = bindings,
        version = version,
        built = BUILD_TIMESTAMP,
        uptime = uptime,
    )
}
