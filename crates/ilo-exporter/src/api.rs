use crate::exposition;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use ilo_collector::{ScrapeError, ScrapeRequest};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Query parameters of a scrape.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub host: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

/// Landing page pointing at the metrics endpoint.
pub async fn landing(State(state): State<AppState>) -> Html<String> {
    let path = &state.config.web.metrics_path;
    Html(format!(
        r#"<html>
<head><title>iLO Exporter</title></head>
<body>
<h1>iLO Exporter</h1>
<p>Version {version}</p>
<p><a href="{path}?host=ilo.example.com">{path}?host=ilo.example.com</a></p>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// Scrapes one controller and renders its samples.
///
/// Dropping this future (client gone, server shutting down) cancels every
/// backend request still running for the scrape.
pub async fn metrics(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let request = ScrapeRequest::new(params.host.unwrap_or_default(), cancel)
        .with_credentials(params.user, params.pass);

    let outcome = match state
        .scraper
        .run(request, &state.client_options, &state.credentials)
        .await
    {
        Ok(outcome) => outcome,
        Err(ScrapeError::NoHost) => {
            tracing::error!(trace_id = %trace_id.0, "no host defined");
            return (StatusCode::INTERNAL_SERVER_ERROR, ScrapeError::NoHost.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Scrape could not start");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if outcome.errors > 0 {
        tracing::warn!(
            trace_id = %trace_id.0,
            host = %outcome.host,
            errors = outcome.errors,
            "Scrape finished with partial failures"
        );
    }

    match exposition::encode(&outcome.samples) {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, host = %outcome.host, error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
