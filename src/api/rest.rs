// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The dashboard is a local, read-mostly
// tool and carries no authentication.
//
// CORS is configured permissively so a browser front-end served from another
// origin can poll the view.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::app_state::DashboardSession;
use crate::runtime_config::ControlsUpdate;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared session.
pub fn router(session: Arc<DashboardSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/series", get(series))
        .route("/api/v1/controls", get(get_controls).post(set_controls))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(session)
}

// =============================================================================
// Health / status
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(session): State<Arc<DashboardSession>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: session.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn status(State(session): State<Arc<DashboardSession>>) -> impl IntoResponse {
    Json(session.status())
}

// =============================================================================
// Dashboard view and series
// =============================================================================

async fn dashboard(State(session): State<Arc<DashboardSession>>) -> impl IntoResponse {
    Json(session.view())
}

async fn series(State(session): State<Arc<DashboardSession>>) -> impl IntoResponse {
    Json(session.buffer.snapshot())
}

// =============================================================================
// Controls
// =============================================================================

#[derive(Serialize)]
struct ControlsResponse {
    symbol: String,
    refresh_interval_secs: u64,
    alert_threshold: f64,
    dark_mode: bool,
    data_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<Vec<String>>,
}

fn controls_response(session: &DashboardSession, changes: Option<Vec<String>>) -> ControlsResponse {
    let config = session.controls();
    ControlsResponse {
        symbol: config.symbol,
        refresh_interval_secs: config.refresh_interval_secs,
        alert_threshold: config.alert_threshold,
        dark_mode: config.dark_mode,
        data_source: config.data_source.to_string(),
        changes,
    }
}

async fn get_controls(State(session): State<Arc<DashboardSession>>) -> impl IntoResponse {
    Json(controls_response(&session, None))
}

async fn set_controls(
    State(session): State<Arc<DashboardSession>>,
    Json(update): Json<ControlsUpdate>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    match session.update_controls(&update) {
        Ok(changes) => Ok(Json(controls_response(&session, Some(changes)))),
        Err(e) => {
            warn!(error = %e, "Rejected controls update");
            Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::dashboard::KPI_LAST_PRICE;
    use crate::runtime_config::DashboardConfig;
    use crate::types::Observation;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session() -> Arc<DashboardSession> {
        Arc::new(DashboardSession::new(DashboardConfig::default(), None))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = router(session())
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn dashboard_returns_rendered_view() {
        let session = session();
        session.buffer.append(Observation::now(65000.5, 12.34));
        session.publish_tick(None);

        let resp = router(session)
            .oneshot(Request::get("/api/v1/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let kpis = json["kpis"].as_array().unwrap();
        let last = kpis.iter().find(|k| k["label"] == KPI_LAST_PRICE).unwrap();
        assert_eq!(last["value"], "$65,000.50");
        assert_eq!(json["chart"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn series_has_derived_columns() {
        let session = session();
        session.buffer.append(Observation::now(100.0, 1.0));
        session.buffer.append(Observation::now(110.0, 1.0));

        let resp = router(session)
            .oneshot(Request::get("/api/v1/series").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["pct_change"], 0.0);
        assert!((rows[1]["pct_change"].as_f64().unwrap() - 10.0).abs() < 1e-9);
        assert!((rows[1]["rolling_mean"].as_f64().unwrap() - 105.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn controls_update_normalises_symbol() {
        let session = session();
        let req = Request::post("/api/v1/controls")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{ "symbol": "ethusdt", "dark_mode": true }"#))
            .unwrap();
        let resp = router(session.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["symbol"], "ETHUSDT");
        assert_eq!(json["dark_mode"], true);
        assert_eq!(json["changes"].as_array().unwrap().len(), 2);
        assert_eq!(session.controls().symbol, "ETHUSDT");
    }

    #[tokio::test]
    async fn controls_update_rejects_out_of_range_interval() {
        let session = session();
        let req = Request::post("/api/v1/controls")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{ "refresh_interval_secs": 45 }"#))
            .unwrap();
        let resp = router(session.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(session.controls().refresh_interval_secs, 5);
    }
}
