//! HTTP routes for the signal intelligence service.
//!
//! All core operations share one invocation endpoint that dispatches on the
//! request's `action` field:
//!
//! | action              | required field  |
//! |---------------------|-----------------|
//! | `analyze_signals`   | none            |
//! | `push_to_alerts`    | `signal`        |
//! | `update_thresholds` | `current_drift` |

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use sentinel_common::logging::generate_trace_id;

use crate::error::{IntelError, Result};
use crate::types::{IntelligenceMetrics, PatternShift, Signal, ThresholdConfig};
use crate::IntelState;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body of `POST /api/v1/intelligence`.
#[derive(Debug, Deserialize)]
pub struct InvocationRequest {
    pub action: String,
    #[serde(default)]
    pub signal: Option<Signal>,
    #[serde(default)]
    pub current_drift: Option<f64>,
}

/// Dispatch target for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AnalyzeSignals,
    PushToAlerts,
    UpdateThresholds,
}

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "analyze_signals" => Some(Self::AnalyzeSignals),
            "push_to_alerts" => Some(Self::PushToAlerts),
            "update_thresholds" => Some(Self::UpdateThresholds),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub top_signals: Vec<Signal>,
    pub pattern_shifts: Vec<PatternShift>,
    pub intelligence_metrics: IntelligenceMetrics,
    pub run_id: String,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    pub success: bool,
    pub thresholds: ThresholdConfig,
}

// ============================================================================
// Router
// ============================================================================

/// Build the service router with permissive CORS.
pub fn build_router(state: Arc<IntelState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/intelligence", post(invoke))
        .route("/api/v1/intelligence/snapshot", get(latest_snapshot))
        .with_state(state)
        .layer(cors)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health(State(state): State<Arc<IntelState>>) -> impl IntoResponse {
    let scheduler = &state.scheduler;
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sentinel-intel",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler": {
            "state": scheduler.get_state().await,
            "next_run": scheduler.next_run(),
            "last_execution": scheduler.last_execution().await
        }
    }))
}

/// Single invocation endpoint.
async fn invoke(
    State(state): State<Arc<IntelState>>,
    payload: std::result::Result<Json<InvocationRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) =
        payload.map_err(|rejection| IntelError::InvalidRequest(rejection.body_text()))?;

    let span = tracing::info_span!(
        "intel_invocation",
        trace_id = %generate_trace_id(),
        action = %request.action
    );

    dispatch(&state, request).instrument(span).await
}

async fn dispatch(state: &IntelState, request: InvocationRequest) -> Result<Response> {
    let action =
        Action::parse(&request.action).ok_or_else(|| IntelError::UnknownAction(request.action.clone()))?;

    match action {
        Action::AnalyzeSignals => {
            let snapshot = state.analyzer.analyze().await?;
            Ok(Json(AnalyzeResponse {
                success: true,
                top_signals: snapshot.top_signals,
                pattern_shifts: snapshot.pattern_shifts,
                intelligence_metrics: snapshot.intelligence_metrics,
                run_id: snapshot.run_id,
                analysis_timestamp: snapshot.analysis_timestamp,
            })
            .into_response())
        }
        Action::PushToAlerts => {
            let signal = request
                .signal
                .ok_or_else(|| IntelError::InvalidRequest("Missing required field: signal".into()))?;
            let alert = state.analyzer.push_to_alerts(&signal).await?;
            Ok(Json(PushResponse {
                success: true,
                message: format!(
                    "Signal {} pushed to alerts with {} severity",
                    signal.id, alert.severity
                ),
            })
            .into_response())
        }
        Action::UpdateThresholds => {
            let drift = request.current_drift.ok_or_else(|| {
                IntelError::InvalidRequest("Missing required field: current_drift".into())
            })?;
            let thresholds = state.analyzer.update_thresholds(drift).await?;
            Ok(Json(ThresholdsResponse {
                success: true,
                thresholds,
            })
            .into_response())
        }
    }
}

/// Last cached analysis snapshot.
async fn latest_snapshot(State(state): State<Arc<IntelState>>) -> Result<Response> {
    match state.analyzer.latest_snapshot().await? {
        Some(snapshot) => Ok(Json(snapshot).into_response()),
        None => Err(IntelError::NotFound("no analysis snapshot yet".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("analyze_signals"), Some(Action::AnalyzeSignals));
        assert_eq!(Action::parse("push_to_alerts"), Some(Action::PushToAlerts));
        assert_eq!(Action::parse("update_thresholds"), Some(Action::UpdateThresholds));
        assert_eq!(Action::parse("Analyze_Signals"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_request_optional_fields() {
        let req: InvocationRequest =
            serde_json::from_str(r#"{"action":"update_thresholds","current_drift":-0.2}"#).unwrap();
        assert_eq!(req.current_drift, Some(-0.2));
        assert!(req.signal.is_none());
    }
}
