//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{AnalysisQuery, AnalysisResponse, ErrorResponse, SystemSummary};
use crate::data::SystemId;
use crate::engine::{RoundingStep, TempQuantity, TempRange};
use crate::error::ConfigurationError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<ConfigurationError> for (StatusCode, Json<ErrorResponse>) {
    fn from(e: ConfigurationError) -> Self {
        let status = match e {
            ConfigurationError::UnknownSystem { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        error(status, e.to_string())
    }
}

/// Lists defined systems.
///
/// `GET /systems` → 200 + `Vec<SystemSummary>` JSON
pub async fn get_systems(State(state): State<Arc<AppState>>) -> Json<Vec<SystemSummary>> {
    Json(
        state
            .prepared
            .systems()
            .iter()
            .map(SystemSummary::from)
            .collect(),
    )
}

/// Runs the analysis for one system.
///
/// `GET /analysis/2` → 200 + `AnalysisResponse` JSON
/// `GET /analysis/2?quantity=temp_out&m_round=1&lo=20&hi=30` → overrides
/// `GET /analysis/9` → 404 when system 9 is not defined
/// `GET /analysis/2?m_round=0` → 400 + `ErrorResponse`
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(system): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let id: SystemId = system.parse().map_err(|_| {
        error(
            StatusCode::BAD_REQUEST,
            format!("'{system}' is not a system identifier"),
        )
    })?;

    let mut request = state.config.request(id)?;
    if let Some(m) = query.m_round {
        request.step = RoundingStep::new(m)?;
    }
    if let Some(q) = query.quantity.as_deref() {
        request.quantity = q
            .parse::<TempQuantity>()
            .map_err(|e| error(StatusCode::BAD_REQUEST, e))?;
    }

    // Reject a malformed range even when no record carries the quantity
    match (query.lo, query.hi) {
        (Some(lo), Some(hi)) => {
            TempRange::new(lo, hi)?;
        }
        (Some(v), None) | (None, Some(v)) => {
            TempRange::new(v, v)?;
        }
        (None, None) => {}
    }

    let result = state.prepared.analyze(&request)?;

    let range = match (query.lo, query.hi) {
        (None, None) => request.range,
        (lo, hi) => match result.quantity_bounds(request.quantity) {
            Some((min, max)) => Some(TempRange::new(lo.unwrap_or(min), hi.unwrap_or(max))?),
            None => None,
        },
    };
    let savings = result.savings_for(request.quantity, range);

    Ok(Json(AnalysisResponse::new(&result, savings)))
}
