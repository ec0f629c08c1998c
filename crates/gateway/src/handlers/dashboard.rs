//! Staff dashboard

use axum::{extract::State, Json};

use crate::AppState;
use shelter_common::{auth::SessionContext, errors::Result, services::DashboardSummary};

/// Counts of animals by listing status, applications by status and open tasks
pub async fn summary(
    State(state): State<AppState>,
    session: Option<SessionContext>,
) -> Result<Json<DashboardSummary>> {
    Ok(Json(state.services.animals.dashboard_summary(session.as_ref()).await?))
}
