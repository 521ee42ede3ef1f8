// routes/estimates.rs
// Estimate endpoints: bulk replacement of a project's proposals, listing,
// and committing to one of them.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::routes::parse_object_id;
use crate::session::SessionUser;
use crate::state::{
    AppState, NewEstimate, list_project_estimates, replace_estimates, select_estimate,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeline: String,
    pub price: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddAllEstimatesRequest {
    #[serde(default)]
    pub estimates: Vec<EstimateRequest>,
}

pub async fn add_all_estimates(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(project_id): Path<String>,
    Json(body): Json<AddAllEstimatesRequest>,
) -> AppResult<Response> {
    let project_id = parse_object_id(&project_id, "project")?;
    let estimates = body
        .estimates
        .into_iter()
        .map(|input| NewEstimate {
            name: input.name,
            description: input.description,
            timeline: input.timeline,
            price: input.price,
            features: input.features,
            tech_stack: input.tech_stack,
        })
        .collect();

    let stored = replace_estimates(&state, session.user_id(), &project_id, estimates).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "estimates saved successfully",
            "data": stored,
        })),
    )
        .into_response())
}

pub async fn get_all_estimates(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(project_id): Path<String>,
) -> AppResult<Json<Value>> {
    let project_id = parse_object_id(&project_id, "project")?;
    let estimates = list_project_estimates(&state, session.user_id(), &project_id).await?;
    Ok(Json(json!({ "success": true, "data": estimates })))
}

pub async fn select_estimate_by_id(
    State(state): State<Arc<AppState>>,
    _session: SessionUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_object_id(&id, "estimate")?;
    let estimate = select_estimate(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "estimate selected successfully",
        "data": estimate,
    })))
}
