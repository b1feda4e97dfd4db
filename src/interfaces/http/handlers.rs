use super::dto::{StartJobRequest, StartJobResponse, StatusQuery, StatusResponse};
use super::error::ApiError;
use crate::application::gatekeeper::{FIELD_AD_CATEGORY, FIELD_AD_CONTENT_URL, FIELD_BID_AMOUNT};
use crate::application::orchestrator::Orchestrator;
use crate::domain::job::JobId;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn start_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: Result<Json<StartJobRequest>, JsonRejection>,
) -> Result<Json<StartJobResponse>, ApiError> {
    let Json(request) = payload.inspect_err(|e| warn!(error = %e, "malformed start_job body"))?;
    info!(
        purchaser = %request.identifier_from_purchaser,
        category = ?request.input_data.get(FIELD_AD_CATEGORY),
        "received job request"
    );

    let ticket = orchestrator
        .create_job(request.identifier_from_purchaser, request.input_data)
        .await
        .inspect_err(|e| error!(error = %e, "start_job failed"))
        .map_err(ApiError::Creation)?;

    Ok(Json(ticket.into()))
}

pub async fn status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    // A malformed identifier cannot name a job, so it is simply unknown.
    let Ok(job_id) = query.job_id.parse::<JobId>() else {
        return Err(ApiError::UnknownJob);
    };

    let record = orchestrator.get_status(job_id).await?;
    Ok(Json(record.into()))
}

pub async fn availability() -> Json<Value> {
    Json(json!({
        "status": "available",
        "type": "masumi-agent",
        "message": "Server operational."
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn input_schema() -> Json<Value> {
    Json(json!({
        "input_data": [
            {
                "id": FIELD_AD_CATEGORY,
                "type": "string",
                "name": "Ad Category",
                "data": {"description": "e.g., Technology", "placeholder": "Technology"}
            },
            {
                "id": FIELD_BID_AMOUNT,
                "type": "string",
                "name": "Bid Amount",
                "data": {"description": "Offered bid, e.g. 5.0", "placeholder": "5.0"}
            },
            {
                "id": FIELD_AD_CONTENT_URL,
                "type": "string",
                "name": "Ad Content URL",
                "data": {"description": "IPFS Link", "placeholder": "https://..."}
            }
        ]
    }))
}
