use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use catalog::activities::{ActivityPayload, Filter};
use elapsed::{Elapsed, compute_difference};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    error::AppError,
    state::AppState,
    utils::{get_payload, instant_param},
};

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let new = get_payload(body)?.into_new()?;
    let activity = state.store.insert(new).await?;

    info!("Created activity {} ({})", activity.id, activity.name);
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.find_all().await?))
}

pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let activity = state.store.find_by_id(&id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(activity))
}

pub async fn snow_filter_handler(
    State(state): State<Arc<AppState>>,
    Path(required): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let filter = Filter::snow_from_param(&required);

    Ok(Json(state.store.find_by(filter).await?))
}

pub async fn free_filter_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.find_by(Filter::Free).await?))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let changes = get_payload(body)?.into_changes()?;
    let activity = state
        .store
        .update(&id, changes)
        .await?
        .ok_or(AppError::NotFound)?;

    info!("Updated activity {id}");
    Ok(Json(activity))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let activity = state.store.delete(&id).await?.ok_or(AppError::NotFound)?;

    info!("Deleted activity {id}");
    Ok(Json(json!({
        "message": "Activity deleted successfully",
        "activity": activity,
    })))
}

#[derive(Deserialize)]
pub struct Span {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Serialize)]
pub struct TimeDifference {
    #[serde(flatten)]
    elapsed: Elapsed,
    message: String,
}

pub async fn time_difference_handler(
    Query(span): Query<Span>,
) -> Result<impl IntoResponse, AppError> {
    let from = instant_param("from", span.from.as_deref())?;
    let to = instant_param("to", span.to.as_deref())?;

    let elapsed = compute_difference(&from, &to);

    Ok(Json(TimeDifference {
        elapsed,
        message: elapsed.to_string(),
    }))
}
