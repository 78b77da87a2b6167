use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::auth::AuthenticatedUser,
    models::treatment::{CreateTreatmentRequest, UpdateTreatmentRequest},
    services::treatments::TreatmentService,
    AppState,
};

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

/// Dashboard listing: scheduled / expired / done buckets as of today.
pub async fn list_treatments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let today = Local::now().date_naive();
    TreatmentService::list_buckets(&state.db, pet_id, &user.id, today)
        .await
        .map(|buckets| Json(serde_json::to_value(buckets).unwrap()))
        .map_err(internal_error)
}

pub async fn add_treatment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(pet_id): Path<Uuid>,
    Json(body): Json<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    TreatmentService::add(&state.db, pet_id, &user.id, &body)
        .await
        .map(|t| (StatusCode::CREATED, Json(serde_json::to_value(t).unwrap())))
        .map_err(internal_error)
}

pub async fn update_treatment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((pet_id, treatment_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateTreatmentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match TreatmentService::update(&state.db, pet_id, treatment_id, &user.id, &body)
        .await
        .map_err(internal_error)?
    {
        Some(t) => Ok(Json(serde_json::to_value(t).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Tratamento não encontrado ou sem permissão" })),
        )),
    }
}

pub async fn delete_treatment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((pet_id, treatment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let deleted = TreatmentService::delete(&state.db, pet_id, treatment_id, &user.id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(Json(json!({ "message": "Tratamento removido com sucesso!" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Tratamento não encontrado ou sem permissão" })),
        ))
    }
}
