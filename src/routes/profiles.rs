use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::auth::AuthenticatedUser,
    models::profile::UpsertProfileRequest,
    services::profiles::ProfileService,
    AppState,
};

pub async fn get_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let profile = ProfileService::get(&state.db, &user.id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    match profile {
        Some(p) => Ok(Json(serde_json::to_value(p).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Perfil não encontrado. Complete seu cadastro." })),
        )),
    }
}

/// Create or update the caller's profile. Id and email always come from the
/// identity provider, never from the body.
pub async fn upsert_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpsertProfileRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let email = user.email().to_string();

    ProfileService::upsert(&state.db, &user.id, &email, &body)
        .await
        .map(|p| Json(serde_json::to_value(p).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

#[derive(Debug, Deserialize)]
pub struct VetSearchParams {
    pub q: String,
}

pub async fn search_vets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<VetSearchParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ProfileService::search_veterinarians(&state.db, &params.q, &user.id)
        .await
        .map(|vets| Json(serde_json::to_value(vets).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
