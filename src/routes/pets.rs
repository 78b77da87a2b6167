use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::auth::AuthenticatedUser,
    models::pet::{CreatePetRequest, GrantVetAccessRequest, LimitedPetView, UpdatePetRequest},
    services::pets::PetService,
    AppState,
};

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Pet não encontrado ou sem permissão" })),
    )
}

pub async fn list_pets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PetService::list_for_user(&state.db, &user.id)
        .await
        .map(|pets| Json(serde_json::to_value(pets).unwrap()))
        .map_err(internal_error)
}

pub async fn create_pet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    PetService::create(&state.db, &user.id, &body)
        .await
        .map(|pet| (StatusCode::CREATED, Json(serde_json::to_value(pet).unwrap())))
        .map_err(internal_error)
}

pub async fn get_pet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match PetService::get_for_user(&state.db, id, &user.id)
        .await
        .map_err(internal_error)?
    {
        Some(pet) => {
            let age = pet.age_in_years(chrono::Local::now().date_naive());
            let mut value = serde_json::to_value(pet).unwrap();
            value["age"] = json!(age);
            Ok(Json(value))
        }
        None => Err(not_found()),
    }
}

pub async fn update_pet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePetRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match PetService::update(&state.db, id, &user.id, &body)
        .await
        .map_err(internal_error)?
    {
        Some(pet) => Ok(Json(serde_json::to_value(pet).unwrap())),
        None => Err(not_found()),
    }
}

pub async fn delete_pet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let deleted = PetService::soft_delete(&state.db, id, &user.id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(Json(json!({ "message": "Pet removido com sucesso!" })))
    } else {
        Err(not_found())
    }
}

/// Nickname lookup: full record for accessors, public fields otherwise.
pub async fn find_by_nickname(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(nickname): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match PetService::find_by_nickname(&state.db, &nickname, &user.id)
        .await
        .map_err(internal_error)?
    {
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Pet não encontrado" })),
        )),
        Some((pet, true)) => {
            let mut value = serde_json::to_value(&pet).unwrap();
            value["has_access"] = json!(true);
            Ok(Json(value))
        }
        Some((pet, false)) => {
            let limited = LimitedPetView::from(&pet);
            let mut value = serde_json::to_value(limited).unwrap();
            value["message"] =
                json!("Você não tem acesso ao histórico completo deste pet.");
            Ok(Json(value))
        }
    }
}

pub async fn list_vets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PetService::list_vets_with_access(&state.db, id, &user.id)
        .await
        .map(|vets| Json(serde_json::to_value(vets).unwrap()))
        .map_err(internal_error)
}

pub async fn grant_vet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<GrantVetAccessRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let granted = PetService::grant_vet_access(&state.db, id, &user.id, &body.vet_id)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })?;
    let message = if granted {
        "Acesso concedido ao veterinário com sucesso!"
    } else {
        "O veterinário já tinha acesso a este pet."
    };
    Ok(Json(json!({ "message": message })))
}

pub async fn revoke_vet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, vet_id)): Path<(Uuid, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let revoked = PetService::revoke_vet_access(&state.db, id, &user.id, &vet_id)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })?;
    if revoked {
        Ok(Json(json!({ "message": "Acesso do veterinário removido com sucesso!" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Veterinário não tinha acesso a este pet" })),
        ))
    }
}
