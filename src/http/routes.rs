use axum::{
    Json,
    extract::{FromRequest, Path, Query, Request, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;

use super::{AppState, error::ApiError};
use crate::model::{RestaurantPayload, RestaurantView};
use crate::service::{Listing, ServiceError};
use crate::translate::collect_params;

/// JSON body extractor whose rejection is a 400 with the usual error body.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub async fn list_handler(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Listing>, ApiError> {
    let Query(pairs) = query?;
    let params = collect_params(pairs).map_err(ServiceError::from)?;
    Ok(Json(state.service.list(&params)?))
}

pub async fn create_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RestaurantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.service.create(payload)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RestaurantView>, ApiError> {
    Ok(Json(state.service.get(&id)?))
}

pub async fn replace_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<RestaurantPayload>,
) -> Result<Json<RestaurantView>, ApiError> {
    Ok(Json(state.service.replace(&id, payload)?))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
