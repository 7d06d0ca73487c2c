//! Favorite cities of the authenticated account.

use actix_web::{HttpResponse, web};
use serde_json::json;
use weather_core::{LocationCandidate, LocationId};

use crate::{api_error::ApiError, server::AppState, session::Session};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(add)),
    )
    .route("/{city_id}", web::delete().to(remove));
}

/// `GET /api/cities`
pub async fn list(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, ApiError> {
    let cities = state.favorites.list(session.account.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "cities": cities })))
}

/// `POST /api/cities`
///
/// A coordinate pair that is already a favorite is answered with 400 and leaves the
/// list untouched.
pub async fn add(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<LocationCandidate>,
) -> Result<HttpResponse, ApiError> {
    let outcome = state.favorites.add(session.account.id, &body).await?;

    if !outcome.inserted {
        return Err(ApiError::BadRequest(
            "this city is already in your favorites".to_string(),
        ));
    }

    Ok(HttpResponse::Created().json(json!({
        "message": "city added to favorites",
        "cities": outcome.favorites,
    })))
}

/// `DELETE /api/cities/{city_id}`
pub async fn remove(
    state: web::Data<AppState>,
    session: Session,
    city_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id: LocationId = city_id
        .parse()
        .map_err(|_| ApiError::NotFound("city not found".to_string()))?;

    let cities = state.favorites.remove(session.account.id, id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "city removed from favorites",
        "cities": cities,
    })))
}
