//! Public weather lookups; no session required.

use actix_web::{HttpResponse, web};
use serde_json::json;
use weather_core::{Coordinates, ValidationError};

use crate::{api_error::ApiError, server::AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/search/{city}", web::get().to(search))
        .route("/current/{lat}/{lon}", web::get().to(current))
        .route("/forecast/{lat}/{lon}", web::get().to(forecast));
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Coordinates, ValidationError> {
    let mut err = ValidationError::default();

    let mut parse = |field: &'static str, raw: &str| match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            err.push(field, format!("{field} must be a number"));
            None
        }
    };

    let lat = parse("lat", lat);
    let lon = parse("lon", lon);

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
        _ => Err(err),
    }
}

/// `GET /api/weather/search/{city}`
pub async fn search(state: web::Data<AppState>, city: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let cities = state.weather.search(&city).await?;
    Ok(HttpResponse::Ok().json(json!({ "cities": cities })))
}

/// `GET /api/weather/current/{lat}/{lon}`
pub async fn current(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (lat, lon) = path.into_inner();
    let at = parse_coordinates(&lat, &lon)?;

    let report = state.weather.current(at).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// `GET /api/weather/forecast/{lat}/{lon}`
///
/// Up to five daily summaries built from the provider's 3-hour samples.
pub async fn forecast(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (lat, lon) = path.into_inner();
    let at = parse_coordinates(&lat, &lon)?;

    let report = state.weather.forecast(at).await?;
    Ok(HttpResponse::Ok().json(report))
}
