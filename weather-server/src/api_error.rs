//! Mapping of domain errors onto HTTP responses.
//!
//! Client errors carry their message; server errors are logged and answered with a
//! generic message.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use weather_core::{AuthError, FavoriteError, StoreError, ValidationError, WeatherError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Favorite(#[from] FavoriteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::AccountNotFound => StatusCode::NOT_FOUND,
        StoreError::DuplicateAccount(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Serialization(_) | StoreError::Hash(_) | StoreError::Task(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::Weather(WeatherError::MissingApiKey) => {
                "weather provider API key is not configured".to_string()
            }
            ApiError::Weather(WeatherError::Unauthorized) => "invalid weather provider API key".to_string(),
            ApiError::Weather(WeatherError::NotFound(_)) => "coordinates not found".to_string(),
            ApiError::Weather(WeatherError::NoCitiesFound(_)) => "no city found with this name".to_string(),
            ApiError::Favorite(FavoriteError::NotFound(_)) => "city not found".to_string(),
            _ if self.status_code().is_server_error() => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn violations(&self) -> Option<&ValidationError> {
        match self {
            ApiError::Validation(v) | ApiError::Favorite(FavoriteError::Validation(v)) => Some(v),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
                AuthError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::Store(e) => store_status(e),
            },
            ApiError::Weather(err) => match err {
                WeatherError::Unauthorized => StatusCode::UNAUTHORIZED,
                WeatherError::NotFound(_) | WeatherError::NoCitiesFound(_) => StatusCode::NOT_FOUND,
                WeatherError::MissingApiKey
                | WeatherError::Http(_)
                | WeatherError::Status { .. }
                | WeatherError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Favorite(err) => match err {
                FavoriteError::Validation(_) => StatusCode::BAD_REQUEST,
                FavoriteError::NotFound(_) => StatusCode::NOT_FOUND,
                FavoriteError::Persistence(e) => store_status(e),
            },
            ApiError::Store(err) => store_status(err),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {self}");
        } else {
            log::debug!("request rejected ({status}): {self}");
        }

        let mut body = json!({ "message": self.message() });
        if let Some(v) = self.violations() {
            body["errors"] = v
                .violations
                .iter()
                .map(|f| json!({ "field": f.field, "message": f.message }))
                .collect();
        }

        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::Store(StoreError::Io(std::io::Error::other("/var/lib/secret path")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn weather_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(WeatherError::Unauthorized).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(WeatherError::NotFound("1,2".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        let missing = ApiError::from(WeatherError::MissingApiKey);
        assert_eq!(missing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.message(), "weather provider API key is not configured");
    }

    #[test]
    fn validation_keeps_message() {
        let err = ApiError::from(ValidationError::single("lat", "lat is required"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "lat is required");
        assert!(err.violations().is_some());
    }
}
