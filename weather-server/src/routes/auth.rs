//! Registration, login and reconciliation of a pre-login favorite list.

use actix_web::{HttpResponse, web};
use serde_json::{Value, json};
use weather_core::{
    LocationCandidate,
    auth::{LoginRequest, RegistrationRequest},
    store::AccountSummary,
};

use crate::{api_error::ApiError, server::AppState, session::Session};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/verify", web::get().to(verify))
        .route("/merge-cities", web::post().to(merge_cities));
}

fn session_body(state: &AppState, message: &str, user: AccountSummary) -> Result<Value, ApiError> {
    let token = state.tokens.issue(user.id)?;
    Ok(json!({ "message": message, "token": token, "user": user }))
}

/// `POST /api/auth/register`
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    let account = body.into_inner().validate()?;
    let user = state.accounts.create_account(account).await?;

    Ok(HttpResponse::Created().json(session_body(&state, "account created", user)?))
}

/// `POST /api/auth/login`
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let user = state
        .credentials
        .verify_credential(&body.email, &body.password)
        .await?;

    Ok(HttpResponse::Ok().json(session_body(&state, "signed in", user)?))
}

/// `GET /api/auth/verify`
pub async fn verify(session: Session) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "user": session.account }))
}

/// `POST /api/auth/merge-cities`
///
/// Entries that cannot be read as a city are skipped; the rest are merged by
/// coordinates.
pub async fn merge_cities(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let Some(items) = body.get("cities").and_then(Value::as_array) else {
        return Err(ApiError::BadRequest("invalid cities data".to_string()));
    };

    let candidates: Vec<LocationCandidate> = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                log::debug!("skipping unreadable merge entry: {e}");
                None
            }
        })
        .collect();

    let outcome = state.favorites.merge(session.account.id, &candidates).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} city(ies) added to your favorites", outcome.added),
        "cities": outcome.favorites,
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::server::{api_routes, json_config, test_support};

    async fn post(state: &web::Data<AppState>, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .app_data(json_config())
                .configure(api_routes),
        )
        .await;

        let mut req = test::TestRequest::post().uri(uri).set_json(body);
        if let Some(token) = token {
            req = req.insert_header(("Authorization", format!("Bearer {token}")));
        }

        let res = test::call_service(&app, req.to_request()).await;
        let status = res.status();
        (status, test::read_body_json(res).await)
    }

    async fn register_erin(state: &web::Data<AppState>) -> String {
        let (status, body) = post(
            state,
            "/api/auth/register",
            None,
            json!({ "username": "erin", "email": "Erin@Example.com", "password": "secret1" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    #[actix_web::test]
    async fn register_then_login() {
        let state = test_support::state(None);
        register_erin(&state).await;

        let (status, body) = post(
            &state,
            "/api/auth/login",
            None,
            json!({ "email": "erin@example.com", "password": "secret1" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "erin");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["token"].is_string());
    }

    #[actix_web::test]
    async fn wrong_password_is_400() {
        let state = test_support::state(None);
        register_erin(&state).await;

        let (status, _) = post(
            &state,
            "/api/auth/login",
            None,
            json!({ "email": "erin@example.com", "password": "nope" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn invalid_registration_lists_fields() {
        let state = test_support::state(None);

        let (status, body) = post(
            &state,
            "/api/auth/register",
            None,
            json!({ "username": "x", "email": "bad", "password": "1" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn duplicate_registration_is_400() {
        let state = test_support::state(None);
        register_erin(&state).await;

        let (status, body) = post(
            &state,
            "/api/auth/register",
            None,
            json!({ "username": "erin2", "email": "erin@example.com", "password": "secret1" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "this email is already registered");
    }

    #[actix_web::test]
    async fn merge_adds_each_coordinate_once() {
        let state = test_support::state(None);
        let token = register_erin(&state).await;
        let paris = json!({ "name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35 });

        let (status, body) = post(
            &state,
            "/api/auth/merge-cities",
            Some(&token),
            json!({ "cities": [paris.clone(), paris.clone(), { "name": "Broken", "lat": "x" }] }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "1 city(ies) added to your favorites");
        assert_eq!(body["cities"].as_array().unwrap().len(), 1);

        let (_, body) = post(
            &state,
            "/api/auth/merge-cities",
            Some(&token),
            json!({ "cities": [paris] }),
        )
        .await;
        assert_eq!(body["message"], "0 city(ies) added to your favorites");
    }

    #[actix_web::test]
    async fn merge_requires_a_list() {
        let state = test_support::state(None);
        let token = register_erin(&state).await;

        let (status, body) = post(
            &state,
            "/api/auth/merge-cities",
            Some(&token),
            json!({ "cities": "Paris" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid cities data");
    }

    #[actix_web::test]
    async fn merge_requires_a_session() {
        let state = test_support::state(None);
        let (status, _) = post(&state, "/api/auth/merge-cities", None, json!({ "cities": [] })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
