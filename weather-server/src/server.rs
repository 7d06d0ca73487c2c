//! HTTP server wiring: shared state, route table and startup.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use serde_json::json;
use weather_core::{
    AccountStore, Config, CredentialStore, FavoriteStore, JsonAccountStore, JwtTokenService,
    TokenService, WeatherService,
};

use crate::{api_error::ApiError, routes};

/// Request bodies above this size are rejected.
const JSON_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub weather: WeatherService,
    pub favorites: FavoriteStore,
    pub accounts: Arc<dyn AccountStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    pub fn new<S>(weather: WeatherService, store: Arc<S>, tokens: Arc<dyn TokenService>) -> Self
    where
        S: AccountStore + CredentialStore + 'static,
    {
        Self {
            weather,
            favorites: FavoriteStore::new(store.clone()),
            accounts: store.clone(),
            credentials: store,
            tokens,
        }
    }
}

/// Route table, mounted under `/api`.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::scope("/auth").configure(routes::auth::configure))
            .service(web::scope("/cities").configure(routes::favorites::configure))
            .service(web::scope("/weather").configure(routes::weather::configure)),
    );
}

/// JSON extractor settings: size limit and JSON-shaped parse errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| ApiError::BadRequest(format!("invalid request body: {err}")).into())
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "message": "route not found" }))
}

fn cors(origins: &[String]) -> Cors {
    origins.iter().fold(
        Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials(),
        |cors, origin| cors.allowed_origin(origin.trim_end_matches('/')),
    )
}

/// Opens the account store, builds the shared state and serves until shutdown.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        config.jwt_secret()?,
        chrono::Duration::days(config.auth.token_ttl_days),
    ));

    let accounts_file = config.accounts_file()?;
    log::info!("Opening account store at {}", accounts_file.display());
    let store = Arc::new(
        JsonAccountStore::open(&accounts_file)
            .await
            .with_context(|| format!("Failed to open account store: {}", accounts_file.display()))?,
    );

    let weather = WeatherService::from_config(&config);
    let state = web::Data::new(AppState::new(weather, store, tokens));

    let bind_addr = config.server.bind_address.clone();
    let port = config.server.port;
    let origins = config.server.allowed_origins.clone();

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(json_config())
            .configure(api_routes)
            .default_service(web::to(not_found))
    })
    .bind((bind_addr.as_str(), port))
    .with_context(|| format!("Failed to bind {bind_addr}:{port}"))?
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use actix_web::web;
    use weather_core::{JsonAccountStore, JwtTokenService, WeatherProvider, WeatherService};

    use super::AppState;

    pub const SECRET: &str = "test-secret";

    /// Lowest bcrypt cost; keeps registration in tests fast.
    const HASH_COST: u32 = 4;

    pub fn state(provider: Option<Arc<dyn WeatherProvider>>) -> web::Data<AppState> {
        let tokens = Arc::new(JwtTokenService::new(SECRET, chrono::Duration::days(7)));
        web::Data::new(AppState::new(
            WeatherService::new(provider),
            Arc::new(JsonAccountStore::in_memory().with_hash_cost(HASH_COST)),
            tokens,
        ))
    }
}
