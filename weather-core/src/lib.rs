//! Core library for the weather service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather provider abstraction and forecast normalization
//! - Per-account favorite locations with idempotent add and merge
//! - Account storage and bearer tokens
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod auth;
pub mod config;
pub mod error;
pub mod favorites;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod store;

pub use auth::{JwtTokenService, TokenService};
pub use config::Config;
pub use error::{AuthError, FavoriteError, StoreError, ValidationError, WeatherError};
pub use favorites::{FavoriteList, FavoriteStore};
pub use model::{AccountId, Coordinates, Location, LocationCandidate, LocationId};
pub use provider::{WeatherProvider, WeatherService};
pub use store::{AccountStore, CredentialStore, JsonAccountStore};
