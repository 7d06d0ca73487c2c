use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    Config,
    error::WeatherError,
    forecast::{normalize_current, normalize_forecast},
    model::{CitySearchResult, Coordinates, CurrentReport, ForecastReport, RawCurrentReading, RawForecast},
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

/// Maximum number of geocoding hits returned by a city search.
pub const SEARCH_LIMIT: usize = 5;

/// Upstream source of geocoding, current conditions and 3-hourly forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<CitySearchResult>, WeatherError>;

    async fn current(&self, at: Coordinates) -> Result<RawCurrentReading, WeatherError>;

    async fn forecast(&self, at: Coordinates) -> Result<RawForecast, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
    let api_key = config.openweather_api_key().ok_or(WeatherError::MissingApiKey)?;

    let provider = OpenWeatherProvider::new(api_key.to_owned())
        .with_lang(&config.openweather.lang)
        .with_base_urls(&config.openweather.base_url, &config.openweather.geo_base_url);

    Ok(Arc::new(provider))
}

/// Weather lookups with provider readings normalized for clients.
///
/// Built without a provider when no API key is configured; every lookup then fails
/// with [`WeatherError::MissingApiKey`].
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Option<Arc<dyn WeatherProvider>>,
}

impl WeatherService {
    pub fn new(provider: Option<Arc<dyn WeatherProvider>>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &Config) -> Self {
        match provider_from_config(config) {
            Ok(provider) => Self::new(Some(provider)),
            Err(e) => {
                log::warn!("weather lookups disabled: {e}");
                Self::new(None)
            }
        }
    }

    fn provider(&self) -> Result<&dyn WeatherProvider, WeatherError> {
        self.provider.as_deref().ok_or(WeatherError::MissingApiKey)
    }

    pub async fn search(&self, city: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        let cities = self.provider()?.search_cities(city, SEARCH_LIMIT).await?;

        if cities.is_empty() {
            return Err(WeatherError::NoCitiesFound(city.to_string()));
        }

        Ok(cities)
    }

    pub async fn current(&self, at: Coordinates) -> Result<CurrentReport, WeatherError> {
        let raw = self.provider()?.current(at).await?;
        Ok(normalize_current(raw, Utc::now()))
    }

    pub async fn forecast(&self, at: Coordinates) -> Result<ForecastReport, WeatherError> {
        let raw = self.provider()?.forecast(at).await?;
        Ok(normalize_forecast(raw, Utc::now()))
    }
}
