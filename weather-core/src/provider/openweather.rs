use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::WeatherError,
    model::{CitySearchResult, Coordinates, PlaceSummary, RawCurrentReading, RawForecast, RawForecastSample},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEO_BASE_URL: &str = "https://api.openweathermap.org/geo/1.0";
pub const DEFAULT_LANG: &str = "fr";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    lang: String,
    base_url: String,
    geo_base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            lang: DEFAULT_LANG.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Language of the descriptions returned by the provider.
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    pub fn with_base_urls(mut self, base_url: &str, geo_base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.geo_base_url = geo_base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, WeatherError> {
        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        match status {
            s if s.is_success() => Ok(serde_json::from_str(&body)?),
            StatusCode::UNAUTHORIZED => Err(WeatherError::Unauthorized),
            StatusCode::NOT_FOUND => Err(WeatherError::NotFound(what.to_string())),
            status => Err(WeatherError::Status {
                status,
                body: truncate_body(&body),
            }),
        }
    }

    fn coordinate_query(&self, at: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("units", "metric".to_string()),
            ("lang", self.lang.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoResult {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    coord: OwCoord,
    #[serde(default)]
    sys: OwSys,
    main: OwMain,
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: String,
    coord: OwCoord,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

/// Description and icon of the first reported condition.
fn primary_condition(weather: &[OwWeather]) -> (String, String) {
    weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()))
}

impl From<OwForecastEntry> for RawForecastSample {
    fn from(entry: OwForecastEntry) -> Self {
        let (description, icon) = primary_condition(&entry.weather);

        Self {
            timestamp: entry.dt,
            temperature_c: entry.main.temp,
            description,
            icon,
            humidity_pct: entry.main.humidity,
            pressure_hpa: entry.main.pressure,
            wind_speed_ms: entry.wind.and_then(|w| w.speed),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<CitySearchResult>, WeatherError> {
        let url = format!("{}/direct", self.geo_base_url);

        let results: Vec<OwGeoResult> = self
            .get_json(
                &url,
                &[("q", query.to_string()), ("limit", limit.to_string())],
                query,
            )
            .await?;

        log::debug!("geocoding '{query}' returned {} result(s)", results.len());

        Ok(results
            .into_iter()
            .take(limit)
            .map(|c| CitySearchResult {
                name: c.name,
                country: c.country,
                state: c.state,
                lat: c.lat,
                lon: c.lon,
            })
            .collect())
    }

    async fn current(&self, at: Coordinates) -> Result<RawCurrentReading, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let what = format!("{},{}", at.lat, at.lon);

        let parsed: OwCurrentResponse = self.get_json(&url, &self.coordinate_query(at), &what).await?;

        let (description, icon) = primary_condition(&parsed.weather);
        let (wind_speed_ms, wind_direction_deg) = parsed
            .wind
            .map(|w| (w.speed, w.deg))
            .unwrap_or((None, None));

        Ok(RawCurrentReading {
            place: PlaceSummary {
                name: parsed.name,
                country: parsed.sys.country.unwrap_or_default(),
                lat: parsed.coord.lat,
                lon: parsed.coord.lon,
            },
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            pressure_hpa: parsed.main.pressure,
            visibility_m: parsed.visibility,
            description,
            icon,
            wind_speed_ms,
            wind_direction_deg,
        })
    }

    async fn forecast(&self, at: Coordinates) -> Result<RawForecast, WeatherError> {
        let url = format!("{}/forecast", self.base_url);
        let what = format!("{},{}", at.lat, at.lon);

        let parsed: OwForecastResponse = self.get_json(&url, &self.coordinate_query(at), &what).await?;

        log::debug!(
            "forecast for {what} returned {} sample(s) for {}",
            parsed.list.len(),
            parsed.city.name
        );

        Ok(RawForecast {
            place: PlaceSummary {
                name: parsed.city.name,
                country: parsed.city.country,
                lat: parsed.city.coord.lat,
                lon: parsed.city.coord.lon,
            },
            samples: parsed.list.into_iter().map(RawForecastSample::from).collect(),
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }

    #[test]
    fn forecast_entry_without_wind_has_no_speed() {
        let entry: OwForecastEntry = serde_json::from_str(
            r#"{"dt": 1, "main": {"temp": 3.2, "humidity": 80, "pressure": 1000},
                "weather": [{"description": "pluie", "icon": "10d"}]}"#,
        )
        .unwrap();

        let sample = RawForecastSample::from(entry);
        assert_eq!(sample.wind_speed_ms, None);
        assert_eq!(sample.description, "pluie");
    }

    #[test]
    fn base_urls_lose_trailing_slash() {
        let provider = OpenWeatherProvider::new("k".into()).with_base_urls("http://x/data/", "http://x/geo/");
        assert_eq!(provider.base_url, "http://x/data");
        assert_eq!(provider.geo_base_url, "http://x/geo");
    }
}
