use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifier of an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a favorite entry. Assigned on insertion and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub Uuid);

impl LocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LocationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Coordinate pair exactly as returned by the provider or sent by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Two places are the same favorite iff both coordinates compare equal as given.
///
/// No rounding and no distance threshold: two geocoding results a hair apart are
/// distinct favorites.
pub fn same_location(a: Coordinates, b: Coordinates) -> bool {
    a.lat == b.lat && a.lon == b.lon
}

/// A favorite location stored on an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub added_at: DateTime<Utc>,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Unvalidated favorite payload as received from a client.
///
/// Every field is optional so that a missing value can be reported instead of
/// failing deserialization of the whole request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl LocationCandidate {
    pub fn new(name: &str, country: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            country: Some(country.to_string()),
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<NewLocation, ValidationError> {
        let mut err = ValidationError::default();

        let name = required_text(&mut err, "name", self.name.as_deref());
        let country = required_text(&mut err, "country", self.country.as_deref());
        let lat = required_coordinate(&mut err, "lat", self.lat, 90.0);
        let lon = required_coordinate(&mut err, "lon", self.lon, 180.0);

        match (name, country, lat, lon) {
            (Some(name), Some(country), Some(lat), Some(lon)) if err.is_empty() => Ok(NewLocation {
                name,
                country,
                lat,
                lon,
            }),
            _ => Err(err),
        }
    }
}

fn required_text(err: &mut ValidationError, field: &'static str, value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v.to_string()),
        _ => {
            err.push(field, format!("{field} is required"));
            None
        }
    }
}

fn required_coordinate(
    err: &mut ValidationError,
    field: &'static str,
    value: Option<f64>,
    bound: f64,
) -> Option<f64> {
    match value {
        None => {
            err.push(field, format!("{field} is required"));
            None
        }
        Some(v) if !v.is_finite() || v.abs() > bound => {
            err.push(field, format!("{field} must be between -{bound} and {bound}"));
            None
        }
        Some(v) => Some(v),
    }
}

/// A validated favorite that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl NewLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }

    pub fn into_location(self, added_at: DateTime<Utc>) -> Location {
        Location {
            id: LocationId::new(),
            name: self.name,
            country: self.country,
            lat: self.lat,
            lon: self.lon,
            added_at,
        }
    }
}

/// One geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// The place a weather report refers to, as named by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// One 3-hour interval of the provider's 5-day forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastSample {
    pub timestamp: i64,
    pub temperature_c: f64,
    pub description: String,
    pub icon: String,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub wind_speed_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawForecast {
    pub place: PlaceSummary,
    pub samples: Vec<RawForecastSample>,
}

/// Current conditions as reported by the provider, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCurrentReading {
    pub place: PlaceSummary,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    pub visibility_m: Option<f64>,
    pub description: String,
    pub icon: String,
    pub wind_speed_ms: Option<f64>,
    pub wind_direction_deg: Option<f64>,
}

/// Summary of one calendar day (UTC) of forecast samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecastSummary {
    pub date: NaiveDate,
    pub temp_min: i64,
    pub temp_max: i64,
    pub description: String,
    pub icon: String,
    pub humidity: i64,
    pub pressure: i64,
    pub wind_speed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: i64,
    pub feels_like: i64,
    pub humidity: i64,
    pub pressure: i64,
    /// Kilometers; `None` when the provider did not report visibility.
    pub visibility: Option<i64>,
    /// Always `None`: the UV endpoint is not queried.
    pub uv_index: Option<i64>,
    pub description: String,
    pub icon: String,
    /// Kilometers per hour.
    pub wind_speed: i64,
    pub wind_direction: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReport {
    pub location: PlaceSummary,
    pub current: CurrentConditions,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub location: PlaceSummary,
    pub forecast: Vec<DailyForecastSummary>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_location_uses_exact_coordinates() {
        let a = Coordinates { lat: 48.85, lon: 2.35 };
        let b = Coordinates { lat: 48.85, lon: 2.35 };
        let c = Coordinates {
            lat: 48.850_000_1,
            lon: 2.35,
        };

        assert!(same_location(a, b));
        assert!(!same_location(a, c));
    }

    #[test]
    fn missing_lon_is_a_validation_error() {
        let candidate = LocationCandidate {
            name: Some("X".into()),
            country: Some("Y".into()),
            lat: Some(1.0),
            lon: None,
        };

        let err = candidate.validate().unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["lon"]);
    }

    #[test]
    fn validation_reports_every_field() {
        let err = LocationCandidate::default().validate().unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["name", "country", "lat", "lon"]
        );
    }

    #[test]
    fn blank_name_and_out_of_range_latitude_are_rejected() {
        let candidate = LocationCandidate::new("  ", "FR", 91.0, 2.35);

        let err = candidate.validate().unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["name", "lat"]);
    }

    #[test]
    fn valid_candidate_keeps_values_as_given() {
        let new = LocationCandidate::new("Paris", "FR", 48.8566, 2.3522)
            .validate()
            .expect("candidate should be valid");

        assert_eq!(new.name, "Paris");
        assert_eq!(new.coordinates(), Coordinates { lat: 48.8566, lon: 2.3522 });
    }

    #[test]
    fn string_coordinate_is_not_coerced() {
        let parsed: Result<LocationCandidate, _> =
            serde_json::from_str(r#"{"name":"X","country":"Y","lat":"1","lon":2}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn location_serializes_with_camel_case_keys() {
        let location = LocationCandidate::new("Paris", "FR", 48.85, 2.35)
            .validate()
            .unwrap()
            .into_location(Utc::now());

        let json = serde_json::to_value(&location).unwrap();
        assert!(json.get("addedAt").is_some());
        assert_eq!(json["id"], serde_json::Value::String(location.id.to_string()));
    }
}
