//! Normalization of raw provider readings into the units served to clients.
//!
//! The provider's 5-day forecast arrives as a flat list of 3-hour samples; it is
//! folded into at most [`MAX_FORECAST_DAYS`] daily summaries keyed by UTC date.

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    CurrentConditions, CurrentReport, DailyForecastSummary, ForecastReport, RawCurrentReading,
    RawForecast, RawForecastSample,
};

/// The provider may append a partial sixth day; it is dropped.
pub const MAX_FORECAST_DAYS: usize = 5;

const MS_TO_KMH: f64 = 3.6;

/// Rounds to the nearest integer, halves toward positive infinity (`-2.5` becomes `-2`).
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor as i64 + 1 } else { floor as i64 }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn utc_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Groups samples by UTC calendar day in order of first appearance.
fn bucket_by_day(samples: &[RawForecastSample]) -> Vec<(NaiveDate, Vec<&RawForecastSample>)> {
    let mut buckets: Vec<(NaiveDate, Vec<&RawForecastSample>)> = Vec::new();

    for sample in samples {
        let Some(date) = utc_date(sample.timestamp) else {
            log::warn!("skipping forecast sample with out-of-range timestamp {}", sample.timestamp);
            continue;
        };

        match buckets.iter_mut().find(|(d, _)| *d == date) {
            Some((_, bucket)) => bucket.push(sample),
            None => buckets.push((date, vec![sample])),
        }
    }

    buckets
}

fn summarize_day(date: NaiveDate, bucket: &[&RawForecastSample]) -> DailyForecastSummary {
    let temp_min = bucket
        .iter()
        .map(|s| s.temperature_c)
        .fold(f64::INFINITY, f64::min);
    let temp_max = bucket
        .iter()
        .map(|s| s.temperature_c)
        .fold(f64::NEG_INFINITY, f64::max);

    // middle sample, the later one when the count is even
    let representative = bucket[bucket.len() / 2];

    DailyForecastSummary {
        date,
        temp_min: round_half_up(temp_min),
        temp_max: round_half_up(temp_max),
        description: representative.description.clone(),
        icon: representative.icon.clone(),
        humidity: round_half_up(mean(bucket.iter().map(|s| s.humidity_pct))),
        pressure: round_half_up(mean(bucket.iter().map(|s| s.pressure_hpa))),
        wind_speed: round_half_up(mean(
            bucket.iter().map(|s| s.wind_speed_ms.unwrap_or(0.0) * MS_TO_KMH),
        )),
    }
}

/// Folds a chronological list of forecast samples into daily summaries.
///
/// An empty input yields an empty output.
pub fn aggregate(samples: &[RawForecastSample]) -> Vec<DailyForecastSummary> {
    bucket_by_day(samples)
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|(date, bucket)| summarize_day(date, &bucket))
        .collect()
}

pub fn normalize_forecast(raw: RawForecast, now: DateTime<Utc>) -> ForecastReport {
    ForecastReport {
        forecast: aggregate(&raw.samples),
        location: raw.place,
        timestamp: now,
    }
}

/// Converts one current reading to integer Celsius, km/h and km.
///
/// `now` becomes the report timestamp; the provider's observation time is not used.
pub fn normalize_current(raw: RawCurrentReading, now: DateTime<Utc>) -> CurrentReport {
    let current = CurrentConditions {
        temperature: round_half_up(raw.temperature_c),
        feels_like: round_half_up(raw.feels_like_c),
        humidity: round_half_up(raw.humidity_pct),
        pressure: round_half_up(raw.pressure_hpa),
        // a reported 0 m means the reading is unavailable
        visibility: raw
            .visibility_m
            .filter(|m| *m != 0.0)
            .map(|m| round_half_up(m / 1000.0)),
        uv_index: None,
        description: raw.description,
        icon: raw.icon,
        wind_speed: raw
            .wind_speed_ms
            .map(|ms| round_half_up(ms * MS_TO_KMH))
            .unwrap_or(0),
        wind_direction: raw.wind_direction_deg.map(round_half_up).unwrap_or(0),
    };

    CurrentReport {
        location: raw.place,
        current,
        timestamp: now,
    }
}
