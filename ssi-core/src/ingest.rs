//! Ingestion boundary between providers and the scorer.
//!
//! Provider readings are clamped into physical ranges here so that the
//! scorer only ever sees in-range observations. Readings that cannot be
//! repaired (missing or non-finite values, bad coordinates) are dropped.

use chrono::{DateTime, Utc};

use crate::{
    error::InvalidObservation,
    model::{CLOUD_COVER_MAX_OKTAS, RawReading, SUNSHINE_MAX_MIN_PER_H, WeatherObservation},
};

pub fn percent_to_oktas(percent: f64) -> f64 {
    percent / 100.0 * CLOUD_COVER_MAX_OKTAS
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Clamps a provider reading into an observation the scorer accepts.
pub fn clamp_reading(
    raw: &RawReading,
    fallback_time: DateTime<Utc>,
) -> Result<WeatherObservation, InvalidObservation> {
    let observation = WeatherObservation {
        precipitation_mm_per_h: finite("precipitation_mm_per_h", raw.precipitation_mm_per_h)?.max(0.0),
        wind_speed_m_s: finite("wind_speed_m_s", raw.wind_speed_m_s)?.max(0.0),
        temperature_c: finite("temperature_c", raw.temperature_c)?,
        sunshine_min_per_h: finite("sunshine_min_per_h", raw.sunshine_min_per_h)?
            .clamp(0.0, SUNSHINE_MAX_MIN_PER_H),
        cloud_cover_oktas: finite("cloud_cover_oktas", raw.cloud_cover_oktas)?
            .clamp(0.0, CLOUD_COVER_MAX_OKTAS),
        timestamp: raw.timestamp.unwrap_or(fallback_time),
        latitude: raw.latitude,
        longitude: raw.longitude,
    };

    observation.location().validate()?;
    Ok(observation)
}

/// Clamps every reading, keeping the ones that survive and counting the rest.
pub fn ingest_all(readings: &[RawReading], fallback_time: DateTime<Utc>) -> (Vec<WeatherObservation>, usize) {
    let mut accepted = Vec::with_capacity(readings.len());
    let mut rejected = 0;

    for raw in readings {
        match clamp_reading(raw, fallback_time) {
            Ok(observation) => accepted.push(observation),
            Err(err) => {
                tracing::debug!(timestamp = ?raw.timestamp, "dropping reading: {err}");
                rejected += 1;
            }
        }
    }

    (accepted, rejected)
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, InvalidObservation> {
    match value {
        None => Err(InvalidObservation::missing(field)),
        Some(v) if !v.is_finite() => Err(InvalidObservation::non_finite(field, v)),
        Some(v) => Ok(v),
    }
}
