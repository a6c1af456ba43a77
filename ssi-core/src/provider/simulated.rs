//! Synthetic hourly weather for demos and offline use.
//!
//! The series follows a seasonal and a daily temperature cycle, intermittent
//! rain, a slowly varying wind, sunshine only during daylight and drifting
//! cloud cover. Values may leave their physical range before ingestion
//! clamps them, the same as a noisy real feed.

use std::f64::consts::PI;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    ingest,
    model::{RawReading, WeatherSeries},
    provider::{ProviderId, SeriesRequest},
    station::{Station, default_stations, nearest_station},
};

use super::WeatherProvider;

const RAIN_PROBABILITY: f64 = 0.2;
const MEAN_RAIN_MM_H: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    seed: Option<u64>,
    stations: Vec<Station>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self { seed: None, stations: default_stations() }
    }
}

impl SimulatedProvider {
    /// A provider that produces the same series for the same request.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn generate(&self, request: &SeriesRequest) -> Result<Vec<RawReading>> {
        let last_hour = request
            .end
            .duration_trunc(Duration::hours(1))
            .context("Failed to align series end to the hour")?;
        let n = request.range.hours() as usize;
        let mut rng = self.rng();

        let readings = (0..n)
            .map(|i| {
                let timestamp = last_hour - Duration::hours((n - 1 - i) as i64);
                let progress = i as f64 / n as f64;
                reading_at(&mut rng, request, timestamp, progress)
            })
            .collect();

        Ok(readings)
    }
}

fn reading_at(rng: &mut StdRng, request: &SeriesRequest, timestamp: DateTime<Utc>, progress: f64) -> RawReading {
    let hour = f64::from(timestamp.hour());

    let temperature = 12.0
        + 8.0 * (2.0 * PI * progress).sin()
        + 5.0 * (2.0 * PI * (hour - 6.0) / 24.0).sin()
        + rng.gen_range(-1.5..1.5);

    let precipitation = if rng.gen_bool(RAIN_PROBABILITY) {
        // exponential with the given mean
        -MEAN_RAIN_MM_H * (1.0 - rng.gen_range(0.0f64..1.0)).ln()
    } else {
        0.0
    };

    let wind = 8.0 + 4.0 * (2.0 * PI * progress * 2.0).sin() + rng.gen_range(-3.0..3.0);

    let sunshine = if (6.0..=20.0).contains(&hour) {
        60.0 * (1.0 - rng.gen_range(0.0..0.6))
    } else {
        0.0
    };

    let cloud = 4.0 + 3.0 * (2.0 * PI * progress * 1.5).sin() + rng.gen_range(-1.5..1.5);

    RawReading {
        timestamp: Some(timestamp),
        latitude: request.location.latitude,
        longitude: request.location.longitude,
        precipitation_mm_per_h: Some(precipitation),
        wind_speed_m_s: Some(wind),
        temperature_c: Some(temperature),
        sunshine_min_per_h: Some(sunshine),
        cloud_cover_oktas: Some(cloud),
    }
}

#[async_trait]
impl WeatherProvider for SimulatedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Simulated
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<WeatherSeries> {
        let readings = self.generate(request)?;
        let (observations, rejected) = ingest::ingest_all(&readings, request.end);

        let station = nearest_station(&self.stations, request.location).map(|n| n.station);
        tracing::debug!(hours = observations.len(), station = ?station.as_ref().map(|s| &s.name), "simulated series");

        Ok(WeatherSeries {
            provider: ProviderId::Simulated.to_string(),
            station,
            observations,
            rejected,
        })
    }
}
