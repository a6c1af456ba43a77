//! The Survey Suitability Index.
//!
//! Each factor is mapped onto a [0, 100] sub-score by linear interpolation
//! between its optimal band and the point where it stops being workable.
//! The index is the weighted sum of the sub-scores (see [`crate::model::Factor::weight`]).

use serde::{Deserialize, Serialize};

use crate::{
    error::{CurveError, InvalidObservation, SeriesError},
    model::{
        Category, ComponentScores, SUNSHINE_MAX_MIN_PER_H, CLOUD_COVER_MAX_OKTAS,
        SuitabilityScore, WeatherObservation,
    },
    series::ScoredHour,
};

const WIND_OPTIMUM_MAX_M_S: f64 = 5.0;
const TEMPERATURE_OPTIMUM_C: (f64, f64) = (15.0, 25.0);
const CLOUD_OPTIMUM_MAX_OKTAS: f64 = 2.0;

/// Tunable falloff points of the sub-score curves.
///
/// Example TOML:
/// [scoring]
/// precipitation_saturation_mm_h = 10.0
/// wind_zero_at_m_s = 20.0
/// temperature_falloff_c = 10.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringCurves {
    /// Precipitation at and above which the precipitation sub-score is 0.
    pub precipitation_saturation_mm_h: f64,
    /// Wind speed at and above which the wind sub-score is 0.
    pub wind_zero_at_m_s: f64,
    /// Distance outside the 15..25 °C band at which the temperature sub-score reaches 0.
    pub temperature_falloff_c: f64,
}

impl Default for ScoringCurves {
    fn default() -> Self {
        Self {
            precipitation_saturation_mm_h: 10.0,
            wind_zero_at_m_s: 20.0,
            temperature_falloff_c: 10.0,
        }
    }
}

impl ScoringCurves {
    pub fn validate(&self) -> Result<(), CurveError> {
        check_curve("precipitation_saturation_mm_h", self.precipitation_saturation_mm_h, 0.0)?;
        check_curve("wind_zero_at_m_s", self.wind_zero_at_m_s, WIND_OPTIMUM_MAX_M_S)?;
        check_curve("temperature_falloff_c", self.temperature_falloff_c, 0.0)
    }
}

fn check_curve(name: &'static str, value: f64, min: f64) -> Result<(), CurveError> {
    if !value.is_finite() {
        return Err(CurveError::NonFinite { name, value });
    }
    if value <= min {
        return Err(CurveError::TooSmall { name, value, min });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scorer {
    curves: ScoringCurves,
}

impl Scorer {
    pub fn new(curves: ScoringCurves) -> Result<Self, CurveError> {
        curves.validate()?;
        Ok(Self { curves })
    }

    pub fn curves(&self) -> &ScoringCurves {
        &self.curves
    }

    /// Scores one observation. Out-of-range input is rejected, never clamped.
    pub fn score(&self, observation: &WeatherObservation) -> Result<SuitabilityScore, InvalidObservation> {
        observation.validate()?;

        let component_scores = self.component_scores(observation);
        let value = component_scores.weighted_sum().clamp(0.0, 100.0);

        Ok(SuitabilityScore {
            value,
            category: Category::from_value(value),
            component_scores,
        })
    }

    /// Scores every hour in order; the first invalid hour aborts the batch.
    pub fn score_series(&self, observations: &[WeatherObservation]) -> Result<Vec<ScoredHour>, SeriesError> {
        observations
            .iter()
            .enumerate()
            .map(|(index, observation)| {
                self.score(observation)
                    .map(|score| ScoredHour {
                        timestamp: observation.timestamp,
                        observation: observation.clone(),
                        score,
                    })
                    .map_err(|source| SeriesError::InvalidHour { index, source })
            })
            .collect()
    }

    fn component_scores(&self, obs: &WeatherObservation) -> ComponentScores {
        ComponentScores {
            precipitation: self.precipitation_score(obs.precipitation_mm_per_h),
            wind: self.wind_score(obs.wind_speed_m_s),
            temperature: self.temperature_score(obs.temperature_c),
            sunshine: sunshine_score(obs.sunshine_min_per_h),
            cloud_cover: cloud_cover_score(obs.cloud_cover_oktas),
        }
    }

    pub fn precipitation_score(&self, mm_per_h: f64) -> f64 {
        falling_edge(mm_per_h, 0.0, self.curves.precipitation_saturation_mm_h)
    }

    pub fn wind_score(&self, m_s: f64) -> f64 {
        falling_edge(m_s, WIND_OPTIMUM_MAX_M_S, self.curves.wind_zero_at_m_s)
    }

    pub fn temperature_score(&self, celsius: f64) -> f64 {
        let (low, high) = TEMPERATURE_OPTIMUM_C;
        let distance = if celsius < low {
            low - celsius
        } else if celsius > high {
            celsius - high
        } else {
            0.0
        };

        falling_edge(distance, 0.0, self.curves.temperature_falloff_c)
    }
}

pub fn sunshine_score(min_per_h: f64) -> f64 {
    (min_per_h / SUNSHINE_MAX_MIN_PER_H * 100.0).clamp(0.0, 100.0)
}

pub fn cloud_cover_score(oktas: f64) -> f64 {
    falling_edge(oktas, CLOUD_OPTIMUM_MAX_OKTAS, CLOUD_COVER_MAX_OKTAS)
}

/// 100 up to `full_until`, 0 from `zero_at`, linear in between.
fn falling_edge(value: f64, full_until: f64, zero_at: f64) -> f64 {
    if value <= full_until {
        100.0
    } else if value >= zero_at {
        0.0
    } else {
        100.0 * (zero_at - value) / (zero_at - full_until)
    }
}
