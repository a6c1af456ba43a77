use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidObservation;

pub const SUNSHINE_MAX_MIN_PER_H: f64 = 60.0;
pub const CLOUD_COVER_MAX_OKTAS: f64 = 8.0;

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Hamburg coastal waters, used when neither config nor environment sets a location.
    pub const HAMBURG: GeoPoint = GeoPoint { latitude: 53.55, longitude: 9.99 };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), InvalidObservation> {
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}°N, {:.3}°E", self.latitude, self.longitude)
    }
}

/// One hourly reading for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub precipitation_mm_per_h: f64,
    pub wind_speed_m_s: f64,
    pub temperature_c: f64,
    pub sunshine_min_per_h: f64,
    pub cloud_cover_oktas: f64,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherObservation {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Checks every numeric field against its physical range. Nothing is clamped.
    pub fn validate(&self) -> Result<(), InvalidObservation> {
        check_at_least("precipitation_mm_per_h", self.precipitation_mm_per_h, 0.0)?;
        check_at_least("wind_speed_m_s", self.wind_speed_m_s, 0.0)?;
        check_finite("temperature_c", self.temperature_c)?;
        check_range("sunshine_min_per_h", self.sunshine_min_per_h, 0.0, SUNSHINE_MAX_MIN_PER_H)?;
        check_range("cloud_cover_oktas", self.cloud_cover_oktas, 0.0, CLOUD_COVER_MAX_OKTAS)?;
        self.location().validate()
    }
}

/// A reading as it arrives from a provider or the command line, before any
/// field is known to be present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReading {
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    pub precipitation_mm_per_h: Option<f64>,
    pub wind_speed_m_s: Option<f64>,
    pub temperature_c: Option<f64>,
    pub sunshine_min_per_h: Option<f64>,
    pub cloud_cover_oktas: Option<f64>,
}

impl RawReading {
    /// Strict conversion: every weather field must be present and in range.
    /// A missing timestamp means "now".
    pub fn into_observation(self) -> Result<WeatherObservation, InvalidObservation> {
        let observation = WeatherObservation {
            precipitation_mm_per_h: require("precipitation_mm_per_h", self.precipitation_mm_per_h)?,
            wind_speed_m_s: require("wind_speed_m_s", self.wind_speed_m_s)?,
            temperature_c: require("temperature_c", self.temperature_c)?,
            sunshine_min_per_h: require("sunshine_min_per_h", self.sunshine_min_per_h)?,
            cloud_cover_oktas: require("cloud_cover_oktas", self.cloud_cover_oktas)?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            latitude: self.latitude,
            longitude: self.longitude,
        };

        observation.validate()?;
        Ok(observation)
    }
}

/// The five weather factors that make up the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Precipitation,
    Wind,
    Temperature,
    Sunshine,
    CloudCover,
}

impl Factor {
    pub const fn all() -> &'static [Factor] {
        &[
            Factor::Precipitation,
            Factor::Wind,
            Factor::Temperature,
            Factor::Sunshine,
            Factor::CloudCover,
        ]
    }

    /// Fixed contribution of the factor to the index. The weights sum to 1.
    pub const fn weight(&self) -> f64 {
        match self {
            Factor::Precipitation => 0.35,
            Factor::Wind => 0.30,
            Factor::Temperature => 0.15,
            Factor::Sunshine => 0.10,
            Factor::CloudCover => 0.10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Precipitation => "precipitation",
            Factor::Wind => "wind",
            Factor::Temperature => "temperature",
            Factor::Sunshine => "sunshine",
            Factor::CloudCover => "cloud_cover",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Good,
    Moderate,
    Poor,
}

impl Category {
    pub const GOOD_THRESHOLD: f64 = 70.0;
    pub const MODERATE_THRESHOLD: f64 = 40.0;

    /// `>= 70` is Good, `[40, 70)` is Moderate, anything lower is Poor.
    pub fn from_value(value: f64) -> Self {
        if value >= Self::GOOD_THRESHOLD {
            Category::Good
        } else if value >= Self::MODERATE_THRESHOLD {
            Category::Moderate
        } else {
            Category::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::Poor => "Poor",
        }
    }

    /// Hex color used when charting the category.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Good => "#44FF44",
            Category::Moderate => "#FFA500",
            Category::Poor => "#FF4444",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized [0, 100] sub-score per factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub precipitation: f64,
    pub wind: f64,
    pub temperature: f64,
    pub sunshine: f64,
    pub cloud_cover: f64,
}

impl ComponentScores {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Precipitation => self.precipitation,
            Factor::Wind => self.wind,
            Factor::Temperature => self.temperature,
            Factor::Sunshine => self.sunshine,
            Factor::CloudCover => self.cloud_cover,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::all().iter().map(move |factor| (*factor, self.get(*factor)))
    }

    pub fn weighted_sum(&self) -> f64 {
        self.iter().map(|(factor, score)| factor.weight() * score).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityScore {
    pub value: f64,
    pub category: Category,
    pub component_scores: ComponentScores,
}

/// Length of an hourly window ending at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    Day,
    #[default]
    ThreeDays,
    Week,
}

impl TimeRange {
    pub const fn hours(&self) -> u32 {
        match self {
            TimeRange::Day => 24,
            TimeRange::ThreeDays => 72,
            TimeRange::Week => 168,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.hours()))
    }

    pub const fn all() -> &'static [TimeRange] {
        &[TimeRange::Day, TimeRange::ThreeDays, TimeRange::Week]
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours())
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix(['h', 'H']).unwrap_or(trimmed);

        match digits {
            "24" => Ok(TimeRange::Day),
            "72" => Ok(TimeRange::ThreeDays),
            "168" => Ok(TimeRange::Week),
            _ => Err(anyhow::anyhow!(
                "Unsupported time range '{s}'. Supported ranges: 24, 72, 168 hours."
            )),
        }
    }
}

/// Observations a provider produced for one window, after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSeries {
    pub provider: String,
    pub station: Option<crate::station::Station>,
    pub observations: Vec<WeatherObservation>,
    /// Readings dropped at the ingestion boundary.
    pub rejected: usize,
}

fn require(field: &'static str, value: Option<f64>) -> Result<f64, InvalidObservation> {
    value.ok_or_else(|| InvalidObservation::missing(field))
}

fn check_finite(field: &'static str, value: f64) -> Result<(), InvalidObservation> {
    if value.is_finite() { Ok(()) } else { Err(InvalidObservation::non_finite(field, value)) }
}

fn check_at_least(field: &'static str, value: f64, min: f64) -> Result<(), InvalidObservation> {
    check_finite(field, value)?;
    if value < min {
        return Err(InvalidObservation::out_of_range(field, value, min, f64::INFINITY));
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), InvalidObservation> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(InvalidObservation::out_of_range(field, value, min, max));
    }
    Ok(())
}
