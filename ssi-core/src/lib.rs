//! Core library for the `ssi` CLI.
//!
//! This crate defines:
//! - The Survey Suitability Index scorer and series summaries
//! - Shared domain models (observations, scores, stations)
//! - The ingestion boundary that clamps provider readings
//! - Abstraction over weather providers, with an on-disk cache
//! - Configuration handling
//!
//! It is used by `ssi-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod scorer;
pub mod series;
pub mod station;

pub use cache::{CachedProvider, SeriesCache};
pub use config::{Config, ProviderConfig};
pub use error::{CurveError, InvalidObservation, InvalidReason, SeriesError};
pub use model::{
    Category, ComponentScores, Factor, GeoPoint, RawReading, SuitabilityScore, TimeRange,
    WeatherObservation, WeatherSeries,
};
pub use provider::{ProviderId, SeriesRequest, WeatherProvider};
pub use scorer::{Scorer, ScoringCurves};
pub use series::{GoodWindow, ScoredHour, SeriesSummary, summarize};
pub use station::{NearestStation, Station};
