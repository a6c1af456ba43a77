use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use ssi_core::{
    CachedProvider, Config, GeoPoint, ProviderId, RawReading, SeriesCache, SeriesRequest,
    SuitabilityScore, TimeRange, WeatherProvider,
    provider::{brightsky::DEFAULT_BASE_URL, provider_from_config},
    station::{default_stations, nearest_station},
    summarize,
};
use tracing::{debug, info, warn};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "ssi", version, about = "Survey Suitability Index for field survey planning")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Area of interest; falls back to the configured default location.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> Result<GeoPoint> {
        let fallback = config.location();
        let point = GeoPoint::new(
            self.lat.unwrap_or(fallback.latitude),
            self.lon.unwrap_or(fallback.longitude),
        );
        point.validate().context("Invalid location")?;
        Ok(point)
    }
}

/// One hour of weather as given on the command line. Negative values are
/// accepted here so the scorer can reject them with a field-level error.
#[derive(Debug, Args)]
pub struct ReadingArgs {
    /// Precipitation in mm/h.
    #[arg(long, allow_negative_numbers = true)]
    pub precipitation: Option<f64>,

    /// Wind speed in m/s.
    #[arg(long, allow_negative_numbers = true)]
    pub wind: Option<f64>,

    /// Air temperature in °C.
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: Option<f64>,

    /// Sunshine in minutes per hour (0-60).
    #[arg(long, allow_negative_numbers = true)]
    pub sunshine: Option<f64>,

    /// Cloud cover in oktas (0-8).
    #[arg(long, allow_negative_numbers = true)]
    pub cloud: Option<f64>,
}

impl ReadingArgs {
    fn score(&self, point: GeoPoint, config: &Config) -> Result<SuitabilityScore> {
        let raw = RawReading {
            timestamp: None,
            latitude: point.latitude,
            longitude: point.longitude,
            precipitation_mm_per_h: self.precipitation,
            wind_speed_m_s: self.wind,
            temperature_c: self.temperature,
            sunshine_min_per_h: self.sunshine,
            cloud_cover_oktas: self.cloud,
        };
        let observation = raw.into_observation()?;
        Ok(config.scorer()?.score(&observation)?)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set default provider, location and cache directory.
    Configure,

    /// Score a single hourly observation.
    Score {
        #[command(flatten)]
        reading: ReadingArgs,

        #[command(flatten)]
        location: LocationArgs,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Fetch an hourly series and score every hour.
    Series {
        #[command(flatten)]
        location: LocationArgs,

        /// Window length in hours: 24, 72 or 168.
        #[arg(long, default_value = "72")]
        hours: TimeRange,

        /// Provider short name, e.g. "brightsky" or "simulated".
        #[arg(long)]
        provider: Option<String>,

        /// End of the window (RFC 3339); defaults to now.
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Always fetch, bypassing the series cache.
        #[arg(long)]
        no_cache: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the nearest DWD station.
    Station {
        #[command(flatten)]
        location: LocationArgs,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Remove all cached series.
    ClearCache,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Score { reading, location, json } => {
                let config = load_config()?;
                let point = location.resolve(&config)?;
                let score = reading.score(point, &config)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&score)?);
                } else {
                    println!("{}", output::score_table(&score));
                    println!("{}", output::score_headline(&score));
                }
            }
            Command::Series { location, hours, provider, end, no_cache, json } => {
                let config = load_config()?;
                let point = location.resolve(&config)?;
                let id = match provider.as_deref() {
                    Some(name) => ProviderId::try_from(name)?,
                    None => config.default_provider_id()?,
                };
                info!(provider = %id, location = %point, range = %hours, "fetching series");

                let mut provider: Box<dyn WeatherProvider> = provider_from_config(id, &config)?;
                if no_cache {
                    info!("series cache bypassed");
                } else {
                    let cache = SeriesCache::with_default_ttl(config.cache_dir()?);
                    provider = Box::new(CachedProvider::new(provider, cache));
                }

                let request = SeriesRequest::new(point, hours, end.unwrap_or_else(Utc::now));
                let series = provider
                    .fetch_series(&request)
                    .await
                    .with_context(|| format!("Failed to fetch weather from provider '{id}'"))?;

                let scored = config.scorer()?.score_series(&series.observations)?;
                let summary = summarize(&scored);

                if json {
                    let report = output::SeriesReport::new(&request, &series, &scored, summary.as_ref());
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{}", output::series_header(&request, &series));
                    if scored.is_empty() {
                        println!("No usable hours in the requested window.");
                    } else {
                        println!("{}", output::series_table(&scored));
                    }
                    if let Some(summary) = &summary {
                        println!("{}", output::summary_text(summary));
                    }
                }
            }
            Command::Station { location, json } => {
                let config = load_config()?;
                let point = location.resolve(&config)?;
                let nearest = nearest_station(&default_stations(), point)
                    .ok_or_else(|| anyhow!("No stations available"))?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&nearest)?);
                } else {
                    println!("{}", output::station_text(&nearest));
                }
            }
            Command::ClearCache => {
                let config = load_config()?;
                let cache = SeriesCache::with_default_ttl(config.cache_dir()?);
                let removed = cache.clear()?;
                debug!(removed, dir = %cache.dir().display(), "cache cleared");
                println!("Removed {removed} cached series from {}", cache.dir().display());
            }
        }

        Ok(())
    }
}

/// Config file plus `DEFAULT_LAT`, `DEFAULT_LON` and `CACHE_DIR` overrides.
fn load_config() -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_env()?;
    Ok(config)
}

/// Edits the file as stored on disk; environment overrides are not persisted.
fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let options: Vec<ProviderOption> = ProviderId::all().iter().copied().map(ProviderOption).collect();
    let ProviderOption(provider) = Select::new("Default weather provider:", options)
        .with_starting_cursor(provider_cursor(&config))
        .prompt()?;
    config.set_default_provider(provider);

    if provider == ProviderId::BrightSky {
        let current_url = config.provider_base_url(provider).unwrap_or(DEFAULT_BASE_URL).to_string();
        let url = Text::new("Bright Sky base URL:").with_default(&current_url).prompt()?;
        let url = url.trim();
        let base_url = (!url.is_empty() && url != DEFAULT_BASE_URL).then(|| url.to_string());
        config.set_provider_base_url(provider, base_url);
    }

    let location = config.location();
    let latitude = CustomType::<f64>::new("Default latitude:")
        .with_default(location.latitude)
        .with_error_message("Please enter a number, e.g. 53.55")
        .prompt()?;
    let longitude = CustomType::<f64>::new("Default longitude:")
        .with_default(location.longitude)
        .with_error_message("Please enter a number, e.g. 9.99")
        .prompt()?;
    let point = GeoPoint::new(latitude, longitude);
    point.validate().context("Invalid default location")?;
    config.default_location = Some(point);

    let cache_dir = config.cache_dir()?;
    let cache_dir = Text::new("Cache directory:")
        .with_default(&cache_dir.display().to_string())
        .prompt()?;
    if !cache_dir.trim().is_empty() {
        config.cache_dir = Some(cache_dir.trim().into());
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

/// Position of the configured provider in the picker. An unknown name in the
/// file starts on the default so `configure` can replace it.
fn provider_cursor(config: &Config) -> usize {
    let current = match config.default_provider_id() {
        Ok(id) => id,
        Err(e) => {
            warn!("{e:#}");
            ProviderId::default()
        }
    };
    ProviderId::all().iter().position(|id| *id == current).unwrap_or(0)
}

struct ProviderOption(ProviderId);

impl std::fmt::Display for ProviderOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.0.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_core::{InvalidObservation, InvalidReason};

    #[test]
    fn parses_series_arguments() {
        let cli = Cli::try_parse_from([
            "ssi", "-vv", "series", "--lat", "53.9", "--lon", "-8.7", "--hours", "168h", "--provider",
            "brightsky", "--end", "2024-06-01T12:00:00Z", "--no-cache",
        ])
        .expect("valid arguments");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Series { location, hours, provider, end, no_cache, json } => {
                assert_eq!(location.lat, Some(53.9));
                assert_eq!(location.lon, Some(-8.7));
                assert_eq!(hours, TimeRange::Week);
                assert_eq!(provider.as_deref(), Some("brightsky"));
                assert_eq!(end.map(|e| e.timestamp()), Some(1_717_243_200));
                assert!(no_cache);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn series_defaults_to_three_days() {
        let cli = Cli::try_parse_from(["ssi", "series"]).unwrap();
        assert!(matches!(cli.command, Command::Series { hours: TimeRange::ThreeDays, .. }));
    }

    #[test]
    fn rejects_unsupported_hours() {
        assert!(Cli::try_parse_from(["ssi", "series", "--hours", "48"]).is_err());
    }

    #[test]
    fn score_accepts_negative_temperature() {
        let cli = Cli::try_parse_from([
            "ssi", "score", "--precipitation", "0", "--wind", "3", "--temperature", "-4.5",
            "--sunshine", "20", "--cloud", "6", "--json",
        ])
        .unwrap();

        match cli.command {
            Command::Score { reading, json, .. } => {
                assert_eq!(reading.temperature, Some(-4.5));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_readings_reach_the_scorer() {
        let cli = Cli::try_parse_from([
            "ssi", "score", "--precipitation", "-1", "--wind", "-2", "--temperature", "12",
            "--sunshine", "-5", "--cloud", "-1",
        ])
        .expect("negative values parse");

        let Command::Score { reading, .. } = cli.command else {
            panic!("expected score command");
        };
        assert_eq!(reading.precipitation, Some(-1.0));
        assert_eq!(reading.cloud, Some(-1.0));

        let err = reading.score(GeoPoint::HAMBURG, &Config::default()).unwrap_err();
        let invalid = err.downcast_ref::<InvalidObservation>().expect("typed observation error");
        assert_eq!(invalid.field, "precipitation_mm_per_h");
        assert!(matches!(invalid.reason, InvalidReason::OutOfRange { value, .. } if value == -1.0));
    }

    #[test]
    fn missing_reading_is_reported_by_field() {
        let cli = Cli::try_parse_from(["ssi", "score", "--precipitation", "0"]).unwrap();
        let Command::Score { reading, .. } = cli.command else {
            panic!("expected score command");
        };

        let err = reading.score(GeoPoint::HAMBURG, &Config::default()).unwrap_err();
        let invalid = err.downcast_ref::<InvalidObservation>().expect("typed observation error");
        assert_eq!(invalid, &InvalidObservation::missing("wind_speed_m_s"));
    }

    #[test]
    fn provider_cursor_survives_unknown_provider() {
        let config = Config { default_provider: Some("openweather".into()), ..Config::default() };
        assert!(config.default_provider_id().is_err());

        let simulated = ProviderId::all().iter().position(|id| *id == ProviderId::Simulated).unwrap();
        assert_eq!(provider_cursor(&config), simulated);
    }

    #[test]
    fn provider_cursor_follows_configured_provider() {
        let mut config = Config::default();
        config.set_default_provider(ProviderId::BrightSky);

        let brightsky = ProviderId::all().iter().position(|id| *id == ProviderId::BrightSky).unwrap();
        assert_eq!(provider_cursor(&config), brightsky);
    }

    #[test]
    fn location_falls_back_to_config() {
        let config = Config { default_location: Some(GeoPoint::new(54.0, 10.0)), ..Config::default() };
        let args = LocationArgs { lat: Some(53.0), lon: None };

        assert_eq!(args.resolve(&config).unwrap(), GeoPoint::new(53.0, 10.0));
    }

    #[test]
    fn location_rejects_out_of_range_latitude() {
        let args = LocationArgs { lat: Some(95.0), lon: None };
        assert!(args.resolve(&Config::default()).is_err());
    }
}
