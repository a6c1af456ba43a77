use crate::{
    Config, GeoPoint, TimeRange, WeatherSeries,
    provider::{brightsky::BrightSkyProvider, simulated::SimulatedProvider},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{convert::TryFrom, fmt::Debug};

pub mod brightsky;
pub mod simulated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderId {
    BrightSky,
    #[default]
    Simulated,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::BrightSky => "brightsky",
            ProviderId::Simulated => "simulated",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProviderId::BrightSky => "DWD observations and forecasts via the Bright Sky API",
            ProviderId::Simulated => "Synthetic demo data, no network access",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::BrightSky, ProviderId::Simulated]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "brightsky" | "dwd" => Ok(ProviderId::BrightSky),
            "simulated" | "demo" => Ok(ProviderId::Simulated),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: brightsky, simulated."
            )),
        }
    }
}

/// An hourly window `(end - range, end]` at one location.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub location: GeoPoint,
    pub range: TimeRange,
    pub end: DateTime<Utc>,
}

impl SeriesRequest {
    pub fn new(location: GeoPoint, range: TimeRange, end: DateTime<Utc>) -> Self {
        Self { location, range, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.end - self.range.duration()
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn fetch_series(&self, request: &SeriesRequest) -> anyhow::Result<WeatherSeries>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::BrightSky => {
            let provider = match config.provider_base_url(id) {
                Some(base_url) => BrightSkyProvider::with_base_url(base_url)?,
                None => BrightSkyProvider::new()?,
            };
            Box::new(provider)
        }
        ProviderId::Simulated => Box::new(SimulatedProvider::default()),
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn provider_id_accepts_aliases_case_insensitively() {
        assert_eq!(ProviderId::try_from("DWD").unwrap(), ProviderId::BrightSky);
        assert_eq!(ProviderId::try_from("Demo").unwrap(), ProviderId::Simulated);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn request_window_spans_range() {
        let end = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let request = SeriesRequest::new(GeoPoint::HAMBURG, TimeRange::Day, end);

        assert_eq!((request.end - request.start()).num_hours(), 24);
    }

    #[test]
    fn default_provider_from_config_uses_simulated_when_not_set() {
        let cfg = Config::default();
        let provider = default_provider_from_config(&cfg).expect("simulated needs no setup");

        assert_eq!(provider.id(), ProviderId::Simulated);
    }

    #[test]
    fn provider_from_config_respects_base_url() {
        let mut cfg = Config::default();
        cfg.set_provider_base_url(ProviderId::BrightSky, Some("not a url".into()));

        let err = provider_from_config(ProviderId::BrightSky, &cfg).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid Bright Sky base URL"));

        cfg.set_provider_base_url(ProviderId::BrightSky, Some("http://127.0.0.1:1".into()));
        let provider = provider_from_config(ProviderId::BrightSky, &cfg).unwrap();
        assert_eq!(provider.id(), ProviderId::BrightSky);
    }
}
