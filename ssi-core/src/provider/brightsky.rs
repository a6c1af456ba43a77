use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    ingest::{self, kmh_to_ms, percent_to_oktas},
    model::{RawReading, WeatherSeries},
    provider::{ProviderId, SeriesRequest},
    station::Station,
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.brightsky.dev";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = concat!("ssi/", env!("CARGO_PKG_VERSION"));

/// DWD data served by the Bright Sky JSON API.
#[derive(Debug, Clone)]
pub struct BrightSkyProvider {
    base_url: Url,
    http: Client,
}

impl BrightSkyProvider {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Bright Sky base URL '{base_url}'"))?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Bright Sky")?;

        Ok(Self { base_url, http })
    }

    fn weather_url(&self) -> String {
        format!("{}/weather", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn fetch_records(&self, request: &SeriesRequest) -> Result<BsResponse> {
        // last_date is exclusive on the API side
        let last_date = request.end + Duration::hours(1);

        let res = self
            .http
            .get(self.weather_url())
            .query(&[
                ("lat", request.location.latitude.to_string()),
                ("lon", request.location.longitude.to_string()),
                ("date", request.start().to_rfc3339()),
                ("last_date", last_date.to_rfc3339()),
                ("tz", "Etc/UTC".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Bright Sky (weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Bright Sky weather response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Bright Sky weather request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse Bright Sky weather JSON")
    }
}

#[derive(Debug, Deserialize)]
struct BsRecord {
    timestamp: DateTime<FixedOffset>,
    precipitation: Option<f64>,
    /// km/h in DWD units
    wind_speed: Option<f64>,
    temperature: Option<f64>,
    /// minutes
    sunshine: Option<f64>,
    /// percent
    cloud_cover: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BsSource {
    dwd_station_id: Option<String>,
    station_name: Option<String>,
    lat: f64,
    lon: f64,
    height: Option<f64>,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BsResponse {
    weather: Vec<BsRecord>,
    #[serde(default)]
    sources: Vec<BsSource>,
}

impl BsSource {
    fn into_station(self) -> Option<Station> {
        Some(Station {
            id: self.dwd_station_id?,
            name: self.station_name.unwrap_or_else(|| "Unknown".to_string()),
            latitude: self.lat,
            longitude: self.lon,
            height_m: self.height,
        })
    }
}

#[async_trait]
impl WeatherProvider for BrightSkyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::BrightSky
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<WeatherSeries> {
        tracing::info!(
            location = %request.location,
            range = %request.range,
            "fetching Bright Sky series"
        );

        let parsed = self.fetch_records(request).await?;
        let start = request.start();

        let readings: Vec<RawReading> = parsed
            .weather
            .iter()
            .map(|record| (record.timestamp.with_timezone(&Utc), record))
            .filter(|(ts, _)| *ts > start && *ts <= request.end)
            .map(|(ts, record)| RawReading {
                timestamp: Some(ts),
                latitude: request.location.latitude,
                longitude: request.location.longitude,
                precipitation_mm_per_h: record.precipitation,
                wind_speed_m_s: record.wind_speed.map(kmh_to_ms),
                temperature_c: record.temperature,
                sunshine_min_per_h: record.sunshine,
                cloud_cover_oktas: record.cloud_cover.map(percent_to_oktas),
            })
            .collect();

        let (observations, rejected) = ingest::ingest_all(&readings, request.end);
        if rejected > 0 {
            tracing::warn!(rejected, kept = observations.len(), "Bright Sky returned incomplete hours");
        }

        let station = parsed
            .sources
            .into_iter()
            .min_by(|a, b| {
                a.distance
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.distance.unwrap_or(f64::INFINITY))
            })
            .and_then(BsSource::into_station);

        Ok(WeatherSeries {
            provider: ProviderId::BrightSky.to_string(),
            station,
            observations,
            rejected,
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeoPoint, TimeRange};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn request() -> SeriesRequest {
        let end = DateTime::parse_from_rfc3339("2024-06-01T12:00:00+00:00").unwrap().with_timezone(&Utc);
        SeriesRequest::new(GeoPoint::new(53.55, 9.99), TimeRange::Day, end)
    }

    fn body() -> serde_json::Value {
        json!({
            "weather": [
                {
                    "timestamp": "2024-06-01T10:00:00+00:00",
                    "source_id": 1,
                    "precipitation": 0.4,
                    "wind_speed": 18.0,
                    "temperature": 19.5,
                    "sunshine": 45.0,
                    "cloud_cover": 50
                },
                {
                    "timestamp": "2024-06-01T11:00:00+00:00",
                    "source_id": 1,
                    "precipitation": 0.0,
                    "wind_speed": 36.0,
                    "temperature": 20.1,
                    "sunshine": null,
                    "cloud_cover": 100
                },
                {
                    "timestamp": "2024-06-01T14:00:00+02:00",
                    "source_id": 1,
                    "precipitation": -0.1,
                    "wind_speed": 7.2,
                    "temperature": 21.0,
                    "sunshine": 60.0,
                    "cloud_cover": 0
                },
                {
                    "timestamp": "2024-06-01T13:00:00+00:00",
                    "source_id": 1,
                    "precipitation": 0.0,
                    "wind_speed": 7.2,
                    "temperature": 21.0,
                    "sunshine": 60.0,
                    "cloud_cover": 0
                }
            ],
            "sources": [
                {
                    "id": 1,
                    "dwd_station_id": "00954",
                    "station_name": "Hamburg-Fuhlsbüttel",
                    "lat": 53.6332,
                    "lon": 9.9881,
                    "height": 11.0,
                    "distance": 9300.0
                },
                {
                    "id": 2,
                    "dwd_station_id": "01975",
                    "station_name": "Hamburg-Neuwiedenthal",
                    "lat": 53.4777,
                    "lon": 9.8966,
                    "height": 3.0,
                    "distance": 10100.0
                }
            ]
        })
    }

    #[tokio::test]
    async fn parses_converts_and_drops_incomplete_hours() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "53.55"))
            .and(query_param("lon", "9.99"))
            .and(query_param("tz", "Etc/UTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .mount(&server)
            .await;

        let provider = BrightSkyProvider::with_base_url(&server.uri()).unwrap();
        let series = provider.fetch_series(&request()).await.expect("fetch succeeds");

        // 11:00 has no sunshine value, 13:00 lies after the window end
        assert_eq!(series.observations.len(), 2);
        assert_eq!(series.rejected, 1);
        assert_eq!(series.provider, "brightsky");

        let first = &series.observations[0];
        assert!((first.wind_speed_m_s - 5.0).abs() < 1e-9);
        assert_eq!(first.cloud_cover_oktas, 4.0);
        assert_eq!(first.latitude, 53.55);

        // 14:00+02:00 is noon UTC, negative precipitation is clamped
        let second = &series.observations[1];
        assert_eq!(second.timestamp, request().end);
        assert_eq!(second.precipitation_mm_per_h, 0.0);

        let station = series.station.expect("nearest source");
        assert_eq!(station.id, "00954");
        assert_eq!(station.height_m, Some(11.0));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"detail\": \"bad lat\"}"))
            .mount(&server)
            .await;

        let provider = BrightSkyProvider::with_base_url(&server.uri()).unwrap();
        let err = provider.fetch_series(&request()).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("bad lat"));
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = BrightSkyProvider::with_base_url(&server.uri()).unwrap();
        let err = provider.fetch_series(&request()).await.unwrap_err();

        assert!(err.to_string().contains("Failed to parse Bright Sky weather JSON"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "ü".repeat(300);
        let truncated = truncate_body(&long);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
