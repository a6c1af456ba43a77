//! On-disk cache of fetched series, one JSON file per request window.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    model::WeatherSeries,
    provider::{ProviderId, SeriesRequest, WeatherProvider},
};

/// Observations are hourly, so a fetched window is fresh for about an hour.
pub const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    series: WeatherSeries,
}

#[derive(Debug, Clone)]
pub struct SeriesCache {
    dir: PathBuf,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    pub fn with_default_ttl(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, Duration::minutes(DEFAULT_TTL_MINUTES))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(provider: ProviderId, request: &SeriesRequest) -> String {
        format!(
            "{}_{:.4}_{:.4}_{}_{}.json",
            provider,
            request.location.latitude,
            request.location.longitude,
            request.range,
            request.end.format("%Y%m%d%H"),
        )
    }

    fn entry_path(&self, provider: ProviderId, request: &SeriesRequest) -> PathBuf {
        self.dir.join(Self::key(provider, request))
    }

    pub fn get(&self, provider: ProviderId, request: &SeriesRequest) -> Option<WeatherSeries> {
        self.get_at(provider, request, Utc::now())
    }

    /// Looks up a series as of `now`; stale and unreadable entries are misses.
    pub fn get_at(
        &self,
        provider: ProviderId,
        request: &SeriesRequest,
        now: DateTime<Utc>,
    ) -> Option<WeatherSeries> {
        let path = self.entry_path(provider, request);

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read cache entry: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring corrupt cache entry: {e}");
                return None;
            }
        };

        if now - entry.stored_at > self.ttl {
            tracing::debug!(path = %path.display(), stored_at = %entry.stored_at, "cache entry is stale");
            return None;
        }

        tracing::debug!(path = %path.display(), "cache hit");
        let mut series = entry.series;
        // the key rounds coordinates, so the entry may belong to a nearby point
        for obs in &mut series.observations {
            obs.latitude = request.location.latitude;
            obs.longitude = request.location.longitude;
        }
        Some(series)
    }

    pub fn put(&self, provider: ProviderId, request: &SeriesRequest, series: &WeatherSeries) -> Result<()> {
        self.put_at(provider, request, series, Utc::now())
    }

    pub fn put_at(
        &self,
        provider: ProviderId,
        request: &SeriesRequest,
        series: &WeatherSeries,
        now: DateTime<Utc>,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;

        let path = self.entry_path(provider, request);
        let entry = CacheEntry { stored_at: now, series: series.clone() };
        let json = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))
    }

    /// Removes every cached series and returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list cache directory: {}", self.dir.display()));
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.context("Failed to read cache directory entry")?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache entry: {}", path.display()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Serves series from the cache when possible and stores fresh fetches.
#[derive(Debug)]
pub struct CachedProvider {
    inner: Box<dyn WeatherProvider>,
    cache: SeriesCache,
}

impl CachedProvider {
    pub fn new(inner: Box<dyn WeatherProvider>, cache: SeriesCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl WeatherProvider for CachedProvider {
    fn id(&self) -> ProviderId {
        self.inner.id()
    }

    async fn fetch_series(&self, request: &SeriesRequest) -> Result<WeatherSeries> {
        let id = self.inner.id();
        if let Some(series) = self.cache.get(id, request) {
            return Ok(series);
        }

        let series = self.inner.fetch_series(request).await?;
        if let Err(e) = self.cache.put(id, request, &series) {
            tracing::warn!("could not cache series: {e:#}");
        }

        Ok(series)
    }
}
