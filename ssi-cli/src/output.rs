//! Human-friendly rendering of scores, series and stations.

use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use serde::Serialize;
use ssi_core::{
    Category, GeoPoint, NearestStation, ScoredHour, SeriesRequest, SeriesSummary, Station,
    SuitabilityScore, WeatherSeries,
};

fn category_cell(category: Category) -> Cell {
    let color = match category {
        Category::Good => Color::Green,
        Category::Moderate => Color::Yellow,
        Category::Poor => Color::Red,
    };
    Cell::new(category.label()).fg(color)
}

pub fn score_table(score: &SuitabilityScore) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Factor", "Weight", "Sub-score", "Contribution"]);

    for (factor, sub_score) in score.component_scores.iter() {
        table.add_row(vec![
            factor.to_string(),
            format!("{:.2}", factor.weight()),
            format!("{sub_score:.1}"),
            format!("{:.1}", factor.weight() * sub_score),
        ]);
    }

    table
}

pub fn score_headline(score: &SuitabilityScore) -> String {
    format!("SSI {:.1} / 100 ({})", score.value, score.category)
}

pub fn series_header(request: &SeriesRequest, series: &WeatherSeries) -> String {
    let station = series
        .station
        .as_ref()
        .map(|s| format!(" near {} ({})", s.name, s.id))
        .unwrap_or_default();

    let mut header = format!(
        "{} hours from {} at {}{}",
        request.range.hours(),
        series.provider,
        request.location,
        station,
    );
    if series.rejected > 0 {
        header.push_str(&format!(", {} incomplete hours skipped", series.rejected));
    }
    header
}

pub fn series_table(hours: &[ScoredHour]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Time (UTC)",
        "Temp °C",
        "Wind m/s",
        "Rain mm/h",
        "Sun min/h",
        "Cloud okta",
        "SSI",
        "Category",
    ]);

    for hour in hours {
        let obs = &hour.observation;
        table.add_row(vec![
            Cell::new(hour.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{:.1}", obs.temperature_c)),
            Cell::new(format!("{:.1}", obs.wind_speed_m_s)),
            Cell::new(format!("{:.1}", obs.precipitation_mm_per_h)),
            Cell::new(format!("{:.0}", obs.sunshine_min_per_h)),
            Cell::new(format!("{:.1}", obs.cloud_cover_oktas)),
            Cell::new(format!("{:.1}", hour.score.value)),
            category_cell(hour.score.category),
        ]);
    }

    table
}

pub fn summary_text(summary: &SeriesSummary) -> String {
    let mut text = format!(
        "Mean SSI {:.1} (min {:.1}, max {:.1}) | Good {} | Moderate {} | Poor {}",
        summary.mean, summary.min, summary.max, summary.good, summary.moderate, summary.poor,
    );

    match &summary.best_window {
        Some(window) => text.push_str(&format!(
            "\nBest survey window: {} to {} ({} h)",
            window.start.format("%Y-%m-%d %H:%M"),
            window.end.format("%Y-%m-%d %H:%M"),
            window.hours,
        )),
        None => text.push_str("\nNo Good hours in this window."),
    }

    text
}

pub fn station_text(nearest: &NearestStation) -> String {
    let station = &nearest.station;
    let height = station.height_m.map(|h| format!(" | Elevation: {h:.0} m")).unwrap_or_default();

    format!(
        "{} ({})\nDistance: {:.1} km{}",
        station.name, station.id, nearest.distance_km, height
    )
}

/// JSON shape of `ssi series --json`.
#[derive(Debug, Serialize)]
pub struct SeriesReport<'a> {
    pub provider: &'a str,
    pub location: GeoPoint,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub station: Option<&'a Station>,
    pub rejected: usize,
    pub summary: Option<&'a SeriesSummary>,
    pub hours: &'a [ScoredHour],
}

impl<'a> SeriesReport<'a> {
    pub fn new(
        request: &SeriesRequest,
        series: &'a WeatherSeries,
        hours: &'a [ScoredHour],
        summary: Option<&'a SeriesSummary>,
    ) -> Self {
        Self {
            provider: &series.provider,
            location: request.location,
            start: request.start(),
            end: request.end,
            station: series.station.as_ref(),
            rejected: series.rejected,
            summary,
            hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ssi_core::{Scorer, TimeRange, WeatherObservation, station::default_stations, summarize};

    fn observation(hour: i64, precipitation: f64) -> WeatherObservation {
        WeatherObservation {
            precipitation_mm_per_h: precipitation,
            wind_speed_m_s: 3.0,
            temperature_c: 18.0,
            sunshine_min_per_h: 45.0,
            cloud_cover_oktas: 2.0,
            timestamp: DateTime::from_timestamp(1_717_200_000, 0).unwrap() + Duration::hours(hour),
            latitude: 53.55,
            longitude: 9.99,
        }
    }

    fn series() -> (SeriesRequest, WeatherSeries, Vec<ScoredHour>) {
        let observations = vec![observation(0, 0.0), observation(1, 0.0), observation(2, 10.0)];
        let scored = Scorer::default().score_series(&observations).unwrap();
        let request = SeriesRequest::new(GeoPoint::HAMBURG, TimeRange::Day, observations[2].timestamp);
        let series = WeatherSeries {
            provider: "simulated".into(),
            station: default_stations().into_iter().next(),
            observations,
            rejected: 1,
        };
        (request, series, scored)
    }

    #[test]
    fn score_table_lists_every_factor() {
        let score = Scorer::default().score(&observation(0, 0.0)).unwrap();
        let rendered = score_table(&score).to_string();

        for name in ["precipitation", "wind", "temperature", "sunshine", "cloud_cover"] {
            assert!(rendered.contains(name), "missing {name}");
        }
        assert!(score_headline(&score).contains("(Good)"));
    }

    #[test]
    fn series_header_mentions_station_and_skipped_hours() {
        let (request, series, _) = series();
        let header = series_header(&request, &series);

        assert!(header.starts_with("24 hours from simulated"));
        assert!(header.contains("Hamburg-Fuhlsbüttel"));
        assert!(header.contains("1 incomplete hours skipped"));
    }

    #[test]
    fn series_table_has_a_row_per_hour() {
        let (_, _, scored) = series();
        let rendered = series_table(&scored).to_string();

        assert!(rendered.contains("2024-06-01 00:00"));
        assert!(rendered.contains("2024-06-01 02:00"));
        assert!(rendered.contains("Moderate"));
    }

    #[test]
    fn summary_text_reports_best_window() {
        let (_, _, scored) = series();
        let text = summary_text(&summarize(&scored).unwrap());

        assert!(text.contains("Good 2 | Moderate 1 | Poor 0"));
        assert!(text.contains("Best survey window: 2024-06-01 00:00 to 2024-06-01 01:00 (2 h)"));
    }

    #[test]
    fn station_text_includes_distance() {
        let nearest = NearestStation { station: default_stations().remove(0), distance_km: 9.25 };
        let text = station_text(&nearest);

        assert!(text.contains("Hamburg-Fuhlsbüttel (00954)"));
        assert!(text.contains("Distance: 9.2 km") || text.contains("Distance: 9.3 km"));
        assert!(text.contains("Elevation: 11 m"));
    }

    #[test]
    fn report_serializes_window_and_hours() {
        let (request, series, scored) = series();
        let summary = summarize(&scored);
        let report = SeriesReport::new(&request, &series, &scored, summary.as_ref());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["provider"], "simulated");
        assert_eq!(json["hours"].as_array().unwrap().len(), 3);
        assert_eq!(json["summary"]["good"], 2);
        assert_eq!(json["station"]["id"], "00954");
    }
}
