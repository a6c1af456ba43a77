use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Category, SuitabilityScore, WeatherObservation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHour {
    pub timestamp: DateTime<Utc>,
    pub observation: WeatherObservation,
    pub score: SuitabilityScore,
}

/// Longest uninterrupted stretch of Good hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub hours: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub hours: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub good: usize,
    pub moderate: usize,
    pub poor: usize,
    pub best_window: Option<GoodWindow>,
}

/// Aggregates a scored series. Returns `None` for an empty series.
pub fn summarize(hours: &[ScoredHour]) -> Option<SeriesSummary> {
    if hours.is_empty() {
        return None;
    }

    let values = hours.iter().map(|h| h.score.value);
    let total: f64 = values.clone().sum();
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);

    let count = |category: Category| hours.iter().filter(|h| h.score.category == category).count();

    Some(SeriesSummary {
        hours: hours.len(),
        mean: total / hours.len() as f64,
        min,
        max,
        good: count(Category::Good),
        moderate: count(Category::Moderate),
        poor: count(Category::Poor),
        best_window: best_good_window(hours),
    })
}

// Ties keep the earliest window.
fn best_good_window(hours: &[ScoredHour]) -> Option<GoodWindow> {
    let mut best: Option<GoodWindow> = None;
    let mut run_start: Option<usize> = None;

    for (i, hour) in hours.iter().enumerate() {
        if hour.score.category == Category::Good {
            let start = *run_start.get_or_insert(i);
            let len = i - start + 1;
            if best.is_none_or(|b| len > b.hours) {
                best = Some(GoodWindow {
                    start: hours[start].timestamp,
                    end: hour.timestamp,
                    hours: len,
                });
            }
        } else {
            run_start = None;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::tests::observation, scorer::Scorer};
    use chrono::Duration;

    fn scored(values: &[(f64, f64)]) -> Vec<ScoredHour> {
        // (precipitation, wind) pairs with otherwise ideal weather
        let scorer = Scorer::default();
        let observations: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, (p, w))| {
                let mut obs = observation(*p, *w, 20.0, 60.0, 1.0);
                obs.timestamp += Duration::hours(i as i64);
                obs
            })
            .collect();
        scorer.score_series(&observations).expect("valid series")
    }

    #[test]
    fn empty_series_has_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn counts_categories_and_extremes() {
        // ideal, rain and storm, rain only
        let hours = scored(&[(0.0, 2.0), (10.0, 20.0), (10.0, 5.0)]);
        let summary = summarize(&hours).expect("non-empty");

        assert_eq!(summary.hours, 3);
        assert_eq!(summary.good, 1);
        assert_eq!(summary.moderate, 1);
        assert_eq!(summary.poor, 1);
        assert!((summary.max - 100.0).abs() < 1e-9);
        assert!((summary.min - 35.0).abs() < 1e-9);
        assert!(summary.mean > summary.min && summary.mean < summary.max);
    }

    #[test]
    fn best_window_is_longest_good_run() {
        let hours = scored(&[
            (0.0, 2.0),
            (10.0, 20.0),
            (0.0, 2.0),
            (0.0, 3.0),
            (0.0, 4.0),
            (10.0, 20.0),
            (0.0, 2.0),
        ]);
        let window = summarize(&hours).unwrap().best_window.expect("has good hours");

        assert_eq!(window.hours, 3);
        assert_eq!(window.start, hours[2].timestamp);
        assert_eq!(window.end, hours[4].timestamp);
    }

    #[test]
    fn best_window_ties_keep_earliest() {
        let hours = scored(&[(0.0, 2.0), (10.0, 20.0), (0.0, 2.0)]);
        let window = summarize(&hours).unwrap().best_window.unwrap();

        assert_eq!(window.hours, 1);
        assert_eq!(window.start, hours[0].timestamp);
    }

    #[test]
    fn no_good_hours_means_no_window() {
        let hours = scored(&[(10.0, 20.0), (8.0, 15.0)]);
        assert!(summarize(&hours).unwrap().best_window.is_none());
    }
}
