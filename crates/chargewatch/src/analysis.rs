// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Utilization analysis over a trailing window of observations.
//!
//! Each observation becomes a utilization sample (`Available` → 0.0,
//! `In Use` → 1.0, `Out of Order` → 0.5; `Unknown` is dropped), samples are
//! grouped by hour-of-day and day-of-week, and the groups are ranked by
//! availability. Statistics are rounded to three decimals, percentages to one.

use crate::store::Store;
use crate::types::{Observation, StoreResult};
use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeDelta, Timelike, Utc, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_OPTIMAL_THRESHOLD: f64 = 80.0;

const RANKED_COUNT: usize = 3;
const NO_DATA: &str = "No data available for analysis";

/// Analysis parameters.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisConfig {
    /// Trailing window, in days.
    pub window_days: i64,
    /// Minimum availability percentage for an hour to count as optimal.
    pub optimal_threshold: f64,
    /// Offset used to assign samples to hours and weekdays.
    pub offset: FixedOffset,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            optimal_threshold: DEFAULT_OPTIMAL_THRESHOLD,
            offset: Utc.fix(),
        }
    }
}

/// Aggregate statistics for one group of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStat {
    pub mean: f64,
    pub count: usize,
    /// Sample standard deviation; absent for single-sample groups.
    pub std: Option<f64>,
    pub availability_pct: f64,
}

impl GroupStat {
    fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = (n > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            round3((ss / (n - 1) as f64).sqrt())
        });
        let mean = round3(mean);
        Self {
            mean,
            count: n,
            std,
            availability_pct: round1((1.0 - mean) * 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyStat {
    pub hour: u32,
    #[serde(flatten)]
    pub stats: GroupStat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyStat {
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    #[serde(flatten)]
    pub stats: GroupStat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallUtilization {
    /// Mean utilization, percent.
    pub average: f64,
    /// Mean availability, percent.
    pub availability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPatterns {
    pub best_hours: Vec<u32>,
    /// Worst first.
    pub worst_hours: Vec<u32>,
    /// Ranked by availability, best first.
    pub details: Vec<HourlyStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPatterns {
    #[serde(serialize_with = "serialize_weekdays")]
    pub best_days: Vec<Weekday>,
    /// Worst first.
    #[serde(serialize_with = "serialize_weekdays")]
    pub worst_days: Vec<Weekday>,
    /// Calendar order, Monday first.
    pub details: Vec<DailyStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalTimes {
    pub hours: Vec<u32>,
    pub average_availability: f64,
}

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub data_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_utilization: Option<OverallUtilization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_patterns: Option<HourlyPatterns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_patterns: Option<DailyPatterns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_times: Option<OptimalTimes>,
}

impl Insights {
    /// Explicit no-data result.
    pub fn empty() -> Self {
        Self {
            data_points: 0,
            error: Some(NO_DATA.to_string()),
            date_range: None,
            overall_utilization: None,
            hourly_patterns: None,
            daily_patterns: None,
            optimal_times: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data_points == 0
    }

    /// Stats for one hour, if that hour has samples.
    pub fn hour(&self, hour: u32) -> Option<&HourlyStat> {
        self.hourly_patterns
            .as_ref()?
            .details
            .iter()
            .find(|s| s.hour == hour)
    }

    /// Stats for one weekday, if that day has samples.
    pub fn day(&self, day: Weekday) -> Option<&DailyStat> {
        self.daily_patterns
            .as_ref()?
            .details
            .iter()
            .find(|s| s.day == day)
    }
}

/// Reads a window from the store and summarizes it.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze the window ending now.
    pub fn analyze(&self, store: &Store) -> StoreResult<Insights> {
        self.analyze_at(store, Utc::now())
    }

    /// Analyze the window ending at `now`. A window reaching past the
    /// representable range covers the whole store.
    pub fn analyze_at(&self, store: &Store, now: DateTime<Utc>) -> StoreResult<Insights> {
        let cutoff = TimeDelta::try_days(self.config.window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let observations = store.since(cutoff)?;
        let insights = self.summarize(&observations);
        tracing::info!(
            window_days = self.config.window_days,
            data_points = insights.data_points,
            "analyzed utilization window"
        );
        Ok(insights)
    }

    /// Summarize already-loaded observations.
    pub fn summarize(&self, observations: &[Observation]) -> Insights {
        let samples: Vec<_> = observations.iter().filter_map(Observation::sample).collect();
        if samples.is_empty() {
            return Insights::empty();
        }

        let offset = self.config.offset;
        let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut by_day: BTreeMap<u32, (Weekday, Vec<f64>)> = BTreeMap::new();
        for sample in &samples {
            let local = sample.timestamp.with_timezone(&offset);
            by_hour
                .entry(local.hour())
                .or_default()
                .push(sample.utilization);
            let weekday = local.weekday();
            by_day
                .entry(weekday.num_days_from_monday())
                .or_insert_with(|| (weekday, Vec::new()))
                .1
                .push(sample.utilization);
        }

        let mut hourly: Vec<HourlyStat> = by_hour
            .iter()
            .map(|(&hour, values)| HourlyStat {
                hour,
                stats: GroupStat::from_values(values),
            })
            .collect();
        hourly.sort_by(|a, b| {
            b.stats
                .availability_pct
                .total_cmp(&a.stats.availability_pct)
                .then(a.hour.cmp(&b.hour))
        });

        // BTreeMap keyed by days-from-Monday keeps calendar order.
        let daily: Vec<DailyStat> = by_day
            .values()
            .map(|(day, values)| DailyStat {
                day: *day,
                stats: GroupStat::from_values(values),
            })
            .collect();

        let mut days_ranked = daily.clone();
        days_ranked.sort_by(|a, b| {
            b.stats
                .availability_pct
                .total_cmp(&a.stats.availability_pct)
        });
        let best_days = days_ranked.iter().take(RANKED_COUNT).map(|d| d.day).collect();
        days_ranked.sort_by(|a, b| {
            a.stats
                .availability_pct
                .total_cmp(&b.stats.availability_pct)
        });
        let worst_days = days_ranked.iter().take(RANKED_COUNT).map(|d| d.day).collect();

        let best_hours = hourly.iter().take(RANKED_COUNT).map(|h| h.hour).collect();
        let worst_hours = hourly
            .iter()
            .rev()
            .take(RANKED_COUNT)
            .map(|h| h.hour)
            .collect();

        let optimal: Vec<&HourlyStat> = hourly
            .iter()
            .filter(|h| h.stats.availability_pct >= self.config.optimal_threshold)
            .collect();
        let optimal_times = (!optimal.is_empty()).then(|| OptimalTimes {
            hours: optimal.iter().map(|h| h.hour).collect(),
            average_availability: round1(
                optimal.iter().map(|h| h.stats.availability_pct).sum::<f64>()
                    / optimal.len() as f64,
            ),
        });

        let mean = samples.iter().map(|s| s.utilization).sum::<f64>() / samples.len() as f64;
        let start = samples.iter().map(|s| s.timestamp).min();
        let end = samples.iter().map(|s| s.timestamp).max();

        Insights {
            data_points: samples.len(),
            error: None,
            date_range: start.zip(end).map(|(start, end)| DateRange { start, end }),
            overall_utilization: Some(OverallUtilization {
                average: round1(mean * 100.0),
                availability: round1((1.0 - mean) * 100.0),
            }),
            hourly_patterns: Some(HourlyPatterns {
                best_hours,
                worst_hours,
                details: hourly,
            }),
            daily_patterns: Some(DailyPatterns {
                best_days,
                worst_days,
                details: daily,
            }),
            optimal_times,
        }
    }
}

/// Analyze the last `window_days` of the store with default settings.
pub fn analyze(store: &Store, window_days: i64) -> StoreResult<Insights> {
    Analyzer::new(AnalysisConfig {
        window_days,
        ..AnalysisConfig::default()
    })
    .analyze(store)
}

/// Plain-text report for terminal output.
pub fn render_report(insights: &Insights, threshold: f64) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "CHARGER UTILIZATION ANALYSIS REPORT");
    let _ = writeln!(out, "{rule}");

    if insights.is_empty() {
        let _ = writeln!(
            out,
            "Error: {}",
            insights.error.as_deref().unwrap_or(NO_DATA)
        );
        return out;
    }

    let _ = writeln!(out, "Data Points: {}", insights.data_points);
    if let Some(range) = &insights.date_range {
        let _ = writeln!(
            out,
            "Date Range: {} to {}",
            range.start.to_rfc3339(),
            range.end.to_rfc3339()
        );
    }
    if let Some(overall) = &insights.overall_utilization {
        let _ = writeln!(out, "Overall Availability: {:.1}%", overall.availability);
        let _ = writeln!(out, "Overall Utilization: {:.1}%", overall.average);
    }

    if let Some(optimal) = &insights.optimal_times {
        let _ = writeln!(
            out,
            "\nOptimal Charging Times ({threshold:.0}%+ availability):"
        );
        for hour in &optimal.hours {
            let _ = writeln!(out, "  - {hour}:00 - {}:00", hour + 1);
        }
        let _ = writeln!(
            out,
            "  Average availability: {:.1}%",
            optimal.average_availability
        );
    }

    if let Some(hourly) = &insights.hourly_patterns {
        let _ = writeln!(out, "\nBest Hours for Charging:");
        for hour in &hourly.best_hours {
            if let Some(stat) = insights.hour(*hour) {
                let _ = writeln!(
                    out,
                    "  - {hour}:00 ({:.1}% available)",
                    stat.stats.availability_pct
                );
            }
        }
    }

    if let Some(daily) = &insights.daily_patterns {
        let _ = writeln!(out, "\nBest Days for Charging:");
        for day in &daily.best_days {
            if let Some(stat) = insights.day(*day) {
                let _ = writeln!(
                    out,
                    "  - {} ({:.1}% available)",
                    weekday_name(*day),
                    stat.stats.availability_pct
                );
            }
        }
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

/// Full English weekday name.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn serialize_weekday<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(weekday_name(*day))
}

fn serialize_weekdays<S: Serializer>(days: &[Weekday], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(days.iter().map(|d| weekday_name(*d)))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
