// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! `chargewatch analyze`: utilization report over a trailing window.

use crate::cli::output::Output;
use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use chargewatch::{render_report, AnalysisConfig, Analyzer, Insights, Store};
use chrono::FixedOffset;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AnalyzeArgs<'a> {
    pub days: i64,
    pub threshold: Option<f64>,
    /// Hours east of UTC used for hour/day bucketing.
    pub utc_offset_hours: i32,
    pub output_file: Option<&'a Path>,
}

pub fn analysis_config(config: &Config, args: &AnalyzeArgs<'_>) -> Result<AnalysisConfig> {
    if args.days < 1 {
        bail!("--days must be at least 1");
    }
    let threshold = args.threshold.unwrap_or(config.optimal_threshold);
    if !(0.0..=100.0).contains(&threshold) {
        bail!("--threshold {threshold} is outside 0..=100");
    }
    let offset = FixedOffset::east_opt(args.utc_offset_hours * 3600)
        .ok_or_else(|| anyhow!("--utc-offset {} is out of range", args.utc_offset_hours))?;
    Ok(AnalysisConfig {
        window_days: args.days,
        optimal_threshold: threshold,
        offset,
    })
}

pub fn run(config: &Config, args: AnalyzeArgs<'_>, out: Output) -> Result<()> {
    let analysis = analysis_config(config, &args)?;
    let insights = match Store::open_existing(&config.database_path)? {
        Some(store) => Analyzer::new(analysis).analyze(&store)?,
        None => {
            tracing::warn!(path = %config.database_path.display(), "database not found");
            Insights::empty()
        }
    };

    if let Some(path) = args.output_file {
        std::fs::write(path, serde_json::to_vec_pretty(&insights)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if !out.is_json() {
            eprintln!("  Insights saved to {}", path.display());
        }
    }

    out.emit(&insights, || {
        render_report(&insights, analysis.optimal_threshold)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>(days: i64, threshold: Option<f64>, offset: i32) -> AnalyzeArgs<'a> {
        AnalyzeArgs {
            days,
            threshold,
            utc_offset_hours: offset,
            output_file: None,
        }
    }

    #[test]
    fn test_threshold_defaults_to_config() {
        let config = Config {
            optimal_threshold: 65.0,
            ..Config::default()
        };
        let a = analysis_config(&config, &args(7, None, 0)).unwrap();
        assert_eq!(a.optimal_threshold, 65.0);
        let a = analysis_config(&config, &args(7, Some(90.0), -5)).unwrap();
        assert_eq!(a.optimal_threshold, 90.0);
        assert_eq!(a.offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let config = Config::default();
        assert!(analysis_config(&config, &args(0, None, 0)).is_err());
        assert!(analysis_config(&config, &args(7, Some(120.0), 0)).is_err());
        assert!(analysis_config(&config, &args(7, None, 30)).is_err());
    }

    #[test]
    fn test_missing_database_writes_empty_insights() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            database_path: dir.path().join("absent.db"),
            ..Config::default()
        };
        let file = dir.path().join("insights.json");
        let a = AnalyzeArgs {
            output_file: Some(&file),
            ..args(7, None, 0)
        };
        run(&config, a, Output::new(true)).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
        assert_eq!(json["data_points"], 0);
        assert_eq!(json["error"], "No data available for analysis");
        assert!(!config.database_path.exists());
    }
}
