// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chargewatch: charger status extraction, observation storage, and
//! utilization analysis for a single public charging station.

pub mod analysis;
pub mod extract;
pub mod store;
pub mod types;

pub use analysis::{analyze, render_report, AnalysisConfig, Analyzer, Insights};
pub use extract::{extract, Extraction, Extractor};
pub use store::{clamp_history_limit, Store, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use types::*;
