// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal output helpers.

use anyhow::Result;
use serde::Serialize;

/// Output mode chosen on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Pretty JSON to stdout.
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// `value` as JSON in JSON mode, otherwise the human rendering.
    pub fn emit<T, F>(&self, value: &T, human: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> String,
    {
        if self.json {
            self.print_json(value)
        } else {
            println!("{}", human());
            Ok(())
        }
    }

    /// Report a top-level failure in the current mode.
    pub fn error(&self, e: &anyhow::Error) {
        if self.json {
            let body = serde_json::json!({ "error": true, "message": format!("{e:#}") });
            println!("{body}");
        } else {
            eprintln!("  Error: {e:#}");
        }
    }
}
