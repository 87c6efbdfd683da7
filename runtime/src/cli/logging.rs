// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Filter directive for `level`, covering both workspace crates.
pub fn directive(level: &str) -> String {
    format!("chargewatch={}", level.trim().to_ascii_lowercase())
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug and the
/// configured `level` applies. Logs go to stderr so stdout stays clean for
/// command output.
pub fn init(level: &str, verbose: bool, json: bool) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive(fallback)))
        .unwrap_or_else(|_| EnvFilter::new(directive("info")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
