// Copyright 2026 Chargewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Status extraction from raw station-page HTML.
//!
//! The source page's markup is not stable, so classification is layered:
//!
//! 1. **Structural pass**: each probe (a CSS selector, most specific first)
//!    selects candidate widgets; the text of every matched element is run
//!    through the phrase rules.
//! 2. **Textual pass**: if no probe classifies, the whole plain-text
//!    rendering of the document is run through the same phrase rules.
//! 3. Otherwise the result is [`Status::Unknown`].
//!
//! Both the probes and the phrase rules are ordered lists; the first match
//! wins. Extraction never fails: empty or malformed input yields `Unknown`.

use crate::types::{ProbeError, Status};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Structural probes, most to least specific.
pub const DEFAULT_PROBES: &[&str] = &[
    "div.availability",
    r#"div[class*="availability"]"#,
    r#"span[class*="available"]"#,
    r#"div[class*="status"]"#,
    ".charger-status",
    ".dc-fast-charger",
];

/// An ordered phrase predicate mapped to a classification.
#[derive(Clone, Copy)]
pub struct PhraseRule {
    pub name: &'static str,
    pub status: Status,
    matches: fn(&str) -> bool,
}

impl PhraseRule {
    pub const fn new(name: &'static str, status: Status, matches: fn(&str) -> bool) -> Self {
        Self {
            name,
            status,
            matches,
        }
    }

    /// Apply the predicate to lower-cased, trimmed text.
    pub fn matches(&self, text: &str) -> bool {
        (self.matches)(text)
    }
}

impl std::fmt::Debug for PhraseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhraseRule")
            .field("name", &self.name)
            .field("status", &self.status)
            .finish()
    }
}

/// Phrase rules in priority order.
pub const DEFAULT_RULES: &[PhraseRule] = &[
    PhraseRule::new("out-of-order", Status::OutOfOrder, is_out_of_order),
    PhraseRule::new("full-count", Status::Available, is_fully_available),
    PhraseRule::new("zero-count", Status::InUse, is_fully_occupied),
];

fn is_out_of_order(text: &str) -> bool {
    text.contains("out of order") || text.contains("maintenance")
}

fn is_fully_available(text: &str) -> bool {
    text.contains("available") && full_count_re().is_match(text)
}

fn is_fully_occupied(text: &str) -> bool {
    text.contains("available") && zero_count_re().is_match(text)
}

/// "1/1" or "1 of 1", not embedded in a longer number.
fn full_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])1\s*(?:/|of)\s*1(?:[^0-9]|$)").expect("full-count regex is valid")
    })
}

/// "0/1" or "0 of 1", not embedded in a longer number.
fn zero_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])0\s*(?:/|of)\s*1(?:[^0-9]|$)").expect("zero-count regex is valid")
    })
}

/// Where a classification came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// A structural probe matched an element whose text satisfied a rule.
    Probe { selector: String, rule: &'static str },
    /// The whole-document text satisfied a rule.
    FullText { rule: &'static str },
}

/// A classification together with the evidence that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub status: Status,
    pub evidence: Option<Evidence>,
}

struct Probe {
    source: String,
    selector: Selector,
}

/// Layered status extractor.
pub struct Extractor {
    probes: Vec<Probe>,
    rules: Vec<PhraseRule>,
}

impl Default for Extractor {
    fn default() -> Self {
        let probes = DEFAULT_PROBES
            .iter()
            .filter_map(|source| match compile_probe(source) {
                Ok(probe) => Some(probe),
                Err(e) => {
                    tracing::warn!("skipping built-in probe: {e}");
                    None
                }
            })
            .collect();
        Self {
            probes,
            rules: DEFAULT_RULES.to_vec(),
        }
    }
}

fn compile_probe(source: &str) -> Result<Probe, ProbeError> {
    Selector::parse(source)
        .map(|selector| Probe {
            source: source.to_string(),
            selector,
        })
        .map_err(|e| ProbeError {
            selector: source.to_string(),
            reason: e.to_string(),
        })
}

impl Extractor {
    /// Build an extractor with custom probes and the default phrase rules.
    pub fn with_probes<S: AsRef<str>>(probes: &[S]) -> Result<Self, ProbeError> {
        let probes = probes
            .iter()
            .map(|p| compile_probe(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            probes,
            rules: DEFAULT_RULES.to_vec(),
        })
    }

    /// Replace the phrase rules.
    pub fn with_rules(mut self, rules: Vec<PhraseRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Probe selectors in evaluation order.
    pub fn probes(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|p| p.source.as_str())
    }

    /// Classify a document.
    pub fn extract(&self, document: &str) -> Status {
        self.explain(document).status
    }

    /// Classify a document and report which probe and rule decided it.
    pub fn explain(&self, document: &str) -> Extraction {
        if document.trim().is_empty() {
            return Extraction {
                status: Status::Unknown,
                evidence: None,
            };
        }

        let html = Html::parse_document(document);

        for probe in &self.probes {
            for element in html.select(&probe.selector) {
                let text = normalized_text(element);
                if let Some(rule) = self.classify(&text) {
                    return Extraction {
                        status: rule.status,
                        evidence: Some(Evidence::Probe {
                            selector: probe.source.clone(),
                            rule: rule.name,
                        }),
                    };
                }
            }
        }

        let page_text = normalized_text(html.root_element());
        match self.classify(&page_text) {
            Some(rule) => Extraction {
                status: rule.status,
                evidence: Some(Evidence::FullText { rule: rule.name }),
            },
            None => Extraction {
                status: Status::Unknown,
                evidence: None,
            },
        }
    }

    /// First rule whose predicate accepts the (already normalized) text.
    pub fn classify(&self, text: &str) -> Option<&PhraseRule> {
        self.rules.iter().find(|rule| rule.matches(text))
    }
}

/// Lower-cased, trimmed text content; text nodes joined by single spaces.
fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a document with the default probes and rules.
pub fn extract(document: &str) -> Status {
    Extractor::default().extract(document)
}
