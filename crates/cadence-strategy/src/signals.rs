// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signals derived from inbound replies.

use std::sync::LazyLock;

use regex::Regex;

/// Phrases that indicate buying intent.
static PURCHASE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Pricing questions: "how much", "what's the price", "pricing"
        Regex::new(r"(?i)\b(how\s+much|pric(e|es|ing)|cost(s)?|quote|rates?)\b").unwrap(),
        // Direct intent: "I want to buy", "ready to order", "sign me up"
        Regex::new(r"(?i)\b(buy|purchase|order|subscribe|sign\s+(me\s+)?up)\b").unwrap(),
        // Sales process: demos, trials, contracts, invoices
        Regex::new(r"(?i)\b(demo|trial|contract|invoice|proposal|discount)\b").unwrap(),
    ]
});

/// Smoothing factor of the sentiment trend's moving average.
const TREND_ALPHA: f64 = 0.3;

/// Trend below this counts as a negative relationship.
pub const NEGATIVE_TREND_THRESHOLD: f64 = -0.3;

/// Whether `message` contains a purchase signal.
pub fn detect_purchase_signal(message: &str) -> bool {
    PURCHASE_PATTERNS.iter().any(|p| p.is_match(message))
}

/// Fold a new signed sentiment score into the exponential moving average.
pub fn update_sentiment_trend(previous: f64, score: f64) -> f64 {
    let score = score.clamp(-1.0, 1.0);
    (TREND_ALPHA * score + (1.0 - TREND_ALPHA) * previous).clamp(-1.0, 1.0)
}
