// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Click fraud heuristics.
//!
//! Scoring is a pure, deterministic function of the click context. A click
//! scoring at or above [`INVALID_CLICK_THRESHOLD`] is recorded as invalid and
//! never billed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::ClickContext;

/// Clicks at or above this score are invalid.
pub const INVALID_CLICK_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// More than this many clicks from one IP within the lookback window is suspicious.
pub const MAX_CLICKS_PER_IP: u32 = 5;

/// Shorter user agents are treated as scripted clients.
pub const MIN_USER_AGENT_LENGTH: usize = 20;

/// A single fraud signal and the points it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudSignal {
    /// Clicked less than a second after serving.
    TooFast,
    /// Too many recent clicks from the same IP.
    IpFrequency,
    /// Missing or implausibly short user agent.
    SuspiciousUserAgent,
    /// Missing click position, or the origin.
    InvalidPosition,
}

impl FraudSignal {
    /// Returns the reason label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TooFast => "too_fast",
            Self::IpFrequency => "ip_frequency",
            Self::SuspiciousUserAgent => "suspicious_user_agent",
            Self::InvalidPosition => "invalid_position",
        }
    }

    /// Returns the points this signal adds to the score.
    #[must_use]
    pub const fn weight(&self) -> Decimal {
        match self {
            Self::TooFast => Decimal::from_parts(30, 0, 0, false, 0),
            Self::IpFrequency => Decimal::from_parts(25, 0, 0, false, 0),
            Self::SuspiciousUserAgent => Decimal::from_parts(15, 0, 0, false, 0),
            Self::InvalidPosition => Decimal::from_parts(20, 0, 0, false, 0),
        }
    }
}

/// The outcome of scoring one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudAssessment {
    pub is_valid: bool,
    pub score: Decimal,
    /// Signals that fired, in evaluation order.
    pub signals: Vec<FraudSignal>,
}

impl FraudAssessment {
    /// Returns the fired signals as a comma-separated reason string.
    #[must_use]
    pub fn reason(&self) -> String {
        self.signals
            .iter()
            .map(FraudSignal::as_str)
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

/// Scores a click.
#[must_use]
pub fn score_click(ctx: &ClickContext) -> FraudAssessment {
    let mut signals: Vec<FraudSignal> = Vec::new();

    if ctx.time_to_click < Decimal::ONE {
        signals.push(FraudSignal::TooFast);
    }
    if ctx.recent_clicks_from_ip > MAX_CLICKS_PER_IP {
        signals.push(FraudSignal::IpFrequency);
    }
    if ctx
        .user_agent
        .as_deref()
        .is_none_or(|agent| agent.chars().count() < MIN_USER_AGENT_LENGTH)
    {
        signals.push(FraudSignal::SuspiciousUserAgent);
    }
    if ctx.click_position.is_none_or(|position| position.is_origin()) {
        signals.push(FraudSignal::InvalidPosition);
    }

    let score: Decimal = signals.iter().map(FraudSignal::weight).sum();

    FraudAssessment {
        is_valid: score < INVALID_CLICK_THRESHOLD,
        score,
        signals,
    }
}
