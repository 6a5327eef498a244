// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Serving configuration.

use adserve_domain::DEFAULT_SERVING_TIMEZONE;
use rust_decimal::Decimal;
use time::Duration;

/// Default trailing window for the per-IP click count.
pub const DEFAULT_FRAUD_LOOKBACK: Duration = Duration::hours(1);

/// Attribution model recorded when a conversion names none.
pub const DEFAULT_ATTRIBUTION_MODEL: &str = "last_click";

/// Verification method recorded when a conversion names none.
pub const DEFAULT_VERIFICATION_METHOD: &str = "automatic";

/// Currency recorded on conversions.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Tunables of one [`AdServer`](crate::AdServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingConfig {
    /// IANA timezone whose midnight starts a new budget day.
    pub timezone: String,
    /// How far back clicks from the same IP are counted when scoring a click.
    pub fraud_lookback: Duration,
    /// Value recorded for a conversion reported without one.
    pub default_conversion_value: Decimal,
    pub currency: String,
}

impl ServingConfig {
    /// Returns the default configuration serving in `timezone`.
    #[must_use]
    pub fn with_timezone(timezone: &str) -> Self {
        Self {
            timezone: timezone.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_SERVING_TIMEZONE.to_string(),
            fraud_lookback: DEFAULT_FRAUD_LOOKBACK,
            default_conversion_value: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}
