// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The serving façade.
//!
//! [`AdServer`] is the only entry point callers need: it runs auctions and
//! tracks impressions, clicks and conversions against whatever stores it was
//! built with. Requests and responses are plain DTOs; engine errors are
//! translated into [`ApiError`] so core types never leak to callers.
//!
//! Auctions fail open: any failure past input validation is logged and
//! answered with [`AuctionResult::NoAd`]. Tracking calls surface
//! `ResourceNotFound` for unknown impressions and clicks.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod config;
mod error;
mod handlers;
mod request_response;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_ATTRIBUTION_MODEL, DEFAULT_CURRENCY, DEFAULT_FRAUD_LOOKBACK,
    DEFAULT_VERIFICATION_METHOD, ServingConfig,
};
pub use error::{ApiError, translate_core_error, translate_domain_error};
pub use handlers::AdServer;
pub use request_response::{
    AuctionApiRequest, AuctionApiResponse, AuctionResult, CreativeInfo, TrackClickRequest,
    TrackClickResponse, TrackConversionRequest, TrackConversionResponse, TrackImpressionRequest,
    TrackImpressionResponse, VoidEventsResponse,
};
