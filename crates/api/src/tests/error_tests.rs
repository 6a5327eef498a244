// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use adserve::{Catalog, CoreError, Stores};
use adserve_domain::{ClockError, DomainError, PlacementId, PricingModel};
use rust_decimal_macros::dec;

use crate::tests::helpers::create_test_catalog_data;
use crate::{AdServer, ApiError, ServingConfig, translate_core_error, translate_domain_error};

#[test]
fn test_missing_field_is_invalid_input() {
    let err: ApiError = translate_domain_error(DomainError::MissingField {
        field: "page_url",
    });

    assert_eq!(
        err,
        ApiError::InvalidInput {
            field: String::from("page_url"),
            message: String::from("Required field is missing or empty"),
        }
    );
    assert_eq!(
        err.to_string(),
        "Invalid input for field 'page_url': Required field is missing or empty"
    );
}

#[test]
fn test_negative_amount_names_the_field() {
    let err: ApiError = translate_domain_error(DomainError::NegativeAmount {
        field: "conversion_value",
        value: dec!(-3),
    });

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "conversion_value"));
}

#[test]
fn test_lookup_failures_are_not_found() {
    let cases: Vec<(CoreError, &str)> = vec![
        (
            CoreError::PlacementNotFound(PlacementId::new("slot")),
            "Placement",
        ),
        (CoreError::ImpressionNotFound(String::from("i")), "Impression"),
        (CoreError::ClickNotFound(String::from("c")), "Click"),
        (
            CoreError::ConversionNotFound(String::from("v")),
            "Conversion",
        ),
    ];

    for (core_err, expected) in cases {
        match translate_core_error(core_err) {
            ApiError::ResourceNotFound { resource_type, .. } => {
                assert_eq!(resource_type, expected);
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }
}

#[test]
fn test_infrastructure_failures_are_internal() {
    assert!(matches!(
        translate_core_error(CoreError::Storage(String::from("disk full"))),
        ApiError::Internal { .. }
    ));
    assert!(matches!(
        translate_core_error(CoreError::LockPoisoned("ledger")),
        ApiError::Internal { .. }
    ));
    assert!(matches!(
        translate_core_error(CoreError::DomainViolation(DomainError::Clock(
            ClockError::OutOfRange(String::from("year 10000"))
        ))),
        ApiError::Internal { .. }
    ));
}

#[test]
fn test_unknown_timezone_is_rejected_at_startup() {
    let catalog: Catalog = Catalog::new(create_test_catalog_data(PricingModel::Cpc)).unwrap();

    let result: Result<AdServer, ApiError> = AdServer::new(
        catalog,
        &Stores::in_memory(),
        ServingConfig::with_timezone("Mars/Olympus_Mons"),
    );

    assert!(matches!(
        result,
        Err(ApiError::InvalidInput { ref field, .. }) if field == "timezone"
    ));
}
