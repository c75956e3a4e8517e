//! Attribute validators
//!
//! Validators only inspect known, non-null values; Terraform re-validates
//! once unknown values resolve.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic, DynamicValue};
use std::net::IpAddr;

fn known_string(value: &DynamicValue) -> Option<&str> {
    value.value.as_string()
}

/// Accepts IPv4 or IPv6 prefixes in CIDR notation, e.g. `10.0.0.0/8`
pub struct CidrValidator;

impl CidrValidator {
    pub fn is_cidr(value: &str) -> bool {
        let Some((addr, prefix)) = value.split_once('/') else {
            return false;
        };
        let Ok(addr) = addr.parse::<IpAddr>() else {
            return false;
        };
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let max = if addr.is_ipv4() { 32 } else { 128 };
        prefix.parse::<u8>().is_ok_and(|p| p <= max)
    }
}

impl Validator for CidrValidator {
    fn description(&self) -> String {
        "value must be a valid CIDR prefix".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = known_string(&request.config_value) {
            if !Self::is_cidr(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid CIDR in {}", request.path),
                        format!("expected {} to contain a valid CIDR, got: {}", request.path, s),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Accepts timestamps in RFC 3339 format, e.g. `2030-01-01T00:00:00Z`
pub struct Rfc3339Validator;

impl Validator for Rfc3339Validator {
    fn description(&self) -> String {
        "value must be an RFC 3339 timestamp".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = known_string(&request.config_value) {
            if let Err(e) = chrono::DateTime::parse_from_rfc3339(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid RFC 3339 timestamp in {}", request.path),
                        format!(
                            "expected {} to be a valid RFC3339 date, got {:?}: {}",
                            request.path, s, e
                        ),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Applies an element validator to every item of a list or set
pub struct ListElementsValidator {
    pub element: Box<dyn Validator>,
}

impl ListElementsValidator {
    pub fn new(element: Box<dyn Validator>) -> Self {
        Self { element }
    }
}

impl Validator for ListElementsValidator {
    fn description(&self) -> String {
        format!("each element: {}", self.element.description())
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Dynamic::List(items) = &request.config_value.value {
            for (idx, item) in items.iter().enumerate() {
                let response = self.element.validate(ValidatorRequest {
                    config_value: DynamicValue::new(item.clone()),
                    path: request.path.clone().index(idx as i64),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        ValidatorResponse { diagnostics }
    }
}
