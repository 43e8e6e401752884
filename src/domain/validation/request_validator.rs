use crate::domain::config::ValidationLimits;
use crate::domain::errors::{FieldViolation, ValidationError};
use crate::domain::housing::types::{Condition, Location, PredictionRequest, ValidatedRequest};
use std::str::FromStr;
use tracing::debug;

/// Enforces the domain constraints on an inbound `PredictionRequest`.
///
/// Every rule is evaluated; the returned `ValidationError` lists all
/// violated fields so a caller can fix the whole record in one round trip.
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    limits: ValidationLimits,
}

impl RequestValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validates `request` against the configured limits.
    ///
    /// `current_year` is the upper bound for `year_built`.
    pub fn validate(
        &self,
        request: &PredictionRequest,
        current_year: i32,
    ) -> Result<ValidatedRequest, ValidationError> {
        let mut violations = Vec::new();
        let limits = &self.limits;

        if !request.sqft.is_finite() || request.sqft <= 0.0 {
            violations.push(FieldViolation::new(
                "sqft",
                format!("must be greater than 0, got {}", request.sqft),
            ));
        } else if request.sqft > limits.max_sqft {
            violations.push(FieldViolation::new(
                "sqft",
                format!("must be at most {}, got {}", limits.max_sqft, request.sqft),
            ));
        }

        let bedrooms = match u32::try_from(request.bedrooms) {
            Ok(b) if b <= limits.max_bedrooms => Some(b),
            _ => {
                violations.push(FieldViolation::new(
                    "bedrooms",
                    format!(
                        "must be between 0 and {}, got {}",
                        limits.max_bedrooms, request.bedrooms
                    ),
                ));
                None
            }
        };

        if !request.bathrooms.is_finite()
            || request.bathrooms < 0.0
            || request.bathrooms > limits.max_bathrooms
        {
            violations.push(FieldViolation::new(
                "bathrooms",
                format!(
                    "must be between 0 and {}, got {}",
                    limits.max_bathrooms, request.bathrooms
                ),
            ));
        }

        let location = Location::from_str(&request.location)
            .map_err(|value| {
                violations.push(FieldViolation::new(
                    "location",
                    format!(
                        "unknown location '{}', expected one of: {}",
                        value,
                        join_names(Location::ALL.iter().map(|l| l.as_str()))
                    ),
                ));
            })
            .ok();

        let condition = Condition::from_str(&request.condition)
            .map_err(|value| {
                violations.push(FieldViolation::new(
                    "condition",
                    format!(
                        "unknown condition '{}', expected one of: {}",
                        value,
                        join_names(Condition::ALL.iter().map(|c| c.as_str()))
                    ),
                ));
            })
            .ok();

        let min_year = i64::from(limits.min_year_built);
        let year_built = if (min_year..=i64::from(current_year)).contains(&request.year_built) {
            Some(request.year_built as i32)
        } else {
            violations.push(FieldViolation::new(
                "year_built",
                format!(
                    "must be between {} and {}, got {}",
                    min_year, current_year, request.year_built
                ),
            ));
            None
        };

        if let Some(total_rooms) = request.total_rooms {
            if !total_rooms.is_finite() {
                violations.push(FieldViolation::new(
                    "total_rooms",
                    format!("must be a finite number, got {}", total_rooms),
                ));
            } else if total_rooms < request.bedrooms as f64 {
                violations.push(FieldViolation::new(
                    "total_rooms",
                    format!(
                        "must be at least the number of bedrooms ({}), got {}",
                        request.bedrooms, total_rooms
                    ),
                ));
            }
        }

        match (bedrooms, location, condition, year_built) {
            (Some(bedrooms), Some(location), Some(condition), Some(year_built))
                if violations.is_empty() =>
            {
                Ok(ValidatedRequest {
                    sqft: request.sqft,
                    bedrooms,
                    bathrooms: request.bathrooms,
                    location,
                    year_built,
                    condition,
                    total_rooms: request.total_rooms,
                })
            }
            _ => {
                debug!(
                    "Request rejected with {} violation(s): {:?}",
                    violations.len(),
                    violations.iter().map(|v| v.field).collect::<Vec<_>>()
                );
                Err(ValidationError { violations })
            }
        }
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
