use super::types::{DerivedFeatureRecord, TotalRooms, ValidatedRequest};

/// Floor applied to bathrooms before dividing, so a house with no
/// bathrooms still yields a finite ratio.
pub const BATHROOM_FLOOR: f64 = 0.1;

/// Bedrooms per bathroom with the bathroom count floored at `BATHROOM_FLOOR`.
///
/// Shared with offline feature engineering so training and serving agree.
pub fn bed_bath_ratio(bedrooms: f64, bathrooms: f64) -> f64 {
    bedrooms / bathrooms.max(BATHROOM_FLOOR)
}

/// Age in years relative to `reference_year`, never negative.
pub fn house_age(reference_year: i32, year_built: i32) -> f64 {
    f64::from((reference_year - year_built).max(0))
}

/// Computes the inference-time derived features.
///
/// `price_per_sqft` is intentionally absent: it is a function of the target
/// and only exists in the offline feature-engineering output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver;

impl FeatureDeriver {
    pub fn derive(&self, request: &ValidatedRequest, reference_year: i32) -> DerivedFeatureRecord {
        let bedrooms = f64::from(request.bedrooms);
        let total_rooms = match request.total_rooms {
            Some(v) => TotalRooms::Supplied(v),
            None => TotalRooms::Derived(bedrooms + request.bathrooms),
        };

        DerivedFeatureRecord {
            sqft: request.sqft,
            bedrooms: request.bedrooms,
            bathrooms: request.bathrooms,
            location: request.location,
            year_built: request.year_built,
            condition: request.condition,
            house_age: house_age(reference_year, request.year_built),
            bed_bath_ratio: bed_bath_ratio(bedrooms, request.bathrooms),
            total_rooms,
        }
    }
}
