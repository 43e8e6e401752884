use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    Downtown,
    Mountain,
    Rural,
    Suburb,
    Urban,
    Waterfront,
}

impl Location {
    /// Every location the model was trained on, in one-hot column order.
    pub const ALL: [Location; 6] = [
        Location::Downtown,
        Location::Mountain,
        Location::Rural,
        Location::Suburb,
        Location::Urban,
        Location::Waterfront,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Downtown => "Downtown",
            Location::Mountain => "Mountain",
            Location::Rural => "Rural",
            Location::Suburb => "Suburb",
            Location::Urban => "Urban",
            Location::Waterfront => "Waterfront",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Location::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Excellent,
        Condition::Fair,
        Condition::Good,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Poor => "Poor",
            Condition::Fair => "Fair",
            Condition::Good => "Good",
            Condition::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Condition::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| s.to_string())
    }
}

/// Inbound housing record as received over the wire.
///
/// Categorical fields stay strings here so that an unknown value is reported
/// by the validator with the offending value named, instead of failing
/// deserialization of the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub sqft: f64,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub location: String,
    pub year_built: i64,
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rooms: Option<f64>,
}

/// A request that passed every domain constraint.
///
/// Only `RequestValidator` constructs this type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ValidatedRequest {
    pub sqft: f64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub location: Location,
    pub year_built: i32,
    pub condition: Condition,
    pub total_rooms: Option<f64>,
}

/// Total room count, either taken from the request or computed from
/// bedrooms + bathrooms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalRooms {
    Supplied(f64),
    Derived(f64),
}

impl TotalRooms {
    pub fn value(&self) -> f64 {
        match self {
            TotalRooms::Supplied(v) | TotalRooms::Derived(v) => *v,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, TotalRooms::Derived(_))
    }
}

/// Validated request enriched with the inference-time derived features.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatureRecord {
    pub sqft: f64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub location: Location,
    pub year_built: i32,
    pub condition: Condition,
    pub house_age: f64,
    pub bed_bath_ratio: f64,
    pub total_rooms: TotalRooms,
}

/// `[lower, upper]` band around a point estimate. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval(pub f64, pub f64);

impl ConfidenceInterval {
    pub fn lower(&self) -> f64 {
        self.0
    }

    pub fn upper(&self) -> f64 {
        self.1
    }

    pub fn contains(&self, value: f64) -> bool {
        self.0 <= value && value <= self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub confidence_interval: ConfidenceInterval,
    pub features_importance: BTreeMap<String, f64>,
    pub prediction_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parsing_is_case_insensitive() {
        assert_eq!(Location::from_str("urban"), Ok(Location::Urban));
        assert_eq!(Location::from_str(" Waterfront "), Ok(Location::Waterfront));
        assert_eq!(Location::from_str("Atlantis"), Err("Atlantis".to_string()));
    }

    #[test]
    fn test_condition_parsing() {
        assert_eq!(Condition::from_str("GOOD"), Ok(Condition::Good));
        assert!(Condition::from_str("Ruined").is_err());
    }

    #[test]
    fn test_total_rooms_value() {
        assert_eq!(TotalRooms::Supplied(7.0).value(), 7.0);
        assert!(TotalRooms::Derived(4.5).is_derived());
        assert!(!TotalRooms::Supplied(4.5).is_derived());
    }

    #[test]
    fn test_confidence_interval_serializes_as_array() {
        let json = serde_json::to_string(&ConfidenceInterval(90.0, 110.0)).unwrap();
        assert_eq!(json, "[90.0,110.0]");
    }

    #[test]
    fn test_request_total_rooms_defaults_to_none() {
        let json = r#"{"sqft":1500,"bedrooms":3,"bathrooms":2,"location":"Urban","year_built":2000,"condition":"Good"}"#;
        let request: PredictionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.total_rooms, None);
        assert_eq!(request.bedrooms, 3);
    }
}
