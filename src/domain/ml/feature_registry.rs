use crate::domain::errors::FeatureLayoutError;
use crate::domain::housing::types::{Condition, DerivedFeatureRecord, Location};
use std::collections::HashSet;

/// Raw feature selection used when no training config overrides it.
/// Categorical names expand to one one-hot column per known category.
pub const DEFAULT_FEATURES: &[&str] = &[
    "sqft",
    "bedrooms",
    "bathrooms",
    "location",
    "year_built",
    "condition",
    "house_age",
    "bed_bath_ratio",
    "total_rooms",
];

/// Columns that are a function of the target. They exist in the
/// engineered training data but must never reach a model.
pub const TARGET_DERIVED_FEATURES: &[&str] = &["price", "price_per_sqft"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericFeature {
    Sqft,
    Bedrooms,
    Bathrooms,
    YearBuilt,
    HouseAge,
    BedBathRatio,
    TotalRooms,
}

impl NumericFeature {
    pub const ALL: [NumericFeature; 7] = [
        NumericFeature::Sqft,
        NumericFeature::Bedrooms,
        NumericFeature::Bathrooms,
        NumericFeature::YearBuilt,
        NumericFeature::HouseAge,
        NumericFeature::BedBathRatio,
        NumericFeature::TotalRooms,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NumericFeature::Sqft => "sqft",
            NumericFeature::Bedrooms => "bedrooms",
            NumericFeature::Bathrooms => "bathrooms",
            NumericFeature::YearBuilt => "year_built",
            NumericFeature::HouseAge => "house_age",
            NumericFeature::BedBathRatio => "bed_bath_ratio",
            NumericFeature::TotalRooms => "total_rooms",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    fn value(&self, record: &DerivedFeatureRecord) -> f64 {
        match self {
            NumericFeature::Sqft => record.sqft,
            NumericFeature::Bedrooms => f64::from(record.bedrooms),
            NumericFeature::Bathrooms => record.bathrooms,
            NumericFeature::YearBuilt => f64::from(record.year_built),
            NumericFeature::HouseAge => record.house_age,
            NumericFeature::BedBathRatio => record.bed_bath_ratio,
            NumericFeature::TotalRooms => record.total_rooms.value(),
        }
    }
}

/// One column of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Numeric(NumericFeature),
    LocationIs(Location),
    ConditionIs(Condition),
}

impl FeatureColumn {
    pub fn name(&self) -> String {
        match self {
            FeatureColumn::Numeric(f) => f.name().to_string(),
            FeatureColumn::LocationIs(l) => format!("location_{}", l.as_str()),
            FeatureColumn::ConditionIs(c) => format!("condition_{}", c.as_str()),
        }
    }

    pub fn is_categorical(&self) -> bool {
        !matches!(self, FeatureColumn::Numeric(_))
    }

    /// Parses an encoded column name such as `sqft` or `location_Urban`.
    pub fn parse(name: &str) -> Result<Self, FeatureLayoutError> {
        if TARGET_DERIVED_FEATURES.contains(&name) {
            return Err(FeatureLayoutError::TargetLeakage {
                name: name.to_string(),
            });
        }
        if let Some(f) = NumericFeature::from_name(name) {
            return Ok(FeatureColumn::Numeric(f));
        }
        if let Some(value) = name.strip_prefix("location_")
            && let Some(l) = Location::ALL.iter().find(|l| l.as_str() == value)
        {
            return Ok(FeatureColumn::LocationIs(*l));
        }
        if let Some(value) = name.strip_prefix("condition_")
            && let Some(c) = Condition::ALL.iter().find(|c| c.as_str() == value)
        {
            return Ok(FeatureColumn::ConditionIs(*c));
        }
        Err(FeatureLayoutError::UnknownFeature {
            name: name.to_string(),
        })
    }

    fn value(&self, record: &DerivedFeatureRecord) -> f64 {
        match self {
            FeatureColumn::Numeric(f) => f.value(record),
            FeatureColumn::LocationIs(l) => one_hot(record.location == *l),
            FeatureColumn::ConditionIs(c) => one_hot(record.condition == *c),
        }
    }
}

fn one_hot(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}

/// Ordered model input columns captured at training time.
///
/// The only way to produce a `FeatureVector`, so every vector handed to a
/// model follows the exact column order of its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    columns: Vec<FeatureColumn>,
}

impl FeatureLayout {
    /// Rebuilds the layout from a stored manifest of encoded column names.
    pub fn from_manifest<S: AsRef<str>>(names: &[S]) -> Result<Self, FeatureLayoutError> {
        let columns = names
            .iter()
            .map(|n| FeatureColumn::parse(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_columns(columns)
    }

    /// Expands a raw feature selection (`location`, `sqft`, ...) into
    /// encoded columns: one-hot categories first, then numeric features in
    /// selection order.
    pub fn from_selection<S: AsRef<str>>(selection: &[S]) -> Result<Self, FeatureLayoutError> {
        let mut categorical = Vec::new();
        let mut numeric = Vec::new();

        for raw in selection {
            let name = raw.as_ref();
            match name {
                "location" => {
                    categorical.extend(Location::ALL.iter().map(|l| FeatureColumn::LocationIs(*l)))
                }
                "condition" => categorical
                    .extend(Condition::ALL.iter().map(|c| FeatureColumn::ConditionIs(*c))),
                other => match FeatureColumn::parse(other)? {
                    col @ FeatureColumn::Numeric(_) => numeric.push(col),
                    _ => {
                        return Err(FeatureLayoutError::UnknownFeature {
                            name: other.to_string(),
                        });
                    }
                },
            }
        }

        categorical.extend(numeric);
        Self::from_columns(categorical)
    }

    /// Layout of `DEFAULT_FEATURES`.
    pub fn default_layout() -> Self {
        let columns = Location::ALL
            .iter()
            .map(|l| FeatureColumn::LocationIs(*l))
            .chain(Condition::ALL.iter().map(|c| FeatureColumn::ConditionIs(*c)))
            .chain(NumericFeature::ALL.iter().map(|f| FeatureColumn::Numeric(*f)))
            .collect();
        Self { columns }
    }

    fn from_columns(columns: Vec<FeatureColumn>) -> Result<Self, FeatureLayoutError> {
        if columns.is_empty() {
            return Err(FeatureLayoutError::Empty);
        }
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(*col) {
                return Err(FeatureLayoutError::Duplicate { name: col.name() });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(FeatureColumn::name).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn encode(&self, record: &DerivedFeatureRecord) -> FeatureVector {
        FeatureVector {
            values: self.columns.iter().map(|c| c.value(record)).collect(),
        }
    }
}

/// Encoded model input in manifest order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }
}
