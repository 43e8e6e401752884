//! Deterministic derived columns on cleaned data.
//!
//! Nothing here learns parameters from the data, so the step can run before
//! the train/validation split without leaking information.

use super::table::RawTable;
use crate::domain::housing::feature_deriver::{bed_bath_ratio, house_age};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Adds `price_per_sqft`, `bed_bath_ratio`, `total_rooms` and `house_age`
/// when their source columns exist. Returns the names of the columns written.
///
/// `bed_bath_ratio` and `house_age` use the same formulas as serving.
/// `price_per_sqft` is left empty where `sqft` is zero.
pub fn engineer_features(table: &mut RawTable, reference_year: i32) -> Vec<&'static str> {
    let mut written = Vec::new();

    if let (Some(price), Some(sqft)) = (column(table, "price"), column(table, "sqft")) {
        let values: Vec<Option<f64>> = price
            .iter()
            .zip(&sqft)
            .map(|(p, s)| match (p, s) {
                (Some(p), Some(s)) if *s != 0.0 => Some(p / s),
                _ => None,
            })
            .collect();
        table.set_numeric_column("price_per_sqft", &values);
        written.push("price_per_sqft");
    }

    if let (Some(bedrooms), Some(bathrooms)) =
        (column(table, "bedrooms"), column(table, "bathrooms"))
    {
        let ratio: Vec<Option<f64>> = bedrooms
            .iter()
            .zip(&bathrooms)
            .map(|(b, ba)| Some(bed_bath_ratio((*b)?, (*ba)?)))
            .collect();
        let total: Vec<Option<f64>> = bedrooms
            .iter()
            .zip(&bathrooms)
            .map(|(b, ba)| Some((*b)? + (*ba)?))
            .collect();
        table.set_numeric_column("bed_bath_ratio", &ratio);
        table.set_numeric_column("total_rooms", &total);
        written.extend(["bed_bath_ratio", "total_rooms"]);
    }

    if let Some(year_built) = column(table, "year_built") {
        let ages: Vec<Option<f64>> = year_built
            .iter()
            .map(|y| y.map(|y| house_age(reference_year, y.round() as i32)))
            .collect();
        table.set_numeric_column("house_age", &ages);
        written.push("house_age");
    }

    written
}

fn column(table: &RawTable, name: &str) -> Option<Vec<Option<f64>>> {
    let j = table.column_index(name)?;
    table.is_numeric(j).then(|| table.numeric_values(j))
}

/// Reads `input`, adds the derived columns and writes `output`.
pub fn engineer_dataset(input: &Path, output: &Path, reference_year: i32) -> Result<()> {
    info!("Loading cleaned data: {:?}", input);
    let mut table = RawTable::read_csv(input)?;
    let written = engineer_features(&mut table, reference_year);
    info!("Derived columns: {:?}", written);

    table.write_csv(output)?;
    info!("Saved featured data -> {:?}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_columns() {
        let mut t = RawTable::from_reader(
            "price,sqft,bedrooms,bathrooms,year_built\n\
             300000,1500,3,2,2000\n\
             100000,0,2,0,2030\n"
                .as_bytes(),
        )
        .unwrap();

        let written = engineer_features(&mut t, 2024);
        assert_eq!(
            written,
            vec!["price_per_sqft", "bed_bath_ratio", "total_rooms", "house_age"]
        );

        assert_eq!(t.cell(0, "price_per_sqft"), Some("200"));
        assert_eq!(t.cell(0, "bed_bath_ratio"), Some("1.5"));
        assert_eq!(t.cell(0, "total_rooms"), Some("5"));
        assert_eq!(t.cell(0, "house_age"), Some("24"));

        // Zero sqft leaves the ratio empty; zero bathrooms uses the floor.
        assert_eq!(t.cell(1, "price_per_sqft"), Some(""));
        assert_eq!(t.cell(1, "bed_bath_ratio"), Some("20"));
        // Built after the reference year.
        assert_eq!(t.cell(1, "house_age"), Some("0"));
    }

    #[test]
    fn test_missing_sources_skip_columns() {
        let mut t = RawTable::from_reader("sqft,location\n1000,Urban\n".as_bytes()).unwrap();
        assert!(engineer_features(&mut t, 2024).is_empty());
        assert_eq!(t.headers(), &["sqft", "location"]);
    }
}
