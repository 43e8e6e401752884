//! Raw tabular dataset and the cleaning steps applied before feature
//! engineering.
//!
//! Cells are kept as strings so that columns of any type survive a
//! read-clean-write cycle unchanged; an empty cell is a missing value. A
//! column is numeric when every non-missing cell parses as `f64`.

use anyhow::{Context, Result, bail};
use statrs::statistics::{Data, Median, OrderStatistics};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Columns on which a negative value marks the row as corrupt.
pub const NON_NEGATIVE_COLUMNS: &[&str] = &["price", "sqft", "bedrooms", "bathrooms", "year_built"];

/// Whisker multiplier for interquartile-range outlier removal.
pub const IQR_WHISKER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
        {
            bail!(
                "Row {} has {} cells, expected {}",
                i,
                row.len(),
                headers.len()
            );
        }
        Ok(Self { headers, rows })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV row {}", i + 1))?;
            rows.push(record.iter().map(|c| c.trim().to_string()).collect());
        }
        Self::new(headers, rows)
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)
            .context("Failed to write CSV header")?;
        for row in &self.rows {
            wtr.write_record(row).context("Failed to write CSV row")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        self.to_writer(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let j = self.column_index(column)?;
        self.rows.get(row).map(|r| r[j].as_str())
    }

    /// Parsed values of column `j`; `None` for missing or non-numeric cells.
    pub fn numeric_values(&self, j: usize) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| parse_number(&r[j])).collect()
    }

    /// True when column `j` has at least one value and every non-missing
    /// cell parses as a number.
    pub fn is_numeric(&self, j: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            let cell = &row[j];
            if is_missing(cell) {
                continue;
            }
            if parse_number(cell).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Sets column `name` from `values`, appending it when absent. `None`
    /// becomes an empty cell.
    pub fn set_numeric_column(&mut self, name: &str, values: &[Option<f64>]) {
        let j = match self.column_index(name) {
            Some(j) => j,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[j] = value.map(format_number).unwrap_or_default();
        }
    }

    /// Lowercases, trims and replaces spaces with underscores in every header.
    pub fn standardize_column_names(&mut self) {
        for header in &mut self.headers {
            *header = header.trim().to_lowercase().replace(' ', "_");
        }
    }

    /// Fills missing numeric cells with the column median and missing
    /// categorical cells with the column mode. Returns the number of cells filled.
    pub fn impute_missing_values(&mut self) -> usize {
        let mut filled = 0;
        for j in 0..self.headers.len() {
            let missing = self.rows.iter().filter(|r| is_missing(&r[j])).count();
            if missing == 0 {
                continue;
            }

            let fill = if self.is_numeric(j) {
                let present: Vec<f64> = self.numeric_values(j).into_iter().flatten().collect();
                format_number(Data::new(present).median())
            } else {
                mode(self.rows.iter().map(|r| r[j].as_str()).filter(|c| !is_missing(c)))
            };

            for row in &mut self.rows {
                if is_missing(&row[j]) {
                    row[j] = fill.clone();
                }
            }
            filled += missing;
        }
        filled
    }

    /// Drops rows with a negative value in any numeric column of
    /// `NON_NEGATIVE_COLUMNS`. Returns the number of rows removed.
    pub fn drop_negative_values(&mut self) -> usize {
        let before = self.rows.len();
        for name in NON_NEGATIVE_COLUMNS {
            let Some(j) = self.column_index(name) else {
                continue;
            };
            if !self.is_numeric(j) {
                continue;
            }
            self.rows
                .retain(|r| parse_number(&r[j]).is_some_and(|v| v >= 0.0));
        }
        before - self.rows.len()
    }

    /// Keeps rows whose `column` lies within `[q1 - 1.5*iqr, q3 + 1.5*iqr]`.
    /// Skipped when the column is absent or not numeric. Returns the number
    /// of rows removed.
    pub fn remove_outliers_iqr(&mut self, column: &str) -> usize {
        let Some(j) = self.column_index(column) else {
            info!("Skip IQR: '{}' missing", column);
            return 0;
        };
        if !self.is_numeric(j) {
            info!("Skip IQR: '{}' is not numeric", column);
            return 0;
        }

        let values: Vec<f64> = self.numeric_values(j).into_iter().flatten().collect();
        let mut data = Data::new(values);
        let q1 = data.lower_quartile();
        let q3 = data.upper_quartile();
        let iqr = q3 - q1;
        let (lower, upper) = (q1 - IQR_WHISKER * iqr, q3 + IQR_WHISKER * iqr);

        let before = self.rows.len();
        self.rows.retain(|r| {
            parse_number(&r[j]).is_some_and(|v| v >= lower && v <= upper)
        });
        let removed = before - self.rows.len();
        info!("IQR on '{}': removed {} rows", column, removed);
        removed
    }

    /// Drops duplicate rows, keeping the first occurrence. Numeric columns
    /// compare by value, so `1500` and `1500.0` are the same cell.
    pub fn drop_duplicates(&mut self) -> usize {
        let numeric: Vec<bool> = (0..self.headers.len()).map(|j| self.is_numeric(j)).collect();
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|r| {
            let key: Vec<String> = r
                .iter()
                .zip(&numeric)
                .map(|(cell, &is_num)| match parse_number(cell) {
                    Some(v) if is_num => format_number(v),
                    _ => cell.clone(),
                })
                .collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }
}

pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null")
}

pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Most frequent value; ties go to the lexicographically smallest.
fn mode<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for cell in cells {
        *counts.entry(cell).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string()).unwrap_or_default()
}

/// Summary of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub cells_imputed: usize,
    pub negative_rows: usize,
    pub outlier_rows: usize,
    pub duplicate_rows: usize,
    pub rows_out: usize,
}

/// Standardize names, impute, drop negatives, drop price outliers, drop
/// duplicates, in that order.
pub fn clean(table: &mut RawTable) -> CleaningReport {
    let rows_in = table.len();
    table.standardize_column_names();
    let cells_imputed = table.impute_missing_values();
    let negative_rows = table.drop_negative_values();
    let outlier_rows = table.remove_outliers_iqr("price");
    let duplicate_rows = table.drop_duplicates();
    info!("Dropped {} duplicate rows", duplicate_rows);

    CleaningReport {
        rows_in,
        cells_imputed,
        negative_rows,
        outlier_rows,
        duplicate_rows,
        rows_out: table.len(),
    }
}

/// Cleans `input` and writes `<output_dir>/cleaned_data.csv`.
pub fn process_dataset(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    info!("Loading: {:?}", input);
    let mut table = RawTable::read_csv(input)?;
    let report = clean(&mut table);
    info!(
        "Cleaned {} -> {} rows ({} imputed cells, {} negative, {} outliers, {} duplicates)",
        report.rows_in,
        report.rows_out,
        report.cells_imputed,
        report.negative_rows,
        report.outlier_rows,
        report.duplicate_rows
    );

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {:?}", output_dir))?;
    let output = output_dir.join("cleaned_data.csv");
    table.write_csv(&output)?;
    info!("Saved: {:?}", output);
    Ok(output)
}
