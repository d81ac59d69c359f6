use crate::core::dataset::{DatasetProvider, FundData};
use crate::core::fund::{FundRecord, FundUniverse, NumericField};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, de};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads classified funds from CSV files.
///
/// With only a raw table the normalized universe is derived by fitting a
/// standard scaler over every loaded fund. A pre-normalized table can be
/// supplied instead; it must list the same funds with the same clusters.
pub struct CsvDatasetProvider {
    funds_path: PathBuf,
    normalized_path: Option<PathBuf>,
}

impl CsvDatasetProvider {
    pub fn new<P: AsRef<Path>>(funds_path: P) -> Self {
        Self {
            funds_path: funds_path.as_ref().to_path_buf(),
            normalized_path: None,
        }
    }

    pub fn with_normalized<P: AsRef<Path>>(mut self, normalized_path: P) -> Self {
        self.normalized_path = Some(normalized_path.as_ref().to_path_buf());
        self
    }
}

#[async_trait]
impl DatasetProvider for CsvDatasetProvider {
    async fn load(&self) -> Result<FundData> {
        let raw = read_funds_file(&self.funds_path).await?;
        info!(
            "Loaded {} funds from {}",
            raw.len(),
            self.funds_path.display()
        );

        let data = match &self.normalized_path {
            Some(path) => {
                let normalized = read_funds_file(path).await?;
                FundData::new(FundUniverse::new(raw)?, FundUniverse::new(normalized)?)
                    .with_context(|| format!("Normalized table {} does not match", path.display()))?
            }
            None => FundData::from_raw(raw)?,
        };
        Ok(data)
    }
}

async fn read_funds_file(path: &Path) -> Result<Vec<FundRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read funds file: {}", path.display()))?;
    parse_funds(content.as_bytes())
        .with_context(|| format!("Failed to parse funds file: {}", path.display()))
}

#[derive(Debug, Deserialize)]
struct FundRow {
    #[serde(alias = "id")]
    isin: String,
    cluster: i64,
    #[serde(alias = "cumulative_return")]
    rentabilidad_acumulada: Option<f64>,
    #[serde(alias = "volatility")]
    volatilidad: Option<f64>,
    ongoing_charges: Option<f64>,
    management_fee: Option<f64>,
    #[serde(default)]
    income: Option<f64>,
    #[serde(default)]
    asset_type: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    geo_zone: String,
    #[serde(default, deserialize_with = "flag")]
    clean_share: bool,
}

impl FundRow {
    fn value(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::CumulativeReturn => self.rentabilidad_acumulada,
            NumericField::Volatility => self.volatilidad,
            NumericField::OngoingCharges => self.ongoing_charges,
            NumericField::ManagementFee => self.management_fee,
            NumericField::Income => self.income,
        }
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" => Ok(true),
        "false" | "0" | "0.0" | "no" | "" => Ok(false),
        other => Err(de::Error::custom(format!("invalid flag: {other}"))),
    }
}

/// Parses a classified funds table.
///
/// Empty numeric cells are filled from the previous row, then rows still
/// missing a value take it from the next row. The distance columns must be
/// present with at least one value; an absent `income` column stays NaN.
pub fn parse_funds<R: Read>(reader: R) -> Result<Vec<FundRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Missing header row")?.clone();
    for field in NumericField::DISTANCE {
        let present = column_names(field)
            .iter()
            .any(|name| headers.iter().any(|h| h == *name));
        if !present {
            bail!("Missing required column {}", field.column());
        }
    }

    let mut rows = Vec::new();
    for (i, result) in csv_reader.deserialize::<FundRow>().enumerate() {
        // Header is line 1.
        let row = result.with_context(|| format!("Invalid fund row at line {}", i + 2))?;
        rows.push(row);
    }
    debug!("Parsed {} fund rows", rows.len());

    let mut records: Vec<FundRecord> = rows
        .iter()
        .map(|row| FundRecord {
            id: row.isin.clone(),
            cluster: row.cluster,
            cumulative_return: f64::NAN,
            volatility: f64::NAN,
            ongoing_charges: f64::NAN,
            management_fee: f64::NAN,
            income: f64::NAN,
            asset_type: row.asset_type.clone(),
            currency: row.currency.clone(),
            geo_zone: row.geo_zone.clone(),
            clean_share: row.clean_share,
        })
        .collect();

    for field in NumericField::ALL {
        let column: Vec<Option<f64>> = rows.iter().map(|r| r.value(field)).collect();
        let gaps = column.iter().filter(|v| v.is_none()).count();
        if gaps > 0 && gaps == column.len() && NumericField::DISTANCE.contains(&field) {
            bail!("Column {} has no values", field.column());
        }
        if gaps > 0 {
            debug!("Filling {} gaps in column {}", gaps, field.column());
        }
        let filled = fill_gaps(&column);
        for (record, value) in records.iter_mut().zip(filled) {
            record.set_numeric(field, value.unwrap_or(f64::NAN));
        }
    }

    Ok(records)
}

/// Header names accepted for `field`.
fn column_names(field: NumericField) -> &'static [&'static str] {
    match field {
        NumericField::CumulativeReturn => &["rentabilidad_acumulada", "cumulative_return"],
        NumericField::Volatility => &["volatilidad", "volatility"],
        NumericField::OngoingCharges => &["ongoing_charges"],
        NumericField::ManagementFee => &["management_fee"],
        NumericField::Income => &["income"],
    }
}

/// Forward fill followed by backward fill.
fn fill_gaps(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut filled = Vec::with_capacity(values.len());
    let mut last = None;
    for v in values {
        last = v.or(last);
        filled.push(last);
    }
    let mut next = None;
    for v in filled.iter_mut().rev() {
        next = v.or(next);
        *v = next;
    }
    filled
}
