//! Fund records and the in-memory fund universes they live in.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Numeric attributes carried by every fund record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    CumulativeReturn,
    Volatility,
    OngoingCharges,
    ManagementFee,
    Income,
}

impl NumericField {
    pub const ALL: [NumericField; 5] = [
        NumericField::CumulativeReturn,
        NumericField::Volatility,
        NumericField::OngoingCharges,
        NumericField::ManagementFee,
        NumericField::Income,
    ];

    /// Attributes the substitute distance is computed over.
    pub const DISTANCE: [NumericField; 4] = [
        NumericField::CumulativeReturn,
        NumericField::Volatility,
        NumericField::OngoingCharges,
        NumericField::ManagementFee,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            NumericField::CumulativeReturn => "rentabilidad_acumulada",
            NumericField::Volatility => "volatilidad",
            NumericField::OngoingCharges => "ongoing_charges",
            NumericField::ManagementFee => "management_fee",
            NumericField::Income => "income",
        }
    }
}

/// A single classified fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub id: String,
    pub cluster: i64,
    pub cumulative_return: f64,
    pub volatility: f64,
    pub ongoing_charges: f64,
    pub management_fee: f64,
    pub income: f64,
    pub asset_type: String,
    pub currency: String,
    pub geo_zone: String,
    pub clean_share: bool,
}

impl FundRecord {
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::CumulativeReturn => self.cumulative_return,
            NumericField::Volatility => self.volatility,
            NumericField::OngoingCharges => self.ongoing_charges,
            NumericField::ManagementFee => self.management_fee,
            NumericField::Income => self.income,
        }
    }

    pub fn set_numeric(&mut self, field: NumericField, value: f64) {
        match field {
            NumericField::CumulativeReturn => self.cumulative_return = value,
            NumericField::Volatility => self.volatility = value,
            NumericField::OngoingCharges => self.ongoing_charges = value,
            NumericField::ManagementFee => self.management_fee = value,
            NumericField::Income => self.income = value,
        }
    }

    /// Euclidean distance to `other` over [`NumericField::DISTANCE`].
    pub fn distance_to(&self, other: &FundRecord) -> f64 {
        NumericField::DISTANCE
            .iter()
            .map(|f| (self.numeric(*f) - other.numeric(*f)).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Duplicate fund identifier: {0}")]
    DuplicateId(String),

    #[error("Fund {0} is missing from the normalized universe")]
    MissingNormalized(String),

    #[error("Fund {0} is missing from the raw universe")]
    MissingRaw(String),

    #[error("Fund {id} has cluster {raw} in the raw universe but {normalized} in the normalized one")]
    ClusterMismatch { id: String, raw: i64, normalized: i64 },
}

/// An ordered collection of fund records, one per identifier.
#[derive(Debug, Clone, Default)]
pub struct FundUniverse {
    records: Vec<FundRecord>,
    index: HashMap<String, usize>,
}

impl FundUniverse {
    pub fn new(records: Vec<FundRecord>) -> Result<Self, DatasetError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(DatasetError::DuplicateId(record.id.clone()));
            }
        }
        Ok(Self { records, index })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FundRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&FundRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Members of `cluster`, in universe order.
    pub fn cluster_members(&self, cluster: i64) -> impl Iterator<Item = &FundRecord> {
        self.records.iter().filter(move |r| r.cluster == cluster)
    }

    pub fn cluster_sizes(&self) -> BTreeMap<i64, usize> {
        let mut sizes = BTreeMap::new();
        for record in &self.records {
            *sizes.entry(record.cluster).or_insert(0) += 1;
        }
        sizes
    }
}
