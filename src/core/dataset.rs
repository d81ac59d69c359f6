use crate::core::fund::{DatasetError, FundRecord, FundUniverse};
use crate::core::scaler::StandardScaler;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Source of the classified fund tables.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    async fn load(&self) -> Result<FundData>;
}

/// Read-only data context for substitute searches.
///
/// Holds the raw universe and its normalized counterpart. Both are
/// guaranteed to contain the same identifiers with the same cluster ids.
/// Share it across queries by reference or behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FundData {
    raw: FundUniverse,
    normalized: FundUniverse,
    scaler: Option<StandardScaler>,
}

impl FundData {
    /// Builds the context from pre-normalized tables.
    pub fn new(raw: FundUniverse, normalized: FundUniverse) -> Result<Self, DatasetError> {
        for record in raw.records() {
            let other = normalized
                .get(&record.id)
                .ok_or_else(|| DatasetError::MissingNormalized(record.id.clone()))?;
            if other.cluster != record.cluster {
                return Err(DatasetError::ClusterMismatch {
                    id: record.id.clone(),
                    raw: record.cluster,
                    normalized: other.cluster,
                });
            }
        }
        if let Some(extra) = normalized.records().iter().find(|r| raw.get(&r.id).is_none()) {
            return Err(DatasetError::MissingRaw(extra.id.clone()));
        }

        Ok(Self {
            raw,
            normalized,
            scaler: None,
        })
    }

    /// Fits a scaler over the whole classified population and derives the
    /// normalized universe from it.
    pub fn from_raw(records: Vec<FundRecord>) -> Result<Self, DatasetError> {
        let scaler = StandardScaler::fit(&records);
        let normalized: Vec<FundRecord> = records.iter().map(|r| scaler.transform(r)).collect();
        debug!("Normalized {} fund records", normalized.len());

        let raw = FundUniverse::new(records)?;
        let normalized = FundUniverse::new(normalized)?;
        Ok(Self {
            raw,
            normalized,
            scaler: Some(scaler),
        })
    }

    pub fn raw(&self) -> &FundUniverse {
        &self.raw
    }

    pub fn normalized(&self) -> &FundUniverse {
        &self.normalized
    }

    /// The scaler used to build the normalized universe, when it was fit here.
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }
}
