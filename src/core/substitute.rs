//! Nearest-neighbour substitute search inside a fund's cluster.
use crate::core::criteria::{Criteria, Criterion};
use crate::core::dataset::FundData;
use crate::core::fund::FundRecord;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_RESULTS: usize = 15;

/// Smallest cluster, target included, that can offer substitutes.
pub const MIN_CLUSTER_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FundNotFound,
    ClusterTooSmall,
    InvalidThreshold,
    NoMatches,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubstituteError {
    #[error("Fund {id} was discarded due to insufficient historical data")]
    FundNotFound { id: String },

    #[error("Fund {id} has no substitutes: cluster {cluster} has only {size} funds")]
    ClusterTooSmall { id: String, cluster: i64, size: usize },

    #[error("Invalid threshold for {criterion}: {value:?} is not a number")]
    InvalidThreshold { criterion: Criterion, value: String },

    #[error("No substitute funds found matching the criteria")]
    NoMatches,
}

impl SubstituteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubstituteError::FundNotFound { .. } => ErrorKind::FundNotFound,
            SubstituteError::ClusterTooSmall { .. } => ErrorKind::ClusterTooSmall,
            SubstituteError::InvalidThreshold { .. } => ErrorKind::InvalidThreshold,
            SubstituteError::NoMatches => ErrorKind::NoMatches,
        }
    }
}

/// A substitute candidate: its normalized record and distance to the target.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub fund: FundRecord,
    pub distance: f64,
}

/// Candidates ordered by ascending distance to the target fund.
#[derive(Debug, Clone)]
pub struct SubstituteSet {
    pub target_id: String,
    pub cluster: i64,
    pub candidates: Vec<Candidate>,
}

impl SubstituteSet {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.fund.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Nearest neighbours kept before criteria are applied.
    pub max_results: usize,
    pub min_cluster_size: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            min_cluster_size: MIN_CLUSTER_SIZE,
        }
    }
}

/// Runs substitute searches against a read-only [`FundData`].
pub struct SubstituteFinder<'a> {
    data: &'a FundData,
    options: SearchOptions,
}

impl<'a> SubstituteFinder<'a> {
    pub fn new(data: &'a FundData) -> Self {
        Self::with_options(data, SearchOptions::default())
    }

    pub fn with_options(data: &'a FundData, options: SearchOptions) -> Self {
        Self { data, options }
    }

    /// Finds the nearest cluster-mates of `target_id` that satisfy `criteria`.
    ///
    /// The cluster size check counts the target itself, and criteria only
    /// narrow the `max_results` nearest funds; they never reach further down
    /// the ranking.
    pub fn find(
        &self,
        target_id: &str,
        criteria: &Criteria,
    ) -> Result<SubstituteSet, SubstituteError> {
        let universe = self.data.normalized();
        let target = universe
            .get(target_id)
            .ok_or_else(|| SubstituteError::FundNotFound {
                id: target_id.to_string(),
            })?;

        let cluster: Vec<&FundRecord> = universe.cluster_members(target.cluster).collect();
        debug!(
            "Fund {} belongs to cluster {} with {} members",
            target_id,
            target.cluster,
            cluster.len()
        );
        if cluster.len() < self.options.min_cluster_size {
            return Err(SubstituteError::ClusterTooSmall {
                id: target_id.to_string(),
                cluster: target.cluster,
                size: cluster.len(),
            });
        }

        let mut candidates: Vec<Candidate> = cluster
            .into_iter()
            .filter(|f| f.id != target.id)
            .map(|f| Candidate {
                distance: target.distance_to(f),
                fund: f.clone(),
            })
            .collect();

        // Stable; NaN distances sink to the end.
        candidates.sort_by(|a, b| {
            a.distance
                .is_nan()
                .cmp(&b.distance.is_nan())
                .then(a.distance.total_cmp(&b.distance))
        });
        candidates.truncate(self.options.max_results);

        for (criterion, value) in criteria.recognized() {
            let keep = criterion
                .predicate(value)
                .map_err(|value| SubstituteError::InvalidThreshold { criterion, value })?;
            candidates.retain(|c| keep(&c.fund));
            debug!(
                "Criterion {}={} leaves {} candidates",
                criterion,
                value,
                candidates.len()
            );
        }

        if candidates.is_empty() {
            return Err(SubstituteError::NoMatches);
        }

        Ok(SubstituteSet {
            target_id: target_id.to_string(),
            cluster: target.cluster,
            candidates,
        })
    }
}

/// Convenience wrapper over [`SubstituteFinder`] with the default cluster minimum.
pub fn find_substitutes(
    data: &FundData,
    target_id: &str,
    criteria: &Criteria,
    max_results: usize,
) -> Result<SubstituteSet, SubstituteError> {
    let options = SearchOptions {
        max_results,
        ..SearchOptions::default()
    };
    SubstituteFinder::with_options(data, options).find(target_id, criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fund::test_support::fund;
    use crate::core::fund::FundUniverse;
    use std::sync::Arc;

    /// Target "T" in cluster 1 plus `mates` cluster-mates at increasing
    /// distance, and a cluster 2 of three funds.
    fn dataset(mates: usize) -> FundData {
        let mut records = vec![fund("T", 1, [0.0; 4])];
        for i in 1..=mates {
            let mut f = fund(&format!("F{i:02}"), 1, [i as f64, 0.0, 0.0, 0.0]);
            f.management_fee = i as f64 / 10.0;
            f.currency = if i % 2 == 0 { "USD" } else { "EUR" }.to_string();
            records.push(f);
        }
        for i in 0..3 {
            records.push(fund(&format!("X{i}"), 2, [0.0; 4]));
        }
        let universe = FundUniverse::new(records).unwrap();
        FundData::new(universe.clone(), universe).unwrap()
    }

    fn distances(set: &SubstituteSet) -> Vec<f64> {
        set.candidates.iter().map(|c| c.distance).collect()
    }

    #[test]
    fn test_unknown_fund() {
        let data = dataset(20);
        let err = find_substitutes(&data, "NOPE", &Criteria::new(), 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FundNotFound);
        assert!(err.to_string().contains("insufficient historical data"));
    }

    #[test]
    fn test_lookup_is_exact() {
        let data = dataset(20);
        let err = find_substitutes(&data, "t", &Criteria::new(), 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FundNotFound);
    }

    #[test]
    fn test_cluster_of_nine_has_no_substitutes() {
        let data = dataset(8);
        let err = find_substitutes(&data, "T", &Criteria::new(), 15).unwrap_err();
        assert_eq!(
            err,
            SubstituteError::ClusterTooSmall {
                id: "T".into(),
                cluster: 1,
                size: 9
            }
        );
        assert!(err.to_string().contains("has no substitutes"));
    }

    #[test]
    fn test_cluster_of_ten_counts_target() {
        let data = dataset(9);
        let set = find_substitutes(&data, "T", &Criteria::new(), 15).unwrap();
        assert_eq!(set.len(), 9);
    }

    #[test]
    fn test_twenty_mates_returns_fifteen_nearest() {
        let data = dataset(20);
        let set = find_substitutes(&data, "T", &Criteria::new(), 15).unwrap();

        assert_eq!(set.len(), 15);
        assert!(set.ids().all(|id| id != "T"));
        let expected: Vec<String> = (1..=15).map(|i| format!("F{i:02}")).collect();
        assert_eq!(set.ids().collect::<Vec<_>>(), expected);
        let d = distances(&set);
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(set.cluster, 1);
    }

    #[test]
    fn test_other_clusters_are_never_candidates() {
        let data = dataset(20);
        let set = find_substitutes(&data, "T", &Criteria::new(), 50).unwrap();
        assert_eq!(set.len(), 20);
        assert!(set.ids().all(|id| id.starts_with('F')));
    }

    #[test]
    fn test_criteria_narrow_the_top_results_only() {
        let data = dataset(20);
        let criteria = Criteria::new().with("management_fee", "0.3");
        let set = find_substitutes(&data, "T", &criteria, 15).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["F01", "F02", "F03"]);

        // F16..F20 clear this floor but sit below the top 15 cut.
        let criteria = Criteria::new().with("rentabilidad_acumulada", "16");
        let err = find_substitutes(&data, "T", &criteria, 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatches);
        assert!(err.to_string().contains("No substitute funds found"));
    }

    #[test]
    fn test_categorical_exclusion() {
        let data = dataset(20);
        let criteria = Criteria::new().with("currency", "USD");
        let set = find_substitutes(&data, "T", &criteria, 15).unwrap();
        assert_eq!(set.len(), 8);
        assert!(set.candidates.iter().all(|c| c.fund.currency != "USD"));
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let data = dataset(20);
        let criteria = Criteria::new()
            .with("currency", "EUR")
            .with("volatilidad", "0")
            .with("management_fee", "0.6");
        let set = find_substitutes(&data, "T", &criteria, 15).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["F02", "F04", "F06"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let data = dataset(20);
        let criteria = Criteria::new().with("management_fee", "0.1");
        let set = find_substitutes(&data, "T", &criteria, 15).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["F01"]);
    }

    #[test]
    fn test_unknown_criteria_are_ignored() {
        let data = dataset(20);
        let criteria = Criteria::new().with("isin", "F01").with("income", "nope");
        let set = find_substitutes(&data, "T", &criteria, 15).unwrap();
        assert_eq!(set.len(), 15);
    }

    #[test]
    fn test_filter_excluding_everything() {
        let data = dataset(20);
        let criteria = Criteria::new().with("asset_type", "Equity");
        let err = find_substitutes(&data, "T", &criteria, 15).unwrap_err();
        assert_eq!(err, SubstituteError::NoMatches);
    }

    #[test]
    fn test_invalid_threshold() {
        let data = dataset(20);
        let criteria = Criteria::new().with("ongoing_charges", "low");
        let err = find_substitutes(&data, "T", &criteria, 15).unwrap_err();
        assert_eq!(
            err,
            SubstituteError::InvalidThreshold {
                criterion: Criterion::OngoingCharges,
                value: "low".into()
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidThreshold);
    }

    #[test]
    fn test_not_found_takes_precedence_over_bad_threshold() {
        let data = dataset(5);
        let criteria = Criteria::new().with("volatilidad", "high");
        let err = find_substitutes(&data, "NOPE", &criteria, 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FundNotFound);
        let err = find_substitutes(&data, "T", &criteria, 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClusterTooSmall);
    }

    #[test]
    fn test_ties_keep_universe_order() {
        let mut records = vec![fund("T", 7, [0.0; 4])];
        for i in 0..12 {
            records.push(fund(&format!("E{i:02}"), 7, [1.0, 0.0, 0.0, 0.0]));
        }
        let universe = FundUniverse::new(records).unwrap();
        let data = FundData::new(universe.clone(), universe).unwrap();

        let set = find_substitutes(&data, "T", &Criteria::new(), 5).unwrap();
        assert_eq!(
            set.ids().collect::<Vec<_>>(),
            vec!["E00", "E01", "E02", "E03", "E04"]
        );
    }

    #[test]
    fn test_distance_uses_normalized_values() {
        let mut raw = Vec::new();
        let mut normalized = Vec::new();
        for i in 0..10 {
            let id = format!("N{i}");
            // Raw values rank the funds in reverse of their normalized values.
            raw.push(fund(&id, 3, [100.0 - i as f64, 0.0, 0.0, 0.0]));
            normalized.push(fund(&id, 3, [i as f64, 0.0, 0.0, 0.0]));
        }
        let data = FundData::new(
            FundUniverse::new(raw).unwrap(),
            FundUniverse::new(normalized).unwrap(),
        )
        .unwrap();

        let set = find_substitutes(&data, "N0", &Criteria::new(), 3).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["N1", "N2", "N3"]);
        assert_eq!(distances(&set), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_nan_distances_sort_last() {
        let mut records = vec![fund("T", 1, [0.0; 4])];
        records.push(fund("NAN", 1, [f64::NAN, 0.0, 0.0, 0.0]));
        for i in 1..=9 {
            records.push(fund(&format!("F{i}"), 1, [i as f64, 0.0, 0.0, 0.0]));
        }
        let universe = FundUniverse::new(records).unwrap();
        let data = FundData::new(universe.clone(), universe).unwrap();

        let set = find_substitutes(&data, "T", &Criteria::new(), 15).unwrap();
        assert_eq!(set.ids().last(), Some("NAN"));
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn test_custom_minimum_cluster_size() {
        let data = dataset(3);
        let options = SearchOptions {
            max_results: 15,
            min_cluster_size: 4,
        };
        let set = SubstituteFinder::with_options(&data, options)
            .find("T", &Criteria::new())
            .unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_does_not_mutate_data() {
        let data = dataset(20);
        let before: Vec<FundRecord> = data.normalized().records().to_vec();
        let criteria = Criteria::new().with("currency", "USD");
        let _ = find_substitutes(&data, "T", &criteria, 15);
        assert_eq!(data.normalized().records(), before.as_slice());
    }

    #[test]
    fn test_concurrent_queries_share_data() {
        let data = Arc::new(dataset(20));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let data = Arc::clone(&data);
                std::thread::spawn(move || {
                    find_substitutes(&data, "T", &Criteria::new(), 5 + i)
                        .map(|set| set.len())
                })
            })
            .collect();

        let sizes: Vec<usize> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(sizes, vec![5, 6, 7, 8]);
    }
}
