//! Exclusion and threshold criteria applied to substitute candidates.

use crate::core::fund::{FundRecord, NumericField};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    AssetType,
    Currency,
    GeoZone,
    ManagementFee,
    OngoingCharges,
    CumulativeReturn,
    Volatility,
}

/// How a criterion value constrains a candidate.
#[derive(Clone, Copy)]
pub enum Rule {
    /// Candidate's attribute must differ from the value.
    Exclude(fn(&FundRecord) -> &str),
    /// Candidate's attribute must be less than or equal to the threshold.
    AtMost(fn(&FundRecord) -> f64),
    /// Candidate's attribute must be greater than or equal to the threshold.
    AtLeast(fn(&FundRecord) -> f64),
}

pub type Predicate = Box<dyn Fn(&FundRecord) -> bool + Send + Sync>;

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::AssetType,
        Criterion::Currency,
        Criterion::GeoZone,
        Criterion::ManagementFee,
        Criterion::OngoingCharges,
        Criterion::CumulativeReturn,
        Criterion::Volatility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::AssetType => "asset_type",
            Criterion::Currency => "currency",
            Criterion::GeoZone => "geo_zone",
            Criterion::ManagementFee => "management_fee",
            Criterion::OngoingCharges => "ongoing_charges",
            Criterion::CumulativeReturn => "rentabilidad_acumulada",
            Criterion::Volatility => "volatilidad",
        }
    }

    pub fn rule(&self) -> Rule {
        match self {
            Criterion::AssetType => Rule::Exclude(|f| f.asset_type.as_str()),
            Criterion::Currency => Rule::Exclude(|f| f.currency.as_str()),
            Criterion::GeoZone => Rule::Exclude(|f| f.geo_zone.as_str()),
            Criterion::ManagementFee => Rule::AtMost(|f| f.management_fee),
            Criterion::OngoingCharges => Rule::AtMost(|f| f.ongoing_charges),
            Criterion::CumulativeReturn => Rule::AtLeast(|f| f.cumulative_return),
            Criterion::Volatility => Rule::AtMost(|f| f.volatility),
        }
    }

    /// Numeric attribute a threshold criterion compares against.
    pub fn field(&self) -> Option<NumericField> {
        match self {
            Criterion::AssetType | Criterion::Currency | Criterion::GeoZone => None,
            Criterion::ManagementFee => Some(NumericField::ManagementFee),
            Criterion::OngoingCharges => Some(NumericField::OngoingCharges),
            Criterion::CumulativeReturn => Some(NumericField::CumulativeReturn),
            Criterion::Volatility => Some(NumericField::Volatility),
        }
    }

    /// Builds the candidate predicate for `value`.
    ///
    /// Returns the rejected text when a numeric threshold does not parse.
    pub fn predicate(&self, value: &str) -> Result<Predicate, String> {
        let predicate: Predicate = match self.rule() {
            Rule::Exclude(field) => {
                let excluded = value.to_string();
                Box::new(move |f: &FundRecord| field(f) != excluded)
            }
            Rule::AtMost(field) => {
                let threshold = parse_threshold(value)?;
                Box::new(move |f: &FundRecord| field(f) <= threshold)
            }
            Rule::AtLeast(field) => {
                let threshold = parse_threshold(value)?;
                Box::new(move |f: &FundRecord| field(f) >= threshold)
            }
        };
        Ok(predicate)
    }

    /// The value of this criterion for `fund`, as the text a user would enter.
    pub fn value_of(&self, fund: &FundRecord) -> String {
        match self.rule() {
            Rule::Exclude(field) => field(fund).to_string(),
            Rule::AtMost(field) | Rule::AtLeast(field) => field(fund).to_string(),
        }
    }
}

impl Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Criterion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset_type" => Ok(Criterion::AssetType),
            "currency" => Ok(Criterion::Currency),
            "geo_zone" => Ok(Criterion::GeoZone),
            "management_fee" => Ok(Criterion::ManagementFee),
            "ongoing_charges" => Ok(Criterion::OngoingCharges),
            "rentabilidad_acumulada" | "cumulative_return" => Ok(Criterion::CumulativeReturn),
            "volatilidad" | "volatility" => Ok(Criterion::Volatility),
            _ => Err(anyhow::anyhow!("Unknown criterion: {}", s)),
        }
    }
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    value.trim().parse::<f64>().map_err(|_| value.to_string())
}

/// Ordered criterion name to value mapping supplied with a search.
///
/// Names are kept as given so that unrecognized entries can travel with the
/// map; the search ignores them. Inserting an existing name replaces its
/// value without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    entries: Vec<(String, String)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Entries whose name is a known criterion, in insertion order.
    pub fn recognized(&self) -> impl Iterator<Item = (Criterion, &str)> {
        self.iter()
            .filter_map(|(name, value)| name.parse::<Criterion>().ok().map(|c| (c, value)))
    }
}
