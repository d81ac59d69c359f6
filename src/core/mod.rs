//! Core business logic abstractions

pub mod config;
pub mod criteria;
pub mod dataset;
pub mod fund;
pub mod log;
pub mod scaler;
pub mod substitute;

// Re-export main types for cleaner imports
pub use criteria::{Criteria, Criterion};
pub use dataset::{DatasetProvider, FundData};
pub use fund::{FundRecord, FundUniverse};
pub use substitute::{
    ErrorKind, SearchOptions, SubstituteError, SubstituteFinder, SubstituteSet, find_substitutes,
};
