//! Imputation module for handling missing values.
//!
//! Only imputations with a documented per-field policy live here; every
//! other missing value stays `None` and is excluded downstream.

mod statistical;

pub use statistical::StatisticalImputer;
