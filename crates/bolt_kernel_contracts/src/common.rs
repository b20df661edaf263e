#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion(pub u32);

/// Submission wall-clock time in milliseconds. The adapter owns the clock and
/// keeps it strictly increasing per process; engines only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionTimeMs(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReasonCodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    MissingRequiredField {
        field: &'static str,
    },
    /// A selected feature lacks its mandatory sizing fields. `missing` lists
    /// every absent field, not just the first.
    InvalidFeatureSelection {
        feature: &'static str,
        missing: Vec<&'static str>,
    },
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
    NotFinite {
        field: &'static str,
    },
}

impl ContractViolation {
    /// The primary offending field for field-indexed refusals.
    pub fn field(&self) -> &'static str {
        match self {
            ContractViolation::MissingRequiredField { field } => field,
            ContractViolation::InvalidFeatureSelection { feature, .. } => feature,
            ContractViolation::InvalidValue { field, .. } => field,
            ContractViolation::InvalidRange { field, .. } => field,
            ContractViolation::NotFinite { field } => field,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ContractViolation::MissingRequiredField { field } => {
                format!("{field} is required")
            }
            ContractViolation::InvalidFeatureSelection { feature, missing } => {
                format!("{feature} requires {}", missing.join(", "))
            }
            ContractViolation::InvalidValue { field, reason } => {
                format!("{field}: {reason}")
            }
            ContractViolation::InvalidRange {
                field,
                min,
                max,
                got,
            } => format!("{field}: {got} outside [{min}, {max}]"),
            ContractViolation::NotFinite { field } => format!("{field}: not finite"),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}
