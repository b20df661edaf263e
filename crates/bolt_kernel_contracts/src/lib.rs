#![forbid(unsafe_code)]

pub mod artifact;
pub mod common;
pub mod fastener;
pub mod raw;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, SubmissionTimeMs, Validate};
