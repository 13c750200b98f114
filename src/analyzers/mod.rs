//! Aggregation views over hourly count rows.
//!
//! Each view screens its input for structurally faulty rows, computes its
//! figures from the rest, and returns the excluded rows' faults alongside
//! the result. Figures that cannot be derived are reported as undefined
//! [`types::Measure`]s instead of zeros.

pub mod annual;
pub mod benchmark;
pub mod directional;
pub mod grade;
pub mod heavy;
pub mod peak;
pub mod profile;
pub mod quality;
pub mod trend;
pub mod types;
pub mod utility;
