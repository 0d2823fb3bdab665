//! Reading data model.
//!
//! One camera frame plus one proximity distance, captured in the same cycle.

use chrono::{DateTime, Utc};

/// A reading ready to be appended. Both halves are required; storage assigns
/// the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub image: Vec<u8>,
    pub prox: f64,
}

/// A persisted row of `vector_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub image: Vec<u8>,
    /// Distance in millimeters.
    pub prox: f64,
}
