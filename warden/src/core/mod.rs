//! Pure, deterministic warden logic: data contracts, decisions, containment.

pub mod containment;
pub mod decision;
pub mod types;
