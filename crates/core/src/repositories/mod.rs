//! Entity services.
//!
//! Each service wraps one or more [`shared::RecordRepository`] handles over the same store and
//! adds the cross-entity rules for its records: reference checks on create, relationship
//! edits, lifecycle transitions and the named read queries.

pub mod catalog;
pub mod contacts;
pub mod failures;
pub mod parcels;
pub mod patients;
pub mod shared;
pub mod shipments;
pub mod sites;
pub mod trials;
