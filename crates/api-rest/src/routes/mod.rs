pub(crate) mod catalog;
pub(crate) mod contacts;
pub(crate) mod failures;
pub(crate) mod health;
pub(crate) mod parcels;
pub(crate) mod patients;
pub(crate) mod shipments;
pub(crate) mod sites;
pub(crate) mod trials;
