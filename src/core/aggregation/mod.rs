//! Star model aggregation and collection profiles

pub mod profile;
pub mod star_model;

pub use profile::collection_profile;
pub use star_model::{
    CapViolation, CollectionAggregate, StarModel, StarModelPolicy, SuppressedBucket,
};
