//! Domain layer: value objects, form validation and the aggregates
pub mod value_objects;
pub mod validation;
pub mod aggregates;
