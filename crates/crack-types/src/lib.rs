//! Shared plain-data types for the cracking workspace: feature identity,
//! cracking options and the enums that select orchestration behavior.

mod feature;
mod options;

pub use feature::{FeatureRef, GeometryClass};
pub use options::{
    CrackingOptions, ErrorPolicy, IntersectionPointOptions, TargetFeatureSelection,
};
