//! Tolerance-aware crack-point computation.
//!
//! Whenever two feature boundaries touch or cross, or a surface's own facets
//! intersect, a shared vertex must exist at that location for downstream
//! topology to treat the features as connected. This crate decides which
//! points to insert, where, and whether insertion is safe, given equality
//! tolerances derived from the data resolution, a snap tolerance and a
//! minimum segment length. It never mutates geometries; materialization
//! lives in `crack-engine`.

pub mod calculator;
pub mod calculator3d;
pub mod classify;
pub mod coplanar;
pub mod crack_point;
pub mod error;
pub mod registry;
pub mod snap;
pub mod tolerance;

pub use calculator::{CalculatorMode, CrackPointCalculator, TargetTransform};
pub use classify::{MatchClassification, Planar, PointClassifier, PointSpace, Spatial};
pub use crack_point::CrackPoint;
pub use error::CrackError;
pub use registry::CrackPointRegistry;
pub use snap::SnapResult;
pub use tolerance::{significance_epsilon, ToleranceModel};
