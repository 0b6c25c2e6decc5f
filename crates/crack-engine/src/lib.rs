//! Orchestration and materialization for topology cracking.
//!
//! Drives the pairwise crack-point work across a selection of features and
//! their neighbors, accumulates the results per feature, and applies them:
//! vertex insertion, moves and deletions, line splitting for cutting tools,
//! and weeding of redundant vertices.

pub mod error;
pub mod materialize;
pub mod orchestrator;
pub mod split;
pub mod vertex_info;
pub mod weed;

pub use error::EngineError;
pub use materialize::{MaterializeOptions, MaterializeStats};
pub use orchestrator::{CancellationToken, CrackOrchestrator};
pub use split::{ordered_chop_points, split_path, split_polyline};
pub use vertex_info::FeatureVertexInfo;
pub use weed::weed_points;
