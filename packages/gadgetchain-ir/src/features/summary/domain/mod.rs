//! Summary domain types

pub mod method_summary;
pub mod points_to;

pub use method_summary::{MethodSummary, SummaryKey};
pub use points_to::PointsTo;
