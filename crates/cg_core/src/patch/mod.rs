//! Patch search inputs: candidate generation and patch application.

pub mod apply;
pub mod candidates;

pub use apply::{apply_patch, nearest_valid};
pub use candidates::{heuristic_candidates, suggest_patch_candidates, IssueFlags};
