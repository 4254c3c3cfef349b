//! Text normalization and fuzzy comparison.
//!
//! Every comparison made by the matcher and the selection pipeline goes
//! through [`normalize`] first, and through [`similarity_ratio`] second.

mod normalize;
mod similarity;

pub use normalize::{normalize, SearchKey};
pub use similarity::similarity_ratio;
