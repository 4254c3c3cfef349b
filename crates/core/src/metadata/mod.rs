//! Music metadata sources and candidate matching.
//!
//! A [`MetadataSource`] turns a normalized query into catalog candidates; the
//! [`CandidateMatcher`] scores those candidates against the original
//! description and keeps the confident ones.

mod discogs;
mod matcher;
mod types;

pub use discogs::DiscogsClient;
pub use matcher::{score_candidate, CandidateMatcher};
pub use types::*;
