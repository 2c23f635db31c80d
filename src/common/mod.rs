//! Shared building blocks: errors, data types, collaborator traits, caching, channels

pub mod cache;
pub mod channels;
pub mod errors;
pub mod traits;
pub mod types;
