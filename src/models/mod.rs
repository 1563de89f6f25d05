pub mod listing;
pub mod vehicle;

pub use listing::*;
pub use vehicle::*;

/// Placeholder title prefix for listings whose page exposes no title.
pub const PLACEHOLDER_TITLE_PREFIX: &str = "Vehículo";
