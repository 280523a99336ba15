pub mod day;
pub mod harvest;
pub mod pending;
pub mod stats;

// Re-export command functions for convenience
pub use day::day;
pub use harvest::{harvest, HarvestParams};
pub use pending::pending;
pub use stats::stats;
