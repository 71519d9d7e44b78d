pub mod equity;
pub mod error;
pub mod indices;

#[cfg(test)]
pub(crate) mod fakes;

pub use equity::EquityOrchestrator;
pub use error::EquityError;
pub use indices::{IndexAggregator, MAJOR_INDICES};
