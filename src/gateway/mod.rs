mod executor;
mod outcome;

pub use executor::{ExecutionGateway, DEFAULT_SLOW_THRESHOLD};
pub use outcome::ExecutionOutcome;
