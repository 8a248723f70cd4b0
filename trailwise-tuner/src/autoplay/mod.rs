pub mod policy;
pub mod runner;

pub use policy::DecisionStrategy;
pub use runner::{PlayPlan, PlayRecord, run_batch};
