pub mod aggregator;
pub mod assessor;
pub mod classifier;
