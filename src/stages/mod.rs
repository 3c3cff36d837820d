pub mod aggregator;
pub mod context;
pub mod discretizer;
pub mod evaluator;
pub mod filter;
pub mod representation;
