//! Quality Gate Evaluator

mod evaluator;

pub use evaluator::GateEvaluator;
