//! Resolution strategy generation and phased planning

mod generator;
mod planner;

pub use generator::{FileContext, PolicyContext, StrategyGenerator, minutes_for};
pub use planner::{
    ClassifiedIssue, assign_phase, success_probability, topological_order, validate_plan,
};
