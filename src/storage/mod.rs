pub mod database;
mod records;

pub use database::{Database, PoolConfig, SharedDatabase};
