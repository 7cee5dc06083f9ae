//! Query execution module
//!
//! This module contains the execution engine, the access and join planner,
//! and the per-statement executors.

pub mod aggregate;
pub mod condition;
mod ddl;
mod dml;
pub mod engine;
pub mod index;
pub mod join;
pub mod planner;
mod select;

pub use engine::{ExecutionEngine, QueryResult, Session};
pub use planner::{AccessPath, AccessPlan, JoinAlgorithm, JoinProbe, Planner};
