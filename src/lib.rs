//! docrel - A small relational engine layered over a document store
//!
//! This library provides the components of the engine:
//! - Command parsing (lexer, parser, AST)
//! - Storage (typed values, row codec, document store backends)
//! - Query execution (DDL, DML, planner, joins, aggregation)
//! - System catalog and its persistence
//! - TCP server

pub mod catalog;
pub mod error;
pub mod executor;
pub mod server;
pub mod sql;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
