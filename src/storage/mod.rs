//! Storage module
//!
//! This module contains everything below the query engine:
//! - Typed values and their text form
//! - The row codec mapping rows to `{id, value}` documents
//! - The document store port and its in-memory and file-backed implementations
//! - Backing collection naming

pub mod codec;
pub mod document;
pub mod file;
pub mod memory;
pub mod naming;
pub mod value;

pub use codec::{KeyGenerator, Row, RowCodec};
pub use document::{Document, DocumentStore};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use value::Value;
