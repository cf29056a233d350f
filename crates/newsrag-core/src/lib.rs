//! newsrag-core
//!
//! Shared data model, configuration, chunking and corpus storage for the
//! newspaper retrieval engine. The lexical, vector and hybrid crates build on
//! the types and traits defined here.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
