//! rag-core - Core types and traits for the retrieval pipeline
//!
//! This crate provides the domain types, configuration, error handling and
//! capability traits shared by every other crate in the workspace, plus the
//! immutable [`Corpus`] snapshot requests are served from.

pub mod config;
pub mod corpus;
pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use config::*;
pub use corpus::{ChunkRecord, Corpus};
pub use error::{RagError, Result};
pub use traits::*;
pub use types::*;
