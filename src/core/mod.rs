//! Core module - fundamental types and utilities

pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod project;
pub mod shortid;
pub mod store;

pub use config::Config;
pub use error::QuoteError;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use shortid::ShortIdIndex;
pub use store::{MemoryStore, ProjectStore, QuoteStore};
