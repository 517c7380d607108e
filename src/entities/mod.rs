//! Entity type definitions
//!
//! - [`Deal`] - Sales opportunity tracked through pipeline stages
//! - [`QuoteRevision`] - Versioned pricing offered to one recipient
//! - [`QuoteOption`] - One priced configuration within a revision
//! - [`LineItem`] - Catalog product, custom entry or synthesized accessory
//! - [`Catalog`] - Reference parts, price adders, pumps and products

pub mod catalog;
pub mod deal;
pub mod quote;

pub use catalog::{Catalog, CatalogPart, CatalogSource, ProjectCatalog};
pub use deal::{Deal, DealStage, DealType, AustralianState};
pub use quote::{AccessoryKind, LineItem, LineSource, QuoteOption, QuoteRevision};
