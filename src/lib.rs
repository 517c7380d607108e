//! Pump Quote: deal tracking and quoting for pump equipment
//!
//! Deals, quote revisions and their priced options live as plain YAML
//! files in a project directory, next to a reference catalog of pumps,
//! products and mounting accessories.

pub mod cli;
pub mod core;
pub mod entities;
pub mod export;
pub mod pricing;
