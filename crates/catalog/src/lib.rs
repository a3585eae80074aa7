//! Catalog pricing boundary.
//!
//! The stock ledger never owns item pricing. It asks a `CatalogPricingResolver`
//! for the price, sell modes and unit weight statistics of an item when a
//! farmer order is folded into a shift's stock.

pub mod pricing;
pub mod resolver;

pub use pricing::{CatalogPricingInfo, SellModes, UnitMode, WEIGHT_VARIABLE_CATEGORIES};
pub use resolver::{CatalogPricingResolver, InMemoryCatalog};
