use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use farmstock_core::{DomainError, DomainResult, ItemId};

use crate::pricing::CatalogPricingInfo;

/// Synchronous catalog lookup used by the stock line builder.
///
/// An item the catalog cannot price resolves to
/// `DomainError::PricingUnresolved`, never to a zero price.
pub trait CatalogPricingResolver: Send + Sync {
    fn resolve(&self, item_id: ItemId) -> DomainResult<CatalogPricingInfo>;
}

impl<R> CatalogPricingResolver for Arc<R>
where
    R: CatalogPricingResolver + ?Sized,
{
    fn resolve(&self, item_id: ItemId) -> DomainResult<CatalogPricingInfo> {
        (**self).resolve(item_id)
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<ItemId, CatalogPricingInfo>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, info: CatalogPricingInfo) -> DomainResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        items.insert(info.item_id, info);
        Ok(())
    }
}

impl CatalogPricingResolver for InMemoryCatalog {
    fn resolve(&self, item_id: ItemId) -> DomainResult<CatalogPricingInfo> {
        let items = self
            .items
            .read()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        items
            .get(&item_id)
            .cloned()
            .ok_or(DomainError::PricingUnresolved(item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_item_is_pricing_unresolved() {
        let catalog = InMemoryCatalog::new();
        let item_id = ItemId::new();
        assert_eq!(
            catalog.resolve(item_id).unwrap_err(),
            DomainError::PricingUnresolved(item_id)
        );
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let catalog = InMemoryCatalog::new();
        let item_id = ItemId::new();
        catalog.upsert(CatalogPricingInfo::new(item_id, "Carrot", "vegetables")).unwrap();
        catalog
            .upsert(CatalogPricingInfo {
                price_per_kg: Some(4.5),
                ..CatalogPricingInfo::new(item_id, "Carrot", "vegetables")
            })
            .unwrap();

        assert_eq!(catalog.resolve(item_id).unwrap().price_per_kg, Some(4.5));
    }

    #[test]
    fn upsert_on_poisoned_catalog_is_an_error() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let poisoner = catalog.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.items.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        let item_id = ItemId::new();
        let err = catalog
            .upsert(CatalogPricingInfo::new(item_id, "Leek", "vegetables"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(catalog.resolve(item_id).is_err());
    }
}
