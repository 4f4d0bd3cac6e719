//! Read-only product source consumed by the checkout core.
//!
//! The storefront's catalog management lives elsewhere; checkout only needs
//! id, name, price, and stock. Prices read here are authoritative at
//! initiation time; carts snapshot them at add time.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{errors::ServiceError, models::Product};

#[derive(Clone, Default)]
pub struct CatalogService {
    products: Arc<DashMap<Uuid, Product>>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a product record.
    pub fn upsert(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn get(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        self.products
            .get(&product_id)
            .map(|p| p.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Checks that the requested quantity is available server-side. Initiation
    /// refuses carts whose lines exceed current stock.
    pub fn ensure_in_stock(&self, product_id: Uuid, quantity: i32) -> Result<Product, ServiceError> {
        let product = self.get(product_id)?;
        if product.stock < quantity {
            return Err(ServiceError::OutOfStock(format!(
                "{} has {} in stock, {} requested",
                product.name, product.stock, quantity
            )));
        }
        Ok(product)
    }

    /// Decrements stock for a placed order.
    pub fn commit_stock(&self, product_id: Uuid, quantity: i32) -> Result<(), ServiceError> {
        let mut entry = self
            .products
            .get_mut(&product_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        if entry.stock < quantity {
            return Err(ServiceError::OutOfStock(format!(
                "{} has {} in stock, {} requested",
                entry.name, entry.stock, quantity
            )));
        }
        entry.stock -= quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Peanut Butter".into(),
            price: dec!(349),
            stock,
        }
    }

    #[test]
    fn get_unknown_product_is_not_found() {
        let catalog = CatalogService::new();
        assert_matches!(
            catalog.get(Uuid::new_v4()),
            Err(ServiceError::NotFound(_))
        );
    }

    #[test]
    fn stock_check_rejects_oversized_quantity() {
        let catalog = CatalogService::new();
        let p = product(2);
        let id = p.id;
        catalog.upsert(p);
        assert!(catalog.ensure_in_stock(id, 2).is_ok());
        assert_matches!(
            catalog.ensure_in_stock(id, 3),
            Err(ServiceError::OutOfStock(_))
        );
    }

    #[test]
    fn commit_stock_decrements() {
        let catalog = CatalogService::new();
        let p = product(5);
        let id = p.id;
        catalog.upsert(p);
        catalog.commit_stock(id, 3).expect("commit");
        assert_eq!(catalog.get(id).expect("get").stock, 2);
        assert_matches!(
            catalog.commit_stock(id, 3),
            Err(ServiceError::OutOfStock(_))
        );
    }
}
