use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use retailpos_core::{DomainError, Page, PageRequest, ProductId, paginate};
use retailpos_inventory::StockLevelKey;
use retailpos_products::{NewProduct, Product, ProductFilter, ProductPatch};

use super::{AppServices, load};
use crate::app::dto::{PosProduct, PosProductQuery};
use crate::app::errors::ServiceError;

/// SKU and barcode must be unique across the whole catalog (inactive products included).
fn ensure_unique(catalog: &[Product], candidate: &Product) -> Result<(), ServiceError> {
    for other in catalog.iter().filter(|p| p.id != candidate.id) {
        if other.sku.eq_ignore_ascii_case(&candidate.sku) {
            return Err(DomainError::conflict(format!("sku '{}' is already in use", candidate.sku)).into());
        }
        if let (Some(a), Some(b)) = (&other.barcode, &candidate.barcode) {
            if a == b {
                return Err(DomainError::conflict(format!("barcode '{b}' is already in use")).into());
            }
        }
    }
    Ok(())
}

impl AppServices {
    pub async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>, ServiceError> {
        let mut products: Vec<Product> = self
            .stores
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(paginate(products, page))
    }

    pub async fn product_categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories: BTreeSet<String> = self
            .stores
            .products
            .list()
            .await?
            .into_iter()
            .filter_map(|p| p.category)
            .collect();
        Ok(categories.into_iter().collect())
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        load(&*self.stores.products, &id.to_string(), "product").await
    }

    pub async fn create_product(&self, input: NewProduct) -> Result<Product, ServiceError> {
        let _gate = self.write_lock().await;
        let product = Product::create(ProductId::new(), input, Utc::now())?;
        ensure_unique(&self.stores.products.list().await?, &product)?;
        self.stores.products.insert(product.clone()).await?;
        info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product, ServiceError> {
        let _gate = self.write_lock().await;
        let mut product = self.get_product(id).await?;
        product.apply_patch(patch, Utc::now())?;
        ensure_unique(&self.stores.products.list().await?, &product)?;
        self.stores.products.update(product.clone()).await?;
        Ok(product)
    }

    /// Soft delete: the product stays for history but can no longer be sold.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ServiceError> {
        let mut product = self.get_product(id).await?;
        product.deactivate(Utc::now());
        self.stores.products.update(product).await?;
        info!(product_id = %id, "product deactivated");
        Ok(())
    }

    /// Active products with their stock at the POS location.
    pub async fn pos_products(&self, query: &PosProductQuery) -> Result<Vec<PosProduct>, ServiceError> {
        let location_id = match query.location_id {
            Some(id) => id,
            None => self.default_location().await?.id,
        };
        let filter = ProductFilter {
            search: query.search.clone(),
            category: None,
            active: Some(true),
        };

        let mut rows = Vec::new();
        for product in self.stores.products.list().await?.into_iter().filter(|p| filter.matches(p)) {
            let key = StockLevelKey::new(product.id, location_id);
            let stock = self
                .stores
                .levels
                .get(&key.to_string())
                .await?
                .map_or(0, |level| level.quantity);
            rows.push(PosProduct {
                id: product.id,
                sku: product.sku,
                barcode: product.barcode,
                name: product.name,
                category: product.category,
                unit: product.unit,
                sale_price: product.sale_price,
                stock,
            });
        }
        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use retailpos_core::{DomainError, Money, PageRequest};
    use retailpos_products::{NewProduct, ProductFilter, ProductPatch};

    use crate::app::errors::ServiceError;
    use crate::app::services::test_support::services;

    pub fn new_product(sku: &str, name: &str, price: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            barcode: None,
            description: None,
            category: Some("Calçados".to_string()),
            brand: None,
            unit: None,
            cost_price: Money::from_cents(price / 2),
            sale_price: Money::from_cents(price),
            min_stock: 2,
            max_stock: None,
        }
    }

    #[tokio::test]
    async fn sku_is_unique_ignoring_case() {
        let services = services();
        services.create_product(new_product("TEN-01", "Tênis", 19_990)).await.unwrap();
        let err = services
            .create_product(new_product("ten-01", "Outro", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn rename_to_taken_sku_conflicts() {
        let services = services();
        services.create_product(new_product("A-1", "A", 100)).await.unwrap();
        let b = services.create_product(new_product("B-1", "B", 100)).await.unwrap();
        let patch = ProductPatch {
            sku: Some("A-1".to_string()),
            ..ProductPatch::default()
        };
        assert!(services.update_product(b.id, patch).await.is_err());
    }

    #[tokio::test]
    async fn delete_is_soft_and_filters_apply() {
        let services = services();
        let sandal = services.create_product(new_product("SAN-1", "Sandália", 5_000)).await.unwrap();
        services.create_product(new_product("BOT-1", "Bota", 25_000)).await.unwrap();
        services.delete_product(sandal.id).await.unwrap();

        assert!(!services.get_product(sandal.id).await.unwrap().active);
        let active = ProductFilter {
            active: Some(true),
            ..ProductFilter::default()
        };
        let page = services.list_products(&active, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].sku, "BOT-1");
        assert_eq!(services.product_categories().await.unwrap(), vec!["Calçados".to_string()]);
    }
}
