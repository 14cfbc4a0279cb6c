//! Demo catalog for local development (`SEED_DEMO_DATA=true`).

use chrono::Utc;
use tracing::info;

use retailpos_core::{Money, UserId};
use retailpos_inventory::{LocationKind, MovementContext, MovementKind, MovementRequest, NewLocation};
use retailpos_products::NewProduct;
use retailpos_sales::NewSeller;

use super::AppServices;
use crate::app::errors::ServiceError;

struct DemoProduct {
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    cost: i64,
    price: i64,
    stock: i64,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct { sku: "CAM-001", name: "Camiseta básica", category: "Vestuário", cost: 1_800, price: 4_990, stock: 40 },
    DemoProduct { sku: "CAL-001", name: "Calça jeans", category: "Vestuário", cost: 6_000, price: 15_990, stock: 15 },
    DemoProduct { sku: "TEN-001", name: "Tênis casual", category: "Calçados", cost: 9_500, price: 22_990, stock: 8 },
    DemoProduct { sku: "MEI-001", name: "Meia algodão", category: "Acessórios", cost: 400, price: 1_290, stock: 2 },
    DemoProduct { sku: "BON-001", name: "Boné", category: "Acessórios", cost: 1_500, price: 3_990, stock: 0 },
];

impl AppServices {
    /// Seed only into an empty catalog, so restarts never duplicate anything.
    pub async fn seed_demo_data(&self) -> Result<(), ServiceError> {
        if !self.stores.products.list().await?.is_empty() {
            info!("catalog not empty; skipping demo data");
            return Ok(());
        }

        let store = self
            .create_location(NewLocation {
                name: "Loja".to_string(),
                kind: LocationKind::Store,
                description: Some("Salão de vendas".to_string()),
                is_default: true,
            })
            .await?;
        self.create_location(NewLocation {
            name: "Depósito".to_string(),
            kind: LocationKind::Warehouse,
            description: None,
            is_default: false,
        })
        .await?;

        for demo in DEMO_PRODUCTS {
            let product = self
                .create_product(NewProduct {
                    sku: demo.sku.to_string(),
                    name: demo.name.to_string(),
                    barcode: None,
                    description: None,
                    category: Some(demo.category.to_string()),
                    brand: None,
                    unit: None,
                    cost_price: Money::from_cents(demo.cost),
                    sale_price: Money::from_cents(demo.price),
                    min_stock: 3,
                    max_stock: Some(50),
                })
                .await?;
            if demo.stock > 0 {
                let _gate = self.write_lock().await;
                self.apply_movement(
                    &product,
                    store.id,
                    MovementRequest::new(MovementKind::In, demo.stock),
                    MovementContext {
                        reason: Some("estoque inicial".to_string()),
                        reference: None,
                        user_id: None,
                    },
                    Utc::now(),
                )
                .await?;
            }
        }

        let admin: Option<UserId> = self.stores.users.list().await?.first().map(|u| u.id);
        self.create_seller(NewSeller {
            name: "Vendedor Demo".to_string(),
            email: Some("vendedor@retailpos.local".to_string()),
            phone: None,
            commission_bps: 300,
            user_id: admin,
        })
        .await?;

        info!(products = DEMO_PRODUCTS.len(), "demo data seeded");
        Ok(())
    }
}
