use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use retailpos_core::{DomainError, LocationId, MovementId, Page, PageRequest, ProductId, UserId, paginate};
use retailpos_inventory::{
    LocationPatch, MovementContext, MovementKind, MovementRequest, NewLocation, StockAlert, StockLevel,
    StockLevelKey, StockLocation, StockMovement, Thresholds, alert_for,
};
use retailpos_products::Product;

use super::{AppServices, load, upsert};
use crate::app::dto::{LevelFilter, MovementFilter, MovementInput, StockAlertView, StockLevelView, ThresholdsInput, TransferInput};
use crate::app::errors::ServiceError;

struct StagedMovement {
    level: StockLevel,
    exists: bool,
    movement: StockMovement,
}

impl AppServices {
    pub async fn list_locations(&self) -> Result<Vec<StockLocation>, ServiceError> {
        let mut locations = self.stores.locations.list().await?;
        locations.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
        Ok(locations)
    }

    pub async fn default_location(&self) -> Result<StockLocation, ServiceError> {
        self.stores
            .locations
            .list()
            .await?
            .into_iter()
            .find(|l| l.is_default && l.active)
            .ok_or_else(|| DomainError::not_found("default location").into())
    }

    /// The first location becomes the default; a new default demotes the old one.
    pub async fn create_location(&self, mut input: NewLocation) -> Result<StockLocation, ServiceError> {
        let _gate = self.write_lock().await;
        let existing = self.stores.locations.list().await?;
        if existing.iter().any(|l| l.same_name(&input.name)) {
            return Err(DomainError::conflict(format!("location '{}' already exists", input.name.trim())).into());
        }
        if existing.is_empty() {
            input.is_default = true;
        }
        let location = StockLocation::create(LocationId::new(), input, Utc::now())?;
        if location.is_default {
            self.demote_defaults(&existing, location.id).await?;
        }
        self.stores.locations.insert(location.clone()).await?;
        info!(location_id = %location.id, name = %location.name, "stock location created");
        Ok(location)
    }

    pub async fn update_location(&self, id: LocationId, patch: LocationPatch) -> Result<StockLocation, ServiceError> {
        let _gate = self.write_lock().await;
        let existing = self.stores.locations.list().await?;
        let mut location = existing
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("location"))?;

        if location.is_default && patch.is_default == Some(false) {
            return Err(DomainError::invariant("choose another default location instead of unsetting this one").into());
        }
        if let Some(name) = patch.name.as_deref() {
            if existing.iter().any(|l| l.id != id && l.same_name(name)) {
                return Err(DomainError::conflict(format!("location '{}' already exists", name.trim())).into());
            }
        }
        let becomes_default = !location.is_default && patch.is_default == Some(true);
        location.apply_patch(patch)?;
        if becomes_default {
            self.demote_defaults(&existing, id).await?;
        }
        self.stores.locations.update(location.clone()).await?;
        Ok(location)
    }

    /// Rejected while the location is the default or still holds stock.
    pub async fn delete_location(&self, id: LocationId) -> Result<(), ServiceError> {
        let _gate = self.write_lock().await;
        let location = load(&*self.stores.locations, &id.to_string(), "location").await?;
        if location.is_default {
            return Err(DomainError::conflict("the default location cannot be deleted").into());
        }
        let levels: Vec<StockLevel> = self
            .stores
            .levels
            .list()
            .await?
            .into_iter()
            .filter(|l| l.location_id() == id)
            .collect();
        if levels.iter().any(|l| l.quantity != 0) {
            return Err(DomainError::conflict(format!("location '{}' still holds stock", location.name)).into());
        }
        for level in &levels {
            self.stores.levels.delete(&level.key.to_string()).await?;
        }
        self.stores.locations.delete(&id.to_string()).await?;
        info!(location_id = %id, "stock location deleted");
        Ok(())
    }

    async fn demote_defaults(&self, locations: &[StockLocation], keep: LocationId) -> Result<(), ServiceError> {
        for other in locations.iter().filter(|l| l.is_default && l.id != keep) {
            let mut other = other.clone();
            other.is_default = false;
            self.stores.locations.update(other).await?;
        }
        Ok(())
    }

    pub async fn list_levels(&self, filter: &LevelFilter, page: PageRequest) -> Result<Page<StockLevelView>, ServiceError> {
        let products = self.product_index().await?;
        let locations = self.location_names().await?;

        let mut rows: Vec<StockLevelView> = self
            .stores
            .levels
            .list()
            .await?
            .into_iter()
            .filter(|l| filter.product_id.is_none_or(|p| l.product_id() == p))
            .filter(|l| filter.location_id.is_none_or(|loc| l.location_id() == loc))
            .filter_map(|level| {
                let product = products.get(&level.product_id())?;
                let alert = alert_for(&level);
                if filter.alerts_only == Some(true) && alert.is_none() {
                    return None;
                }
                Some(StockLevelView {
                    sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    location_name: locations.get(&level.location_id()).cloned().unwrap_or_default(),
                    alert,
                    level,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.product_name.cmp(&b.product_name).then_with(|| a.location_name.cmp(&b.location_name)));
        Ok(paginate(rows, page))
    }

    /// Set min/max for one product at one location, creating the level if needed.
    pub async fn set_level_thresholds(
        &self,
        product_id: ProductId,
        location_id: LocationId,
        input: ThresholdsInput,
    ) -> Result<StockLevel, ServiceError> {
        let thresholds = Thresholds::new(input.min_quantity, input.max_quantity)?;
        let _gate = self.write_lock().await;
        let product = self.get_product(product_id).await?;
        load(&*self.stores.locations, &location_id.to_string(), "location").await?;

        let now = Utc::now();
        let (mut level, exists) = self.level_for(&product, location_id, now).await?;
        level.set_thresholds(thresholds, now);
        upsert(&*self.stores.levels, level.clone(), exists).await?;
        Ok(level)
    }

    pub async fn list_movements(&self, filter: &MovementFilter, page: PageRequest) -> Result<Page<StockMovement>, ServiceError> {
        let mut movements: Vec<StockMovement> = self
            .stores
            .movements
            .list()
            .await?
            .into_iter()
            .filter(|m| filter.product_id.is_none_or(|p| m.product_id == p))
            .filter(|m| filter.location_id.is_none_or(|l| m.location_id == l))
            .filter(|m| filter.kind.is_none_or(|k| m.kind == k))
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(paginate(movements, page))
    }

    /// Manual `in`, `out` or `adjustment`. Transfers go through [`Self::transfer_stock`].
    pub async fn record_movement(&self, input: MovementInput, user_id: UserId) -> Result<StockMovement, ServiceError> {
        if matches!(input.kind, MovementKind::TransferIn | MovementKind::TransferOut) {
            return Err(DomainError::validation("use the transfer endpoint to move stock between locations").into());
        }
        let _gate = self.write_lock().await;
        let product = self.get_product(input.product_id).await?;
        let location_id = match input.location_id {
            Some(id) => load(&*self.stores.locations, &id.to_string(), "location").await?.id,
            None => self.default_location().await?.id,
        };

        let movement = self
            .apply_movement(
                &product,
                location_id,
                MovementRequest::new(input.kind, input.quantity),
                MovementContext {
                    reason: input.reason,
                    reference: input.reference,
                    user_id: Some(user_id),
                },
                Utc::now(),
            )
            .await?;
        info!(
            product_id = %movement.product_id,
            kind = movement.kind.as_str(),
            delta = movement.delta,
            balance = movement.balance_after,
            "stock movement recorded"
        );
        Ok(movement)
    }

    /// `transfer_out` at the source and `transfer_in` at the destination, sharing a reference.
    pub async fn transfer_stock(&self, input: TransferInput, user_id: UserId) -> Result<Vec<StockMovement>, ServiceError> {
        if input.from_location_id == input.to_location_id {
            return Err(DomainError::validation("source and destination must differ").into());
        }
        let _gate = self.write_lock().await;
        let product = self.get_product(input.product_id).await?;
        let from = load(&*self.stores.locations, &input.from_location_id.to_string(), "location").await?;
        let to = load(&*self.stores.locations, &input.to_location_id.to_string(), "location").await?;
        if !to.active {
            return Err(DomainError::invariant(format!("location '{}' is inactive", to.name)).into());
        }

        let now = Utc::now();
        let out_id = MovementId::new();
        let reference = format!("TRF-{}", out_id.as_uuid().simple());
        let context = MovementContext {
            reason: input.reason,
            reference: Some(reference),
            user_id: Some(user_id),
        };

        // Both sides are resolved before either is written.
        let out = self
            .stage_movement(
                out_id,
                &product,
                from.id,
                MovementRequest::new(MovementKind::TransferOut, input.quantity),
                context.clone(),
                now,
            )
            .await?;
        let incoming = self
            .stage_movement(
                MovementId::new(),
                &product,
                to.id,
                MovementRequest::new(MovementKind::TransferIn, input.quantity),
                context,
                now,
            )
            .await?;
        let out = self.commit_movement(out).await?;
        let incoming = self.commit_movement(incoming).await?;
        info!(product_id = %product.id, from = %from.name, to = %to.name, quantity = input.quantity, "stock transferred");
        Ok(vec![out, incoming])
    }

    /// Alerts for active products, most severe first.
    pub async fn stock_alerts(&self) -> Result<Vec<StockAlertView>, ServiceError> {
        let products = self.product_index().await?;
        let locations = self.location_names().await?;

        let mut alerts: Vec<StockAlertView> = self
            .stores
            .levels
            .list()
            .await?
            .iter()
            .filter_map(StockAlert::from_level)
            .filter_map(|alert| {
                let product = products.get(&alert.product_id).filter(|p| p.active)?;
                Some(StockAlertView {
                    product_id: alert.product_id,
                    sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    location_id: alert.location_id,
                    location_name: locations.get(&alert.location_id).cloned().unwrap_or_default(),
                    kind: alert.kind,
                    quantity: alert.quantity,
                    min_quantity: alert.min_quantity,
                    max_quantity: alert.max_quantity,
                })
            })
            .collect();
        alerts.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.product_name.cmp(&b.product_name)));
        Ok(alerts)
    }

    /// Current level, or an empty one seeded from the product thresholds. The
    /// flag tells whether it is already stored.
    pub(super) async fn level_for(
        &self,
        product: &Product,
        location_id: LocationId,
        now: DateTime<Utc>,
    ) -> Result<(StockLevel, bool), ServiceError> {
        let key = StockLevelKey::new(product.id, location_id);
        match self.stores.levels.get(&key.to_string()).await? {
            Some(level) => Ok((level, true)),
            None => {
                let thresholds = Thresholds::new(product.min_stock, product.max_stock)?;
                Ok((StockLevel::empty(key, thresholds, now), false))
            }
        }
    }

    /// Apply one movement and persist level and record. Callers hold the write gate.
    pub(super) async fn apply_movement(
        &self,
        product: &Product,
        location_id: LocationId,
        request: MovementRequest,
        context: MovementContext,
        now: DateTime<Utc>,
    ) -> Result<StockMovement, ServiceError> {
        let staged = self
            .stage_movement(MovementId::new(), product, location_id, request, context, now)
            .await?;
        self.commit_movement(staged).await
    }

    /// Validate a movement against the current level without writing anything.
    async fn stage_movement(
        &self,
        id: MovementId,
        product: &Product,
        location_id: LocationId,
        request: MovementRequest,
        context: MovementContext,
        now: DateTime<Utc>,
    ) -> Result<StagedMovement, ServiceError> {
        let (mut level, exists) = self.level_for(product, location_id, now).await?;
        let movement = StockMovement::apply(id, &mut level, request, context, now)?;
        Ok(StagedMovement { level, exists, movement })
    }

    async fn commit_movement(&self, staged: StagedMovement) -> Result<StockMovement, ServiceError> {
        upsert(&*self.stores.levels, staged.level, staged.exists).await?;
        self.stores.movements.insert(staged.movement.clone()).await?;
        Ok(staged.movement)
    }

    pub(super) async fn product_index(&self) -> Result<HashMap<ProductId, Product>, ServiceError> {
        Ok(self
            .stores
            .products
            .list()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    async fn location_names(&self) -> Result<HashMap<LocationId, String>, ServiceError> {
        Ok(self
            .stores
            .locations
            .list()
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use retailpos_core::{DomainError, PageRequest, UserId};
    use retailpos_inventory::{AlertKind, LocationKind, LocationPatch, MovementKind, NewLocation};

    use crate::app::dto::{LevelFilter, MovementFilter, MovementInput, TransferInput};
    use crate::app::errors::ServiceError;
    use crate::app::services::products::tests::new_product;
    use crate::app::services::test_support::services;

    fn location(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            kind: LocationKind::Store,
            description: None,
            is_default: false,
        }
    }

    fn movement(product_id: retailpos_core::ProductId, kind: MovementKind, quantity: i64) -> MovementInput {
        MovementInput {
            product_id,
            location_id: None,
            kind,
            quantity,
            reason: None,
            reference: None,
        }
    }

    #[tokio::test]
    async fn first_location_is_default_and_default_moves() {
        let services = services();
        let loja = services.create_location(location("Loja")).await.unwrap();
        assert!(loja.is_default);
        let deposito = services.create_location(location("Depósito")).await.unwrap();
        assert!(!deposito.is_default);

        let patch = LocationPatch {
            is_default: Some(true),
            ..LocationPatch::default()
        };
        services.update_location(deposito.id, patch).await.unwrap();
        assert_eq!(services.default_location().await.unwrap().id, deposito.id);
        assert_eq!(services.list_locations().await.unwrap().iter().filter(|l| l.is_default).count(), 1);
    }

    #[tokio::test]
    async fn movements_update_levels_and_never_go_negative() {
        let services = services();
        services.create_location(location("Loja")).await.unwrap();
        let product = services.create_product(new_product("CAM-1", "Camisa", 8_000)).await.unwrap();
        let user = UserId::new();

        let first = services.record_movement(movement(product.id, MovementKind::In, 10), user).await.unwrap();
        assert_eq!(first.balance_after, 10);
        let counted = services
            .record_movement(movement(product.id, MovementKind::Adjustment, 7), user)
            .await
            .unwrap();
        assert_eq!(counted.delta, -3);

        let err = services
            .record_movement(movement(product.id, MovementKind::Out, 8), user)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));

        let levels = services.list_levels(&LevelFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(levels.items[0].level.quantity, 7);
        assert_eq!(levels.items[0].level.min_quantity, 2);
        let history = services
            .list_movements(&MovementFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total, 2);
    }

    #[tokio::test]
    async fn transfer_moves_stock_and_blocks_location_delete() {
        let services = services();
        let loja = services.create_location(location("Loja")).await.unwrap();
        let deposito = services.create_location(location("Depósito")).await.unwrap();
        let product = services.create_product(new_product("CAL-1", "Calça", 12_000)).await.unwrap();
        let user = UserId::new();
        services.record_movement(movement(product.id, MovementKind::In, 5), user).await.unwrap();

        let pair = services
            .transfer_stock(
                TransferInput {
                    product_id: product.id,
                    from_location_id: loja.id,
                    to_location_id: deposito.id,
                    quantity: 2,
                    reason: None,
                },
                user,
            )
            .await
            .unwrap();
        assert_eq!(pair[0].kind, MovementKind::TransferOut);
        assert_eq!(pair[1].balance_after, 2);
        assert_eq!(pair[0].reference, pair[1].reference);

        let err = services.delete_location(deposito.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert!(services.delete_location(loja.id).await.is_err());
    }

    #[tokio::test]
    async fn failed_transfer_leaves_the_source_untouched() {
        let services = services();
        let loja = services.create_location(location("Loja")).await.unwrap();
        let deposito = services.create_location(location("Depósito")).await.unwrap();
        let product = services.create_product(new_product("BON-1", "Boné", 4_000)).await.unwrap();
        let user = UserId::new();
        services.record_movement(movement(product.id, MovementKind::In, 5), user).await.unwrap();
        let full = MovementInput {
            location_id: Some(deposito.id),
            ..movement(product.id, MovementKind::In, i64::MAX)
        };
        services.record_movement(full, user).await.unwrap();

        let err = services
            .transfer_stock(
                TransferInput {
                    product_id: product.id,
                    from_location_id: loja.id,
                    to_location_id: deposito.id,
                    quantity: 2,
                    reason: None,
                },
                user,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let at_loja = LevelFilter {
            location_id: Some(loja.id),
            ..LevelFilter::default()
        };
        let levels = services.list_levels(&at_loja, PageRequest::default()).await.unwrap();
        assert_eq!(levels.items[0].level.quantity, 5);
        let history = services
            .list_movements(&MovementFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total, 2);
    }

    #[tokio::test]
    async fn low_stock_alert_is_inclusive() {
        let services = services();
        services.create_location(location("Loja")).await.unwrap();
        let product = services.create_product(new_product("MEI-1", "Meia", 1_500)).await.unwrap();
        services
            .record_movement(movement(product.id, MovementKind::In, 2), UserId::new())
            .await
            .unwrap();

        let alerts = services.stock_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowStock);
        assert_eq!(alerts[0].sku, "MEI-1");
    }
}
