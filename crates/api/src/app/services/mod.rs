//! Use-case layer: every operation the routes expose, over the repositories.
//!
//! Read-modify-write operations (stock, checkout, cancellation, cash, sale
//! numbering) take `write_gate` first, so two requests can never interleave
//! between reading a balance and writing the new one.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use retailpos_auth::{Session, User};
use retailpos_core::DomainError;
use retailpos_finance::{AccountPayable, AccountReceivable, CashBox, CashMovement};
use retailpos_infra::store::postgres;
use retailpos_infra::{InMemoryRepository, PostgresRepository, Record, Repository};
use retailpos_inventory::{StockLevel, StockLocation, StockMovement};
use retailpos_products::Product;
use retailpos_sales::{PixCharge, PixMerchant, Sale, Seller};

use crate::app::errors::ServiceError;
use crate::config::ApiConfig;

mod auth;
mod cash;
mod dashboard;
mod finance;
mod inventory;
mod pix;
mod products;
mod sales;
mod seed;
mod users;

pub use auth::spawn_session_sweeper;
pub use dashboard::Dashboard;

/// One repository per collection.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn Repository<User>>,
    pub sessions: Arc<dyn Repository<Session>>,
    pub products: Arc<dyn Repository<Product>>,
    pub locations: Arc<dyn Repository<StockLocation>>,
    pub levels: Arc<dyn Repository<StockLevel>>,
    pub movements: Arc<dyn Repository<StockMovement>>,
    pub sellers: Arc<dyn Repository<Seller>>,
    pub sales: Arc<dyn Repository<Sale>>,
    pub pix_charges: Arc<dyn Repository<PixCharge>>,
    pub payables: Arc<dyn Repository<AccountPayable>>,
    pub receivables: Arc<dyn Repository<AccountReceivable>>,
    pub cash_boxes: Arc<dyn Repository<CashBox>>,
    pub cash_movements: Arc<dyn Repository<CashMovement>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryRepository::new()),
            sessions: Arc::new(InMemoryRepository::new()),
            products: Arc::new(InMemoryRepository::new()),
            locations: Arc::new(InMemoryRepository::new()),
            levels: Arc::new(InMemoryRepository::new()),
            movements: Arc::new(InMemoryRepository::new()),
            sellers: Arc::new(InMemoryRepository::new()),
            sales: Arc::new(InMemoryRepository::new()),
            pix_charges: Arc::new(InMemoryRepository::new()),
            payables: Arc::new(InMemoryRepository::new()),
            receivables: Arc::new(InMemoryRepository::new()),
            cash_boxes: Arc::new(InMemoryRepository::new()),
            cash_movements: Arc::new(InMemoryRepository::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            users: Arc::new(PostgresRepository::new(pool.clone())),
            sessions: Arc::new(PostgresRepository::new(pool.clone())),
            products: Arc::new(PostgresRepository::new(pool.clone())),
            locations: Arc::new(PostgresRepository::new(pool.clone())),
            levels: Arc::new(PostgresRepository::new(pool.clone())),
            movements: Arc::new(PostgresRepository::new(pool.clone())),
            sellers: Arc::new(PostgresRepository::new(pool.clone())),
            sales: Arc::new(PostgresRepository::new(pool.clone())),
            pix_charges: Arc::new(PostgresRepository::new(pool.clone())),
            payables: Arc::new(PostgresRepository::new(pool.clone())),
            receivables: Arc::new(PostgresRepository::new(pool.clone())),
            cash_boxes: Arc::new(PostgresRepository::new(pool.clone())),
            cash_movements: Arc::new(PostgresRepository::new(pool)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub pix_merchant: PixMerchant,
}

impl ServiceSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            session_ttl: Duration::hours(config.session_ttl_hours),
            cookie_secure: config.cookie_secure,
            pix_merchant: config.pix_merchant(),
        }
    }
}

pub struct AppServices {
    stores: Stores,
    settings: ServiceSettings,
    write_gate: Mutex<()>,
}

impl AppServices {
    pub fn new(stores: Stores, settings: ServiceSettings) -> Self {
        Self {
            stores,
            settings,
            write_gate: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }
}

/// Wire stores from configuration, bootstrap the admin and optionally seed demo data.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let stores = match (config.use_persistent_stores, config.database_url.as_deref()) {
        (true, Some(url)) => {
            let pool = postgres::connect(url).await?;
            postgres::ensure_schema(&pool).await?;
            info!("using postgres stores");
            Stores::postgres(pool)
        }
        _ => {
            info!("using in-memory stores");
            Stores::in_memory()
        }
    };

    let services = AppServices::new(stores, ServiceSettings::from_config(config));
    services
        .bootstrap_admin(&config.admin_email, &config.admin_password)
        .await?;
    if config.seed_demo_data {
        services.seed_demo_data().await?;
    }
    Ok(services)
}

/// Fetch by key or fail with `404 <what> not found`.
async fn load<T: Record>(repo: &dyn Repository<T>, key: &str, what: &str) -> Result<T, ServiceError> {
    repo.get(key)
        .await?
        .ok_or_else(|| DomainError::not_found(what).into())
}

/// Insert or replace.
async fn upsert<T: Record>(repo: &dyn Repository<T>, record: T, exists: bool) -> Result<(), ServiceError> {
    if exists {
        repo.update(record).await?;
    } else {
        repo.insert(record).await?;
    }
    Ok(())
}
