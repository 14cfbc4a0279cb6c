use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, Money, SellerId, UserId};

/// Salesperson credited with sales and paid a commission on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Commission in basis points of the sale total (500 = 5%).
    pub commission_bps: u32,
    pub user_id: Option<UserId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSeller {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub commission_bps: u32,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub commission_bps: Option<u32>,
    pub active: Option<bool>,
}

const MAX_COMMISSION_BPS: u32 = 10_000;

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("seller name cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_commission(bps: u32) -> DomainResult<u32> {
    if bps > MAX_COMMISSION_BPS {
        return Err(DomainError::validation("commission_bps must be between 0 and 10000"));
    }
    Ok(bps)
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Seller {
    pub fn create(id: SellerId, input: NewSeller, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: validate_name(&input.name)?,
            email: clean(input.email),
            phone: clean(input.phone),
            commission_bps: validate_commission(input.commission_bps)?,
            user_id: input.user_id,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: SellerPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let commission = patch.commission_bps.map(validate_commission).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(bps) = commission {
            self.commission_bps = bps;
        }
        if patch.email.is_some() {
            self.email = clean(patch.email);
        }
        if patch.phone.is_some() {
            self.phone = clean(patch.phone);
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    pub fn commission_on(&self, amount: Money) -> Money {
        amount.percent_bps(self.commission_bps)
    }
}

impl Entity for Seller {
    type Id = SellerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
