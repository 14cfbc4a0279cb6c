use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, LocationId};

/// What kind of place holds the stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    #[default]
    Store,
    Warehouse,
    Other,
}

/// A place stock is kept (sales floor, back room, warehouse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLocation {
    pub id: LocationId,
    pub name: String,
    pub kind: LocationKind,
    pub description: Option<String>,
    /// Where the POS takes stock from when a sale names no location.
    pub is_default: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub kind: Option<LocationKind>,
    pub description: Option<String>,
    pub is_default: Option<bool>,
    pub active: Option<bool>,
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("location name cannot be empty"));
    }
    Ok(name.to_string())
}

impl StockLocation {
    pub fn create(id: LocationId, input: NewLocation, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: validate_name(&input.name)?,
            kind: input.kind,
            description: input.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            is_default: input.is_default,
            active: true,
            created_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: LocationPatch) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = validate_name(&name)?;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(description) = patch.description {
            let description = description.trim().to_string();
            self.description = (!description.is_empty()).then_some(description);
        }
        if let Some(is_default) = patch.is_default {
            self.is_default = is_default;
        }
        if let Some(active) = patch.active {
            if !active && self.is_default {
                return Err(DomainError::invariant("the default location cannot be deactivated"));
            }
            self.active = active;
        }
        Ok(())
    }

    pub fn same_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}

impl Entity for StockLocation {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
