use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, Money, ProductId};

/// Catalog entry.
///
/// Stock quantities live in the inventory module; `min_stock`/`max_stock` are
/// the defaults new stock levels inherit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub unit: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_price: Money,
    pub sale_price: Money,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub max_stock: Option<i64>,
}

/// Partial update; `None` fields are left untouched.
///
/// Optional text fields clear when given an empty string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<Money>,
    pub sale_price: Option<Money>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub active: Option<bool>,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive match against name, SKU and barcode.
    pub search: Option<String>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

const DEFAULT_UNIT: &str = "un";

fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_sku(sku: &str) -> DomainResult<String> {
    let sku = required("sku", sku)?.to_uppercase();
    if sku.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("sku cannot contain whitespace"));
    }
    Ok(sku)
}

impl Product {
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let product = Self {
            id,
            sku: validate_sku(&input.sku)?,
            barcode: optional(input.barcode),
            name: required("name", &input.name)?,
            description: optional(input.description),
            category: optional(input.category),
            brand: optional(input.brand),
            unit: optional(input.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            cost_price: input.cost_price,
            sale_price: input.sale_price,
            min_stock: input.min_stock,
            max_stock: input.max_stock,
            active: true,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        Ok(product)
    }

    /// Apply a partial update; the product is left unchanged on error.
    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(sku) = patch.sku {
            next.sku = validate_sku(&sku)?;
        }
        if let Some(name) = patch.name {
            next.name = required("name", &name)?;
        }
        if patch.barcode.is_some() {
            next.barcode = optional(patch.barcode);
        }
        if patch.description.is_some() {
            next.description = optional(patch.description);
        }
        if patch.category.is_some() {
            next.category = optional(patch.category);
        }
        if patch.brand.is_some() {
            next.brand = optional(patch.brand);
        }
        if let Some(unit) = patch.unit {
            next.unit = required("unit", &unit)?;
        }
        if let Some(cost) = patch.cost_price {
            next.cost_price = cost;
        }
        if let Some(price) = patch.sale_price {
            next.sale_price = price;
        }
        if let Some(min) = patch.min_stock {
            next.min_stock = min;
        }
        if patch.max_stock.is_some() {
            next.max_stock = patch.max_stock;
        }
        if let Some(active) = patch.active {
            next.active = active;
        }
        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    /// Only active products can go through the POS.
    pub fn can_be_sold(&self) -> bool {
        self.active
    }

    /// Gross margin over the sale price, in basis points.
    pub fn margin_bps(&self) -> i64 {
        (self.sale_price - self.cost_price).ratio_bps(self.sale_price)
    }

    fn validate(&self) -> DomainResult<()> {
        if self.cost_price.is_negative() {
            return Err(DomainError::validation("cost_price cannot be negative"));
        }
        if self.sale_price.is_negative() {
            return Err(DomainError::validation("sale_price cannot be negative"));
        }
        self.cost_price.bounded()?;
        self.sale_price.bounded()?;
        if self.min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }
        if let Some(max) = self.max_stock {
            if max < self.min_stock {
                return Err(DomainError::validation("max_stock must be >= min_stock"));
            }
        }
        Ok(())
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(active) = self.active {
            if product.active != active {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            let same = product
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => product_matches_term(product, term),
            None => true,
        }
    }
}

fn product_matches_term(product: &Product, term: &str) -> bool {
    let term = term.to_lowercase();
    product.name.to_lowercase().contains(&term)
        || product.sku.to_lowercase().contains(&term)
        || product.barcode.as_deref().is_some_and(|b| b == term)
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewProduct {
        NewProduct {
            sku: " cam-001 ".into(),
            name: "Camiseta Básica".into(),
            barcode: Some("7891234567895".into()),
            description: None,
            category: Some("Vestuário".into()),
            brand: Some("   ".into()),
            unit: None,
            cost_price: Money::from_cents(2_000),
            sale_price: Money::from_cents(4_990),
            min_stock: 5,
            max_stock: Some(50),
        }
    }

    #[test]
    fn create_normalizes_fields() {
        let p = Product::create(ProductId::new(), input(), Utc::now()).unwrap();
        assert_eq!(p.sku, "CAM-001");
        assert_eq!(p.unit, "un");
        assert_eq!(p.brand, None);
        assert!(p.active);
    }

    #[test]
    fn create_rejects_invalid_input() {
        let mut bad = input();
        bad.name = " ".into();
        assert!(Product::create(ProductId::new(), bad, Utc::now()).is_err());

        let mut bad = input();
        bad.sale_price = Money::from_cents(-1);
        assert!(Product::create(ProductId::new(), bad, Utc::now()).is_err());

        let mut bad = input();
        bad.max_stock = Some(1);
        assert!(Product::create(ProductId::new(), bad, Utc::now()).is_err());

        let mut bad = input();
        bad.sku = "CAM 001".into();
        assert!(Product::create(ProductId::new(), bad, Utc::now()).is_err());
    }

    #[test]
    fn failed_patch_leaves_product_unchanged() {
        let mut p = Product::create(ProductId::new(), input(), Utc::now()).unwrap();
        let before = p.clone();
        let patch = ProductPatch {
            name: Some("Novo nome".into()),
            min_stock: Some(100),
            ..Default::default()
        };
        assert!(p.apply_patch(patch, Utc::now()).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn patch_clears_optional_text_with_empty_string() {
        let mut p = Product::create(ProductId::new(), input(), Utc::now()).unwrap();
        let patch = ProductPatch {
            category: Some(String::new()),
            sale_price: Some(Money::from_cents(5_990)),
            ..Default::default()
        };
        p.apply_patch(patch, Utc::now()).unwrap();
        assert_eq!(p.category, None);
        assert_eq!(p.sale_price, Money::from_cents(5_990));
    }

    #[test]
    fn margin_in_basis_points() {
        let p = Product::create(ProductId::new(), input(), Utc::now()).unwrap();
        // (49.90 - 20.00) / 49.90 = 59.91%
        assert_eq!(p.margin_bps(), 5_991);
    }

    #[test]
    fn filter_matches_search_category_and_active() {
        let mut p = Product::create(ProductId::new(), input(), Utc::now()).unwrap();
        let by_name = ProductFilter { search: Some("básica".into()), ..Default::default() };
        let by_sku = ProductFilter { search: Some("cam-0".into()), ..Default::default() };
        let by_barcode = ProductFilter { search: Some("7891234567895".into()), ..Default::default() };
        let by_category = ProductFilter { category: Some("vestuário".into()), ..Default::default() };
        let other_category = ProductFilter { category: Some("Calçados".into()), ..Default::default() };
        assert!(by_name.matches(&p));
        assert!(by_sku.matches(&p));
        assert!(by_barcode.matches(&p));
        assert!(by_category.matches(&p));
        assert!(!other_category.matches(&p));

        p.deactivate(Utc::now());
        let only_active = ProductFilter { active: Some(true), ..Default::default() };
        assert!(!only_active.matches(&p));
        assert!(!p.can_be_sold());
    }
}
