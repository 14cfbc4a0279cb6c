use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, Money, PayableId};

use crate::title::{
    Settlement, Title, TitleStatus, category_or_default, optional, positive_amount, required,
};

/// Money the store owes a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayable {
    pub id: PayableId,
    pub supplier: String,
    pub description: String,
    pub category: String,
    pub document_number: Option<String>,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: TitleStatus,
    pub paid_at: Option<NaiveDate>,
    pub paid_amount: Option<Money>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayable {
    pub supplier: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayablePatch {
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_number: Option<String>,
    pub amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl AccountPayable {
    pub fn create(id: PayableId, input: NewPayable, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            supplier: required("supplier", &input.supplier)?,
            description: required("description", &input.description)?,
            category: category_or_default(input.category),
            document_number: optional(input.document_number),
            amount: positive_amount(input.amount)?,
            due_date: input.due_date,
            status: TitleStatus::Pending,
            paid_at: None,
            paid_amount: None,
            notes: optional(input.notes),
            created_at: now,
            updated_at: now,
        })
    }

    /// Only pending payables can be edited.
    pub fn apply_patch(&mut self, patch: PayablePatch, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("edit")?;
        let mut next = self.clone();
        if let Some(supplier) = patch.supplier {
            next.supplier = required("supplier", &supplier)?;
        }
        if let Some(description) = patch.description {
            next.description = required("description", &description)?;
        }
        if patch.category.is_some() {
            next.category = category_or_default(patch.category);
        }
        if patch.document_number.is_some() {
            next.document_number = optional(patch.document_number);
        }
        if let Some(amount) = patch.amount {
            next.amount = positive_amount(amount)?;
        }
        if let Some(due) = patch.due_date {
            next.due_date = due;
        }
        if patch.notes.is_some() {
            next.notes = optional(patch.notes);
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Mark as paid and return the amount that left the store.
    pub fn pay(&mut self, settlement: Settlement, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<Money> {
        self.ensure_pending("pay")?;
        let (date, amount) = settlement.resolve(self.amount, today)?;
        self.status = TitleStatus::Paid;
        self.paid_at = Some(date);
        self.paid_amount = Some(amount);
        self.updated_at = now;
        Ok(amount)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = TitleStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Paid payables are part of the books and stay.
    pub fn can_delete(&self) -> bool {
        self.status != TitleStatus::Paid
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != TitleStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cannot {action} a {} payable",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

impl Title for AccountPayable {
    fn stored_status(&self) -> TitleStatus {
        self.status
    }

    fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    fn amount(&self) -> Money {
        self.amount
    }

    fn counterparty(&self) -> &str {
        &self.supplier
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn document_number(&self) -> Option<&str> {
        self.document_number.as_deref()
    }
}

impl Entity for AccountPayable {
    type Id = PayableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::TitleFilter;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn payable() -> AccountPayable {
        AccountPayable::create(
            PayableId::new(),
            NewPayable {
                supplier: "Distribuidora Sul".into(),
                description: "Reposição de camisetas".into(),
                category: None,
                document_number: Some("NF-1001".into()),
                amount: Money::from_cents(150_000),
                due_date: d(10),
                notes: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn create_defaults_category() {
        let p = payable();
        assert_eq!(p.category, "outros");
        assert_eq!(p.status, TitleStatus::Pending);
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        let err = AccountPayable::create(
            PayableId::new(),
            NewPayable {
                supplier: "X".into(),
                description: "Y".into(),
                category: None,
                document_number: None,
                amount: Money::ZERO,
                due_date: d(1),
                notes: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overdue_is_derived_and_filterable() {
        let p = payable();
        assert_eq!(p.effective_status(d(11)), TitleStatus::Overdue);
        let overdue = TitleFilter { status: Some(TitleStatus::Overdue), ..Default::default() };
        assert!(overdue.matches(&p, d(11)));
        assert!(!overdue.matches(&p, d(10)));
        let by_doc = TitleFilter { search: Some("nf-10".into()), ..Default::default() };
        assert!(by_doc.matches(&p, d(1)));
        let window = TitleFilter { due_from: Some(d(11)), ..Default::default() };
        assert!(!window.matches(&p, d(1)));
    }

    #[test]
    fn pay_then_edit_and_cancel_conflict() {
        let mut p = payable();
        let paid = p
            .pay(Settlement { date: Some(d(9)), amount: None }, d(12), Utc::now())
            .unwrap();
        assert_eq!(paid, Money::from_cents(150_000));
        assert_eq!(p.paid_at, Some(d(9)));
        assert_eq!(p.effective_status(d(30)), TitleStatus::Paid);
        assert!(!p.can_delete());
        assert!(matches!(p.cancel(Utc::now()), Err(DomainError::Conflict(_))));
        assert!(p.apply_patch(PayablePatch::default(), Utc::now()).is_err());
        assert!(p.pay(Settlement::default(), d(12), Utc::now()).is_err());
    }

    #[test]
    fn overdue_payable_can_still_be_paid() {
        let mut p = payable();
        assert!(p.pay(Settlement::default(), d(20), Utc::now()).is_ok());
        assert_eq!(p.paid_at, Some(d(20)));
    }

    #[test]
    fn cancelled_payable_can_be_deleted() {
        let mut p = payable();
        p.cancel(Utc::now()).unwrap();
        assert!(p.can_delete());
    }
}
