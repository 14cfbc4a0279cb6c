//! Behaviour shared by payables and receivables ("titles").

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Money};

/// Title status.
///
/// Only `Pending`, `Paid` and `Cancelled` are ever stored; `Overdue` is
/// derived from the due date when reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    Pending,
    Paid,
    Cancelled,
    Overdue,
}

impl TitleStatus {
    pub fn effective(stored: TitleStatus, due_date: NaiveDate, today: NaiveDate) -> TitleStatus {
        match stored {
            TitleStatus::Pending if due_date < today => TitleStatus::Overdue,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TitleStatus::Pending => "pending",
            TitleStatus::Paid => "paid",
            TitleStatus::Cancelled => "cancelled",
            TitleStatus::Overdue => "overdue",
        }
    }

    /// Still waiting for money, late or not.
    pub fn is_open(self) -> bool {
        matches!(self, TitleStatus::Pending | TitleStatus::Overdue)
    }
}

/// Payment or receipt of a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Settlement {
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Defaults to the title amount.
    #[serde(default)]
    pub amount: Option<Money>,
}

impl Settlement {
    pub(crate) fn resolve(&self, title_amount: Money, today: NaiveDate) -> DomainResult<(NaiveDate, Money)> {
        let amount = self.amount.unwrap_or(title_amount);
        if !amount.is_positive() {
            return Err(DomainError::validation("settled amount must be positive"));
        }
        Ok((self.date.unwrap_or(today), amount.bounded()?))
    }
}

pub trait Title {
    fn stored_status(&self) -> TitleStatus;
    fn due_date(&self) -> NaiveDate;
    fn amount(&self) -> Money;
    /// Supplier or customer name.
    fn counterparty(&self) -> &str;
    fn description(&self) -> &str;
    fn document_number(&self) -> Option<&str>;

    fn effective_status(&self, today: NaiveDate) -> TitleStatus {
        TitleStatus::effective(self.stored_status(), self.due_date(), today)
    }
}

/// List filter for titles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Matched against the effective status, so `overdue` works.
    pub status: Option<TitleStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Case-insensitive match against counterparty, description and document number.
    pub search: Option<String>,
}

impl TitleFilter {
    pub fn matches<T: Title>(&self, title: &T, today: NaiveDate) -> bool {
        if let Some(status) = self.status {
            if title.effective_status(today) != status {
                return false;
            }
        }
        if self.due_from.is_some_and(|from| title.due_date() < from) {
            return false;
        }
        if self.due_to.is_some_and(|to| title.due_date() > to) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let term = term.to_lowercase();
                title.counterparty().to_lowercase().contains(&term)
                    || title.description().to_lowercase().contains(&term)
                    || title
                        .document_number()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

pub(crate) fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) fn positive_amount(amount: Money) -> DomainResult<Money> {
    if !amount.is_positive() {
        return Err(DomainError::validation("amount must be positive"));
    }
    amount.bounded()
}

pub(crate) fn category_or_default(category: Option<String>) -> String {
    optional(category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

pub(crate) const DEFAULT_CATEGORY: &str = "outros";
