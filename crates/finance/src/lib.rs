//! Finance domain module: payables, receivables, cash boxes and the DRE.
//!
//! Pure logic; callers pass `today`/`now` and persist the results.

pub mod cash;
pub mod dre;
pub mod payable;
pub mod receivable;
pub mod summary;
pub mod title;

pub use cash::{CashBox, CashBoxStatus, CashMovement, CashMovementKind, CashReference, NewCashMovement};
pub use dre::{Dre, DreInput, ExpenseLine, build_dre};
pub use payable::{AccountPayable, NewPayable, PayablePatch};
pub use receivable::{AccountReceivable, Installment, NewReceivable, ReceivablePatch, receivables_for_sale};
pub use summary::{FinancialSummary, OpenCashBox, TitleTotals, financial_summary};
pub use title::{Settlement, Title, TitleFilter, TitleStatus};
