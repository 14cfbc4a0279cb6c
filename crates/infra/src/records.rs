//! Collection names and keys for every stored entity.

use retailpos_auth::{Session, User};
use retailpos_core::Entity;
use retailpos_finance::{AccountPayable, AccountReceivable, CashBox, CashMovement};
use retailpos_inventory::{StockLevel, StockLocation, StockMovement};
use retailpos_products::Product;
use retailpos_sales::{PixCharge, Sale, Seller};

use crate::store::Record;

macro_rules! entity_record {
    ($($ty:ty => $collection:literal),+ $(,)?) => {
        $(
            impl Record for $ty {
                const COLLECTION: &'static str = $collection;

                fn key(&self) -> String {
                    Entity::id(self).to_string()
                }
            }
        )+
    };
}

entity_record! {
    User => "users",
    Session => "sessions",
    Product => "products",
    StockLocation => "stock_locations",
    StockLevel => "stock_levels",
    StockMovement => "stock_movements",
    Seller => "sellers",
    Sale => "sales",
    PixCharge => "pix_charges",
    AccountPayable => "accounts_payable",
    AccountReceivable => "accounts_receivable",
    CashBox => "cash_boxes",
    CashMovement => "cash_movements",
}
