use chrono::Utc;
use tracing::info;

use retailpos_sales::{PixCharge, PixTxId};

use super::{AppServices, load};
use crate::app::dto::{CreatePixRequest, PixChargeView};
use crate::app::errors::ServiceError;

impl AppServices {
    pub async fn create_pix_charge(&self, input: CreatePixRequest) -> Result<PixChargeView, ServiceError> {
        let now = Utc::now();
        let charge = PixCharge::create(&self.settings.pix_merchant, input.amount, input.description, now)?;
        self.stores.pix_charges.insert(charge.clone()).await?;
        info!(txid = %charge.txid, amount = %charge.amount, "PIX charge created");
        Ok(PixChargeView::at(charge, now))
    }

    pub async fn get_pix_charge(&self, txid: &PixTxId) -> Result<PixChargeView, ServiceError> {
        let charge = load(&*self.stores.pix_charges, txid.as_str(), "PIX charge").await?;
        Ok(PixChargeView::at(charge, Utc::now()))
    }

    /// Simulated payment notification.
    pub async fn confirm_pix_charge(&self, txid: &PixTxId) -> Result<PixChargeView, ServiceError> {
        let _gate = self.write_lock().await;
        let now = Utc::now();
        let mut charge = load(&*self.stores.pix_charges, txid.as_str(), "PIX charge").await?;
        charge.confirm(now)?;
        self.stores.pix_charges.update(charge.clone()).await?;
        info!(txid = %txid, "PIX charge confirmed");
        Ok(PixChargeView::at(charge, now))
    }
}

#[cfg(test)]
mod tests {
    use retailpos_core::{DomainError, Money, UserId};
    use retailpos_sales::{PaymentMethod, PixChargeStatus, PixTxId};

    use crate::app::dto::CreatePixRequest;
    use crate::app::errors::ServiceError;
    use crate::app::services::sales::tests::{pay, request, shop};

    #[tokio::test]
    async fn pix_sale_requires_a_confirmed_charge_of_the_same_amount() {
        let (services, product) = shop(2).await;
        let charge = services
            .create_pix_charge(CreatePixRequest {
                amount: Money::from_cents(20_000),
                description: Some("Venda balcão".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(charge.status, PixChargeStatus::Pending);
        assert!(charge.payload.starts_with("000201"));
        let txid = PixTxId::parse(&charge.txid).unwrap();

        let mut payment = pay(PaymentMethod::Pix, None, None);
        payment.pix_txid = Some(txid.clone());
        let unpaid = services
            .checkout(request(&product, 1, payment.clone()), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(unpaid, ServiceError::Domain(DomainError::InvariantViolation(_))));

        let confirmed = services.confirm_pix_charge(&txid).await.unwrap();
        assert_eq!(confirmed.status, PixChargeStatus::Paid);

        let wrong_amount = services
            .checkout(request(&product, 2, payment.clone()), UserId::new())
            .await;
        assert!(wrong_amount.is_err());

        let sale = services
            .checkout(request(&product, 1, payment), UserId::new())
            .await
            .unwrap();
        assert_eq!(services.get_pix_charge(&txid).await.unwrap().sale_id, Some(sale.id));
    }

    #[tokio::test]
    async fn unknown_charge_is_not_found() {
        let (services, _) = shop(1).await;
        let txid = PixTxId::generate();
        let err = services.get_pix_charge(&txid).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }
}
