//! PIX instant-payment charges and their "copia e cola" BR Code payload.
//!
//! There is no PSP integration: a charge is confirmed explicitly, which
//! stands in for the bank webhook.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use retailpos_core::{DomainError, DomainResult, Entity, Money, SaleId};

pub const CHARGE_TTL_MINUTES: i64 = 30;
const TXID_LEN: usize = 25;
const GUI: &str = "br.gov.bcb.pix";
/// EMV lengths are two decimal digits.
const FIELD_MAX_LEN: usize = 99;
/// Longest key whose merchant account template (tag 26) still fits one field.
pub const PIX_KEY_MAX_LEN: usize = FIELD_MAX_LEN - (4 + GUI.len()) - 4;

/// Transaction id of a charge: 25 uppercase alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixTxId(String);

impl PixTxId {
    pub fn generate() -> Self {
        let raw = Uuid::now_v7().simple().to_string().to_uppercase();
        Self(raw.chars().rev().take(TXID_LEN).collect())
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= TXID_LEN
            && raw.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !valid {
            return Err(DomainError::invalid_id(format!("invalid PIX txid '{raw}'")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PixTxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receiving account data embedded in every payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixMerchant {
    pub key: String,
    pub name: String,
    pub city: String,
}

impl PixMerchant {
    pub fn validate(&self) -> DomainResult<()> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(DomainError::validation("PIX key is required"));
        }
        if key.len() > PIX_KEY_MAX_LEN {
            return Err(DomainError::validation(format!(
                "PIX key must be at most {PIX_KEY_MAX_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixChargeStatus {
    Pending,
    Paid,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixCharge {
    pub txid: PixTxId,
    pub amount: Money,
    pub description: Option<String>,
    pub payload: String,
    /// Stored status; expiry is derived in [`PixCharge::effective_status`].
    pub status: PixChargeStatus,
    pub sale_id: Option<SaleId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PixCharge {
    pub fn create(
        merchant: &PixMerchant,
        amount: Money,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !amount.is_positive() {
            return Err(DomainError::validation("PIX amount must be positive"));
        }
        let txid = PixTxId::generate();
        let payload = build_payload(merchant, amount, &txid)?;
        Ok(Self {
            txid,
            amount,
            description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            payload,
            status: PixChargeStatus::Pending,
            sale_id: None,
            created_at: now,
            expires_at: now + Duration::minutes(CHARGE_TTL_MINUTES),
            paid_at: None,
        })
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> PixChargeStatus {
        match self.status {
            PixChargeStatus::Pending if now >= self.expires_at => PixChargeStatus::Expired,
            other => other,
        }
    }

    /// Mark as paid. Confirming twice is a no-op; an expired charge cannot be paid.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.effective_status(now) {
            PixChargeStatus::Paid => Ok(()),
            PixChargeStatus::Expired => Err(DomainError::invariant(format!("PIX charge {} has expired", self.txid))),
            PixChargeStatus::Pending => {
                self.status = PixChargeStatus::Paid;
                self.paid_at = Some(now);
                Ok(())
            }
        }
    }

    /// Bind a paid charge to the sale it settles.
    pub fn attach_to_sale(&mut self, sale_id: SaleId, amount: Money) -> DomainResult<()> {
        if self.status != PixChargeStatus::Paid {
            return Err(DomainError::invariant(format!("PIX charge {} is not paid", self.txid)));
        }
        if self.amount != amount {
            return Err(DomainError::invariant(format!(
                "PIX charge {} is for {} but the sale total is {amount}",
                self.txid, self.amount
            )));
        }
        match self.sale_id {
            Some(existing) if existing != sale_id => Err(DomainError::conflict(format!(
                "PIX charge {} already settled another sale",
                self.txid
            ))),
            _ => {
                self.sale_id = Some(sale_id);
                Ok(())
            }
        }
    }
}

impl Entity for PixCharge {
    type Id = PixTxId;

    fn id(&self) -> &Self::Id {
        &self.txid
    }
}

fn field(id: &str, value: &str) -> DomainResult<String> {
    if value.len() > FIELD_MAX_LEN {
        return Err(DomainError::validation(format!(
            "PIX payload field {id} is {} characters, the limit is {FIELD_MAX_LEN}",
            value.len()
        )));
    }
    Ok(format!("{id}{:02}{value}", value.len()))
}

/// Keep printable ASCII only, uppercase, truncated to `max` characters.
fn sanitize(value: &str, max: usize) -> String {
    value
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .take(max)
        .collect::<String>()
        .trim()
        .to_uppercase()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Static BR Code (EMV merchant-presented QR) with a CRC16 trailer.
pub fn build_payload(merchant: &PixMerchant, amount: Money, txid: &PixTxId) -> DomainResult<String> {
    let account = field("00", GUI)? + &field("01", merchant.key.trim())?;
    let additional = field("05", txid.as_str())?;

    let mut payload = String::new();
    payload.push_str(&field("00", "01")?);
    payload.push_str(&field("26", &account)?);
    payload.push_str(&field("52", "0000")?);
    payload.push_str(&field("53", "986")?);
    payload.push_str(&field("54", &amount.to_decimal_string())?);
    payload.push_str(&field("58", "BR")?);
    payload.push_str(&field("59", &sanitize(&merchant.name, 25))?);
    payload.push_str(&field("60", &sanitize(&merchant.city, 15))?);
    payload.push_str(&field("62", &additional)?);
    payload.push_str("6304");
    let crc = crc16_ccitt(payload.as_bytes());
    payload.push_str(&format!("{crc:04X}"));
    Ok(payload)
}

/// CRC16/CCITT-FALSE (poly 0x1021, init 0xFFFF).
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
        }
    }
    crc
}
