use crate::ids::{PromaxCode, ValidationError, VoucherKey};
use crate::justification::Justification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VoucherStatus {
    #[default]
    #[serde(rename = "Sem ação")]
    NoAction,
    #[serde(rename = "Justificado")]
    Justified,
}

impl VoucherStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAction => "Sem ação",
            Self::Justified => "Justificado",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "Sem ação" => Ok(Self::NoAction),
            "Justificado" => Ok(Self::Justified),
            other => Err(ValidationError(format!("unknown voucher status `{other}`"))),
        }
    }
}

impl Display for VoucherStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One imported discrepancy line, as produced by the spreadsheet normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVoucher {
    pub key: VoucherKey,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub map_id: Option<String>,
    pub client_code: Option<String>,
    pub client_name: Option<String>,
    pub voucher_number: Option<String>,
    pub issued_at: Option<String>,
    pub item_ti: Option<String>,
    pub item_code: Option<String>,
    pub item: String,
    pub unit: Option<String>,
    pub quantity_out: i64,
    pub loose_out: Option<String>,
    pub quantity_returned: i64,
    pub loose_returned: Option<String>,
    pub quantity_difference: i64,
    pub loose_difference: Option<String>,
    pub value: f64,
    pub reviewer: Option<String>,
    pub owner: Option<PromaxCode>,
    pub measure: Option<String>,
}

impl NewVoucher {
    /// A record carrying only the fields every voucher must have.
    #[must_use]
    pub fn minimal(key: VoucherKey, date: impl Into<String>) -> Self {
        Self {
            key,
            date: date.into(),
            map_id: None,
            client_code: None,
            client_name: None,
            voucher_number: None,
            issued_at: None,
            item_ti: None,
            item_code: None,
            item: String::new(),
            unit: None,
            quantity_out: 0,
            loose_out: None,
            quantity_returned: 0,
            loose_returned: None,
            quantity_difference: 0,
            loose_difference: None,
            value: 0.0,
            reviewer: None,
            owner: None,
            measure: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: String,
    #[serde(flatten)]
    pub record: NewVoucher,
    pub status: VoucherStatus,
    pub justification: Option<Justification>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    #[must_use]
    pub fn key(&self) -> &VoucherKey {
        &self.record.key
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == VoucherStatus::NoAction
    }

    #[must_use]
    pub fn is_owned_by(&self, promax: &PromaxCode) -> bool {
        self.record.owner.as_ref() == Some(promax)
    }

    /// Copy of this voucher for the append-only archive.
    #[must_use]
    pub fn to_archived(&self, archived_by: &str, archived_at: DateTime<Utc>) -> ArchivedVoucher {
        ArchivedVoucher {
            original_voucher_id: self.id.clone(),
            record: self.record.clone(),
            status: self.status,
            justification: self.justification.clone(),
            archived_by: archived_by.to_string(),
            archived_at,
        }
    }
}

/// Voucher copy kept after the working table is purged. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedVoucher {
    pub original_voucher_id: String,
    #[serde(flatten)]
    pub record: NewVoucher,
    pub status: VoucherStatus,
    pub justification: Option<Justification>,
    pub archived_by: String,
    pub archived_at: DateTime<Utc>,
}
