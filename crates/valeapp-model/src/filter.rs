//! List views derived from an authoritative fetched list plus explicit
//! filter parameters. Nothing here holds state between calls.

use crate::ids::ValidationError;
use crate::people::Employee;
use crate::voucher::{Voucher, VoucherStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Justified,
}

impl StatusFilter {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "justified" => Ok(Self::Justified),
            other => Err(ValidationError(format!(
                "status filter must be one of all, pending, justified (got `{other}`)"
            ))),
        }
    }

    #[must_use]
    pub fn matches(self, status: VoucherStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == VoucherStatus::NoAction,
            Self::Justified => status == VoucherStatus::Justified,
        }
    }
}

/// Which columns free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchScope {
    /// Item, map id and owning promax code.
    #[default]
    Admin,
    /// Item, map id and composite key.
    Employee,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoucherFilter {
    pub search: String,
    pub status: StatusFilter,
    pub scope: SearchScope,
}

impl VoucherFilter {
    #[must_use]
    pub fn matches(&self, voucher: &Voucher) -> bool {
        self.status.matches(voucher.status) && self.matches_search(voucher)
    }

    fn matches_search(&self, voucher: &Voucher) -> bool {
        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        let record = &voucher.record;
        let item_hit = record
            .item
            .to_lowercase()
            .contains(&term.to_lowercase());
        let map_hit = record.map_id.as_deref().is_some_and(|m| m.contains(term));
        let scoped_hit = match self.scope {
            SearchScope::Admin => record
                .owner
                .as_ref()
                .is_some_and(|p| p.as_str().contains(term)),
            SearchScope::Employee => record.key.as_str().contains(term),
        };
        item_hit || map_hit || scoped_hit
    }
}

#[must_use]
pub fn filter_vouchers<'a>(vouchers: &'a [Voucher], filter: &VoucherFilter) -> Vec<&'a Voucher> {
    vouchers.iter().filter(|v| filter.matches(v)).collect()
}

/// Case-insensitive on name; identifier and promax code match as substrings.
#[must_use]
pub fn filter_employees<'a>(employees: &'a [Employee], search: &str) -> Vec<&'a Employee> {
    let term = search.trim();
    if term.is_empty() {
        return employees.iter().collect();
    }
    let lowered = term.to_lowercase();
    employees
        .iter()
        .filter(|e| {
            e.name.to_lowercase().contains(&lowered)
                || e.id.as_str().contains(term)
                || e.promax.as_str().contains(term)
        })
        .collect()
}
