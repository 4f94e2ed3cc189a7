use crate::voucher::{Voucher, VoucherStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VoucherStats {
    pub total: usize,
    pub pending_count: usize,
    pub justified_count: usize,
    pub total_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AdminStats {
    #[serde(flatten)]
    pub vouchers: VoucherStats,
    pub total_employees: usize,
}

#[must_use]
pub fn compute_stats<'a>(vouchers: impl IntoIterator<Item = &'a Voucher>) -> VoucherStats {
    vouchers
        .into_iter()
        .fold(VoucherStats::default(), |mut stats, voucher| {
            stats.total += 1;
            match voucher.status {
                VoucherStatus::NoAction => stats.pending_count += 1,
                VoucherStatus::Justified => stats.justified_count += 1,
            }
            if voucher.record.value.is_finite() {
                stats.total_value += voucher.record.value;
            }
            stats
        })
}
