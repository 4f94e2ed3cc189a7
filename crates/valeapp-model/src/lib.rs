#![forbid(unsafe_code)]

mod filter;
mod ids;
mod justification;
mod people;
mod stats;
mod voucher;

pub use filter::{filter_employees, filter_vouchers, SearchScope, StatusFilter, VoucherFilter};
pub use ids::{
    AdminLogin, EmployeeId, PromaxCode, ValidationError, VoucherKey, ADMIN_LOGIN_MAX_LEN,
    EMPLOYEE_ID_MAX_LEN, PROMAX_CODE_MAX_LEN, VOUCHER_KEY_MAX_LEN,
};
pub use justification::{
    DeviceKind, DeviceSnapshot, Justification, JustificationForm, JustificationKind,
    OBSERVATION_MAX_CHARS,
};
pub use people::{AdminUser, Employee, NewAdminUser, NewEmployee, Role, SessionUser};
pub use stats::{compute_stats, AdminStats, VoucherStats};
pub use voucher::{ArchivedVoucher, NewVoucher, Voucher, VoucherStatus};

pub const CRATE_NAME: &str = "valeapp-model";
