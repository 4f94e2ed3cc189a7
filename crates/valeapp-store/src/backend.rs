use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use valeapp_model::{
    AdminLogin, AdminUser, ArchivedVoucher, Employee, EmployeeId, Justification, NewAdminUser,
    NewEmployee, NewVoucher, PromaxCode, Voucher, VoucherKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    /// No row matched the filter.
    NotFound,
    Validation,
    /// Unique-key violation, or a conditional write whose precondition failed.
    Conflict,
    Network,
    Io,
    Config,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::Network => "network_error",
            Self::Io => "io_error",
            Self::Config => "config_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

/// Row store holding employees, admins, the working voucher table and the
/// append-only archive. Every call is one round trip; nothing is retried.
#[async_trait]
pub trait VoucherStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError>;

    /// Ordered by name.
    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;

    async fn count_employees(&self) -> Result<usize, StoreError>;

    /// Fails with `Conflict` when the id or promax code is taken.
    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError>;

    async fn set_employee_password(
        &self,
        id: &EmployeeId,
        stored_password: &str,
    ) -> Result<(), StoreError>;

    /// Only active admins are returned.
    async fn find_active_admin(&self, login: &AdminLogin)
        -> Result<Option<AdminUser>, StoreError>;

    /// Ordered by name.
    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError>;

    async fn insert_admin(&self, admin: &NewAdminUser) -> Result<AdminUser, StoreError>;

    async fn set_admin_password(
        &self,
        login: &AdminLogin,
        stored_password: &str,
    ) -> Result<(), StoreError>;

    /// Newest-created first; `owner` restricts to one promax code.
    async fn list_vouchers(&self, owner: Option<&PromaxCode>) -> Result<Vec<Voucher>, StoreError>;

    async fn find_voucher(&self, key: &VoucherKey) -> Result<Option<Voucher>, StoreError>;

    /// All rows or none. Returns the number inserted.
    async fn insert_vouchers(&self, vouchers: &[NewVoucher]) -> Result<usize, StoreError>;

    /// Conditional write: succeeds only while the voucher is still pending.
    /// `NotFound` when no voucher has `key`, `Conflict` when it was already
    /// justified.
    async fn justify_voucher(
        &self,
        key: &VoucherKey,
        justification: &Justification,
    ) -> Result<Voucher, StoreError>;

    async fn list_justified_vouchers(&self) -> Result<Vec<Voucher>, StoreError>;

    /// Removes every voucher regardless of status. Returns the number removed.
    async fn delete_all_vouchers(&self) -> Result<usize, StoreError>;

    async fn insert_archived(&self, archived: &ArchivedVoucher) -> Result<(), StoreError>;

    /// Plain insert; a duplicate key fails the whole batch with `Conflict`.
    async fn insert_archived_batch(&self, archived: &[ArchivedVoucher])
        -> Result<usize, StoreError>;

    /// Insert or replace, keyed on the voucher key.
    async fn upsert_archived_batch(&self, archived: &[ArchivedVoucher])
        -> Result<usize, StoreError>;

    async fn list_archived(&self) -> Result<Vec<ArchivedVoucher>, StoreError>;
}
