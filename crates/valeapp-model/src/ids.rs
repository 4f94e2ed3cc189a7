use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const EMPLOYEE_ID_MAX_LEN: usize = 32;
pub const PROMAX_CODE_MAX_LEN: usize = 64;
pub const VOUCHER_KEY_MAX_LEN: usize = 128;
pub const ADMIN_LOGIN_MAX_LEN: usize = 64;

fn validate_text(kind: &str, input: &str, max_len: usize) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError(format!("{kind} must not be empty")));
    }
    if s.chars().count() > max_len {
        return Err(ValidationError(format!(
            "{kind} exceeds max length {max_len}"
        )));
    }
    if s.chars().any(char::is_control) {
        return Err(ValidationError(format!(
            "{kind} must not contain control characters"
        )));
    }
    Ok(s.to_string())
}

/// Login identifier of an employee (the CPF). Distinct from [`PromaxCode`],
/// which decides voucher ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = validate_text("employee id", input, EMPLOYEE_ID_MAX_LEN)?;
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError(
                "employee id must not contain whitespace".to_string(),
            ));
        }
        Ok(Self(s))
    }

    /// Password accepted before the employee has chosen one.
    #[must_use]
    pub fn first_login_password(&self) -> String {
        self.0.chars().take(3).collect()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for EmployeeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PromaxCode(String);

impl PromaxCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        validate_text("promax code", input, PROMAX_CODE_MAX_LEN).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for PromaxCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite `item-code_map-id` key that uniquely identifies a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VoucherKey(String);

impl VoucherKey {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        validate_text("voucher key", input, VOUCHER_KEY_MAX_LEN).map(Self)
    }

    pub fn from_parts(item_code: &str, map_id: &str) -> Result<Self, ValidationError> {
        Self::parse(&format!("{}_{}", item_code.trim(), map_id.trim()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for VoucherKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AdminLogin(String);

impl AdminLogin {
    /// Logins are compared case-sensitively after trimming.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        validate_text("admin login", input, ADMIN_LOGIN_MAX_LEN).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for AdminLogin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
