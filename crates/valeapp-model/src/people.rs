use crate::ids::{AdminLogin, EmployeeId, PromaxCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub department: Option<String>,
    pub promax: PromaxCode,
    /// Stored credential; empty until the employee sets a password.
    #[serde(default, skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    #[must_use]
    pub fn is_first_login(&self) -> bool {
        self.password.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub promax: PromaxCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub login: AdminLogin,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin account to create. `password` is the stored credential, already
/// hashed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdminUser {
    pub login: AdminLogin,
    pub password: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
}

/// Identity attached to an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Employee id for employees, login for admins.
    pub id: String,
    pub name: String,
    pub department: Option<String>,
    pub promax: Option<PromaxCode>,
    pub role: Role,
}

impl SessionUser {
    #[must_use]
    pub fn for_employee(employee: &Employee) -> Self {
        Self {
            id: employee.id.as_str().to_string(),
            name: employee.name.clone(),
            department: employee.department.clone(),
            promax: Some(employee.promax.clone()),
            role: Role::Employee,
        }
    }

    #[must_use]
    pub fn for_admin(admin: &AdminUser) -> Self {
        Self {
            id: admin.login.as_str().to_string(),
            name: admin.name.clone(),
            department: None,
            promax: None,
            role: Role::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
