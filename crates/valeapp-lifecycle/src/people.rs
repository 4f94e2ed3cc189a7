use crate::{LifecycleError, VoucherLifecycle};
use tracing::info;
use valeapp_model::{
    filter_employees, AdminLogin, AdminUser, Employee, EmployeeId, NewAdminUser, NewEmployee,
    PromaxCode,
};
use valeapp_store::{StoreError, StoreErrorCode};

fn conflict_or(
    context: &'static str,
    duplicate: String,
) -> impl FnOnce(StoreError) -> LifecycleError {
    move |e| {
        if e.code == StoreErrorCode::Conflict {
            LifecycleError::Conflict(duplicate)
        } else {
            LifecycleError::store(context)(e)
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, LifecycleError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LifecycleError::Validation(format!("O campo {field} é obrigatório.")));
    }
    Ok(value.to_string())
}

impl VoucherLifecycle {
    /// New employees start without a password; their first login goes
    /// through the first-access flow.
    pub async fn add_employee(
        &self,
        id: &str,
        name: &str,
        department: Option<&str>,
        promax: &str,
    ) -> Result<Employee, LifecycleError> {
        let employee = NewEmployee {
            id: EmployeeId::parse(id).map_err(|e| LifecycleError::Validation(e.0))?,
            name: required("Nome", name)?,
            department: department
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            promax: PromaxCode::parse(promax).map_err(|e| LifecycleError::Validation(e.0))?,
        };
        let created = self
            .store
            .insert_employee(&employee)
            .await
            .map_err(conflict_or(
                "Erro ao cadastrar funcionário",
                format!(
                    "Já existe um funcionário com o CPF {} ou o Promax {}.",
                    employee.id, employee.promax
                ),
            ))?;
        info!(employee = %created.id, "employee added");
        Ok(created)
    }

    /// Employees ordered by name, optionally narrowed by name, CPF or promax.
    pub async fn list_employees(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<Employee>, LifecycleError> {
        let all = self
            .store
            .list_employees()
            .await
            .map_err(LifecycleError::store("Erro ao carregar funcionários"))?;
        Ok(match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => filter_employees(&all, term).into_iter().cloned().collect(),
            None => all,
        })
    }

    pub async fn add_admin(
        &self,
        login: &str,
        name: &str,
        password: &str,
    ) -> Result<AdminUser, LifecycleError> {
        let login = AdminLogin::parse(login).map_err(|e| LifecycleError::Validation(e.0))?;
        let name = required("Nome", name)?;
        let password = required("Senha", password)?;
        let admin = NewAdminUser {
            login: login.clone(),
            password: self.hasher.hash(&password),
            name,
            is_active: true,
        };
        let created = self
            .store
            .insert_admin(&admin)
            .await
            .map_err(conflict_or(
                "Erro ao cadastrar administrador",
                format!("Já existe um administrador com o login {login}."),
            ))?;
        info!(login = %created.login, "admin added");
        Ok(created)
    }

    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, LifecycleError> {
        self.store
            .list_admins()
            .await
            .map_err(LifecycleError::store("Erro ao carregar administradores"))
    }
}
