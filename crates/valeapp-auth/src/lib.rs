#![forbid(unsafe_code)]

use chrono::Duration;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{info, warn};
use valeapp_model::{AdminLogin, EmployeeId, SessionUser};
use valeapp_store::{StoreError, VoucherStore};

mod password;
mod session;

pub use password::{
    is_hashed, secrets_match, PasswordCheck, PasswordHasher, DEFAULT_PASSWORD_ITERATIONS,
    HASH_SCHEME,
};
pub use session::{Issued, TokenRegistry};

pub const CRATE_NAME: &str = "valeapp-auth";

pub const ADMIN_NOT_FOUND: &str = "Login não encontrado ou inativo. Verifique suas credenciais.";
pub const ADMIN_BAD_CREDENTIALS: &str = "Login ou senha incorretos. Verifique suas credenciais.";
pub const EMPLOYEE_NOT_FOUND: &str =
    "CPF não encontrado no sistema. Verifique se o CPF está correto.";
pub const EMPLOYEE_BAD_FIRST_LOGIN: &str =
    "CPF ou senha incorretos. No primeiro acesso, use os 3 primeiros dígitos do seu CPF como senha.";
pub const EMPLOYEE_BAD_PASSWORD: &str =
    "CPF ou senha incorretos. Use a senha de 6 dígitos que você definiu anteriormente.";
pub const NEW_PASSWORD_INVALID: &str =
    "Por favor, verifique se as senhas são iguais e têm 6 dígitos numéricos.";
pub const SESSION_INVALID: &str = "Sessão inválida ou expirada. Faça login novamente.";

pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;
pub const DEFAULT_SETUP_TICKET_TTL_SECS: i64 = 10 * 60;
pub const EMPLOYEE_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
pub enum AuthError {
    /// Unknown or inactive login/identifier.
    NotFound(String),
    InvalidCredentials(String),
    Validation(String),
    /// Missing, expired or revoked session token or setup ticket.
    Unauthenticated(String),
    /// Store call failed; `context` is the user-facing prefix.
    Store {
        context: &'static str,
        source: StoreError,
    },
}

impl AuthError {
    fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(m)
            | Self::InvalidCredentials(m)
            | Self::Validation(m)
            | Self::Unauthenticated(m) => write!(f, "{m}"),
            Self::Store { context, source } => write!(f, "{context}: {}", source.message),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    pub setup_ticket_ttl: Duration,
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            setup_ticket_ttl: Duration::seconds(DEFAULT_SETUP_TICKET_TTL_SECS),
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        }
    }
}

impl AuthConfig {
    /// Reads overrides from the environment; unparsable values keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = valeapp_core::env_non_empty(valeapp_core::ENV_VALEAPP_SESSION_TTL_SECS)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
        {
            cfg.session_ttl = Duration::seconds(secs);
        }
        if let Some(n) =
            valeapp_core::env_non_empty(valeapp_core::ENV_VALEAPP_PASSWORD_ITERATIONS)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
        {
            cfg.password_iterations = n;
        }
        cfg
    }
}

pub type Session = Issued<SessionUser>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(IssuedSession),
    /// First access matched; the employee must pick a password before any
    /// session exists. The ticket is single-use and short-lived.
    PasswordSetupRequired {
        ticket: String,
        employee: SessionUser,
    },
}

#[must_use]
pub fn is_valid_new_password(password: &str, confirmation: &str) -> bool {
    password.len() == EMPLOYEE_PASSWORD_LEN
        && password.bytes().all(|b| b.is_ascii_digit())
        && password == confirmation
}

/// Credential checks plus the server-side session and setup-ticket registries.
pub struct Authenticator {
    store: Arc<dyn VoucherStore>,
    hasher: PasswordHasher,
    sessions: TokenRegistry<SessionUser>,
    setup_tickets: TokenRegistry<EmployeeId>,
}

impl Authenticator {
    #[must_use]
    pub fn new(store: Arc<dyn VoucherStore>, config: AuthConfig) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(config.password_iterations),
            sessions: TokenRegistry::new(config.session_ttl),
            setup_tickets: TokenRegistry::new(config.setup_ticket_ttl),
        }
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    fn open_session(&self, user: SessionUser) -> IssuedSession {
        let (token, session) = self.sessions.issue(user);
        IssuedSession { token, session }
    }

    pub async fn admin_login(
        &self,
        login: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let login = AdminLogin::parse(login)
            .map_err(|_| AuthError::NotFound(ADMIN_NOT_FOUND.to_string()))?;
        let admin = self
            .store
            .find_active_admin(&login)
            .await
            .map_err(AuthError::store("Erro de conexão"))?
            .ok_or_else(|| {
                info!(login = %login, "admin login rejected: not found or inactive");
                AuthError::NotFound(ADMIN_NOT_FOUND.to_string())
            })?;
        let check = self.hasher.verify(&admin.password, password);
        let PasswordCheck::Match { needs_rehash } = check else {
            info!(login = %login, "admin login rejected: bad password");
            return Err(AuthError::InvalidCredentials(
                ADMIN_BAD_CREDENTIALS.to_string(),
            ));
        };
        if needs_rehash {
            if let Err(e) = self
                .store
                .set_admin_password(&login, &self.hasher.hash(password))
                .await
            {
                warn!(login = %login, error = %e, "admin password rehash failed");
            }
        }
        info!(login = %login, "admin logged in");
        Ok(self.open_session(SessionUser::for_admin(&admin)))
    }

    pub async fn employee_login(
        &self,
        id: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let id = EmployeeId::parse(id)
            .map_err(|_| AuthError::NotFound(EMPLOYEE_NOT_FOUND.to_string()))?;
        let employee = self
            .store
            .find_employee(&id)
            .await
            .map_err(AuthError::store("Erro de conexão com o banco de dados"))?
            .ok_or_else(|| AuthError::NotFound(EMPLOYEE_NOT_FOUND.to_string()))?;

        if employee.is_first_login() {
            if !secrets_match(&id.first_login_password(), password.trim()) {
                return Err(AuthError::InvalidCredentials(
                    EMPLOYEE_BAD_FIRST_LOGIN.to_string(),
                ));
            }
            let (ticket, _) = self.setup_tickets.issue(id.clone());
            info!(employee = %id, "first access; password setup required");
            return Ok(LoginOutcome::PasswordSetupRequired {
                ticket,
                employee: SessionUser::for_employee(&employee),
            });
        }

        let PasswordCheck::Match { needs_rehash } =
            self.hasher.verify(&employee.password, password)
        else {
            return Err(AuthError::InvalidCredentials(
                EMPLOYEE_BAD_PASSWORD.to_string(),
            ));
        };
        if needs_rehash {
            if let Err(e) = self
                .store
                .set_employee_password(&id, &self.hasher.hash(password))
                .await
            {
                warn!(employee = %id, error = %e, "employee password rehash failed");
            }
        }
        info!(employee = %id, "employee logged in");
        Ok(LoginOutcome::Authenticated(
            self.open_session(SessionUser::for_employee(&employee)),
        ))
    }

    /// Finishes the first-access flow: stores the new password hashed and
    /// opens a normal session. The ticket is consumed only on success.
    pub async fn complete_password_setup(
        &self,
        ticket: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<IssuedSession, AuthError> {
        let issued = self
            .setup_tickets
            .get(ticket)
            .ok_or_else(|| AuthError::Unauthenticated(SESSION_INVALID.to_string()))?;
        let password = password.trim();
        if !is_valid_new_password(password, confirmation.trim()) {
            return Err(AuthError::Validation(NEW_PASSWORD_INVALID.to_string()));
        }
        let id = issued.value;
        self.store
            .set_employee_password(&id, &self.hasher.hash(password))
            .await
            .map_err(AuthError::store("Erro ao alterar senha"))?;
        self.setup_tickets.revoke(ticket);
        let employee = self
            .store
            .find_employee(&id)
            .await
            .map_err(AuthError::store("Erro ao alterar senha"))?
            .ok_or_else(|| AuthError::NotFound(EMPLOYEE_NOT_FOUND.to_string()))?;
        info!(employee = %id, "employee password set");
        Ok(self.open_session(SessionUser::for_employee(&employee)))
    }

    pub fn session(&self, token: &str) -> Result<Session, AuthError> {
        self.sessions
            .get(token)
            .ok_or_else(|| AuthError::Unauthenticated(SESSION_INVALID.to_string()))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
